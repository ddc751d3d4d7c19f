use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kestrel_engine::audio::{
    AudioError, QueuedSink, Silence, SinkState, SoftwareSink, StreamFormat, StreamingDevice,
    ToneSource,
};
use kestrel_engine::config::AudioSettings;

fn settings() -> AudioSettings {
    AudioSettings {
        sample_rate: 8_000,
        channels: 1,
        frames_per_buffer: 80,
        buffer_count: 2,
        poll_interval: Duration::from_millis(1),
    }
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Sink that finishes every buffer the moment it is queued and stops playing,
/// so each refill is an underrun.
#[derive(Default)]
struct Starved {
    finished: VecDeque<usize>,
    state: Option<SinkState>,
    plays: Arc<AtomicUsize>,
    opened: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    fail_open: bool,
}

impl QueuedSink for Starved {
    fn open(&mut self, _format: &StreamFormat) -> Result<(), AudioError> {
        if self.fail_open {
            return Err(AudioError::sink("open", "device busy"));
        }
        self.opened.store(true, Ordering::SeqCst);
        self.state = Some(SinkState::Initial);
        Ok(())
    }

    fn queue(&mut self, slot: usize, _samples: &[i16]) -> Result<(), AudioError> {
        self.finished.push_back(slot);
        self.state = Some(SinkState::Stopped);
        Ok(())
    }

    fn processed(&mut self) -> Result<usize, AudioError> {
        Ok(self.finished.len())
    }

    fn unqueue(&mut self) -> Result<usize, AudioError> {
        self.finished
            .pop_front()
            .ok_or_else(|| AudioError::sink("unqueue", "nothing processed"))
    }

    fn state(&mut self) -> Result<SinkState, AudioError> {
        Ok(self.state.unwrap_or(SinkState::Initial))
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.state = Some(SinkState::Playing);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.state = Some(SinkState::Stopped);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── start ─────────────────────────────────────────────────────────────────

#[test]
fn unsupported_channel_count_never_opens_the_sink() {
    let sink = Starved::default();
    let opened = sink.opened.clone();
    let format = StreamFormat::from_settings(&settings()).unwrap();

    let bad = AudioSettings {
        channels: 3,
        ..settings()
    };
    let err = StreamingDevice::start(sink, Silence::new(&format), &bad).err();

    assert_eq!(err, Some(AudioError::UnsupportedChannels(3)));
    assert!(!opened.load(Ordering::SeqCst));
}

#[test]
fn open_failure_is_returned() {
    let format = StreamFormat::from_settings(&settings()).unwrap();
    let sink = Starved {
        fail_open: true,
        ..Starved::default()
    };

    let err = StreamingDevice::start(sink, Silence::new(&format), &settings()).err();
    assert!(matches!(err, Some(AudioError::Sink { op: "open", .. })));
}

#[test]
fn priming_failure_closes_the_sink() {
    let sink = Starved::default();
    let closed = sink.closed.clone();
    let source = |_frames: usize, _out: &mut Vec<i16>| -> Result<(), AudioError> {
        Err(AudioError::SourceExhausted)
    };

    let err = StreamingDevice::start(sink, source, &settings()).err();
    assert_eq!(err, Some(AudioError::SourceExhausted));
    assert!(closed.load(Ordering::SeqCst));
}

// ── streaming ─────────────────────────────────────────────────────────────

#[test]
fn underruns_restart_playback() {
    let sink = Starved::default();
    let plays = sink.plays.clone();
    let closed = sink.closed.clone();
    let format = StreamFormat::from_settings(&settings()).unwrap();

    let mut stream = StreamingDevice::start(sink, Silence::new(&format), &settings()).unwrap();
    wait_until("ten refills", || stream.buffers_streamed() >= 10);

    assert!(stream.is_running());
    assert!(stream.underruns() >= 9);
    assert!(plays.load(Ordering::SeqCst) >= 10);
    assert_eq!(stream.failure(), None);

    stream.stop();
    assert!(!stream.is_running());
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn source_error_stops_the_stream() {
    let sink = Starved::default();
    let closed = sink.closed.clone();
    let mut calls = 0;
    let source = move |frames: usize, out: &mut Vec<i16>| -> Result<(), AudioError> {
        calls += 1;
        if calls > 3 {
            return Err(AudioError::Source("decoder gave up".to_string()));
        }
        out.clear();
        out.resize(frames, 0);
        Ok(())
    };

    let stream = StreamingDevice::start(sink, source, &settings()).unwrap();
    wait_until("stream failure", || !stream.is_running());

    assert_eq!(stream.failure(), Some(AudioError::Source("decoder gave up".to_string())));
    assert_eq!(stream.buffers_streamed(), 1);
    wait_until("sink close", || closed.load(Ordering::SeqCst));
}

#[test]
fn software_sink_plays_a_tone_in_real_time() {
    let sink = SoftwareSink::new();
    let played: Arc<AtomicU64> = sink.frames_played();
    let format = StreamFormat::from_settings(&settings()).unwrap();

    let mut stream =
        StreamingDevice::start(sink, ToneSource::new(&format, 440.0, 0.5), &settings()).unwrap();
    assert_eq!(stream.format(), format);

    wait_until("four buffers", || stream.buffers_streamed() >= 4);
    assert!(played.load(Ordering::Relaxed) >= 4 * 80);
    assert_eq!(stream.failure(), None);

    stream.stop();
    stream.stop();
    assert!(!stream.is_running());
}
