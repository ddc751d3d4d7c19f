use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::AudioSettings;
use crate::core::spawn_owning;

use super::{AudioError, DataSource, StreamFormat};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SinkState {
    /// Opened, never played.
    Initial,
    Playing,
    /// Stopped explicitly or ran out of queued buffers.
    Stopped,
}

/// Buffer-queue output, modelled on hardware sources that play a FIFO of
/// buffers and report how many have finished.
///
/// Buffers are identified by slot index `0..buffer_count`.
pub trait QueuedSink: Send + 'static {
    fn open(&mut self, format: &StreamFormat) -> Result<(), AudioError>;

    /// Appends `samples` to the play queue.
    fn queue(&mut self, slot: usize, samples: &[i16]) -> Result<(), AudioError>;

    /// Buffers that finished playing and can be unqueued.
    fn processed(&mut self) -> Result<usize, AudioError>;

    /// Removes the oldest finished buffer and returns its slot.
    fn unqueue(&mut self) -> Result<usize, AudioError>;

    fn state(&mut self) -> Result<SinkState, AudioError>;
    fn play(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self) -> Result<(), AudioError>;
    fn close(&mut self) -> Result<(), AudioError>;
}

#[derive(Debug, Default)]
struct StreamShared {
    running: AtomicBool,
    underruns: AtomicU64,
    buffers: AtomicU64,
    failure: Mutex<Option<AudioError>>,
}

/// Refill side of the stream; runs on the `audio` thread.
struct StreamWorker<S, D> {
    sink: S,
    source: D,
    format: StreamFormat,
    buffer_count: usize,
    next: usize,
    scratch: Vec<i16>,
    shared: Arc<StreamShared>,
}

impl<S: QueuedSink, D: DataSource> StreamWorker<S, D> {
    fn pull(&mut self) -> Result<(), AudioError> {
        self.source
            .get_data(self.format.frames_per_buffer, &mut self.scratch)?;

        let expected = self.format.samples_per_buffer();
        if self.scratch.len() != expected {
            return Err(AudioError::ShortRead {
                expected,
                got: self.scratch.len(),
            });
        }
        Ok(())
    }

    /// Fills and queues every slot, then starts playback.
    fn prime(&mut self) -> Result<(), AudioError> {
        for slot in 0..self.buffer_count {
            self.pull()?;
            self.sink.queue(slot, &self.scratch)?;
        }
        self.next = 0;
        self.sink.play()
    }

    /// Requeues every buffer the sink finished since the last call.
    fn process(&mut self) -> Result<usize, AudioError> {
        let processed = self.sink.processed()?;

        for _ in 0..processed {
            let slot = self.sink.unqueue()?;
            if slot != self.next {
                return Err(AudioError::OutOfOrder {
                    expected: self.next,
                    got: slot,
                });
            }

            self.pull()?;
            self.sink.queue(slot, &self.scratch)?;

            if self.sink.state()? != SinkState::Playing {
                log::warn!("audio: sink stopped (underrun); restarting playback");
                self.shared.underruns.fetch_add(1, Ordering::Relaxed);
                self.sink.play()?;
            }

            self.shared.buffers.fetch_add(1, Ordering::Relaxed);
            self.next = (self.next + 1) % self.buffer_count;
        }
        Ok(processed)
    }

    fn run(mut self, poll_interval: Duration) {
        while self.shared.running.load(Ordering::Acquire) {
            if let Err(e) = self.process() {
                log::error!("audio: stream stopped: {e}");
                *self.shared.failure.lock() = Some(e);
                self.shared.running.store(false, Ordering::Release);
                break;
            }
            std::thread::sleep(poll_interval);
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.sink.stop() {
            log::warn!("audio: failed to stop sink: {e}");
        }
        if let Err(e) = self.sink.close() {
            log::error!("audio: failed to close sink: {e}");
        }
        log::debug!("audio: sink closed");
    }
}

/// A running audio stream. Dropping it stops the `audio` thread and closes the sink.
pub struct StreamingDevice {
    format: StreamFormat,
    shared: Arc<StreamShared>,
    thread: Option<JoinHandle<()>>,
}

impl StreamingDevice {
    /// Opens `sink`, queues `settings.buffer_count` buffers pulled from
    /// `source`, starts playback and hands both to a new `audio` thread.
    ///
    /// The sink is closed again if any step after `open` fails.
    pub fn start<S, D>(mut sink: S, source: D, settings: &AudioSettings) -> Result<Self, AudioError>
    where
        S: QueuedSink,
        D: DataSource,
    {
        let format = StreamFormat::from_settings(settings)?;
        sink.open(&format)?;

        let shared = Arc::new(StreamShared::default());
        let mut worker = StreamWorker {
            sink,
            source,
            format,
            buffer_count: settings.buffer_count,
            next: 0,
            scratch: Vec::with_capacity(format.samples_per_buffer()),
            shared: shared.clone(),
        };

        if let Err(e) = worker.prime() {
            worker.shutdown();
            return Err(e);
        }

        shared.running.store(true, Ordering::Release);
        let poll_interval = settings.poll_interval;
        let thread = spawn_owning(
            "audio",
            worker,
            move |worker| worker.run(poll_interval),
            |mut worker| worker.shutdown(),
        );

        let thread = match thread {
            Ok(t) => t,
            Err(e) => {
                shared.running.store(false, Ordering::Release);
                return Err(AudioError::ThreadSpawn(e.to_string()));
            }
        };

        log::info!(
            "audio: streaming {} Hz, {} channel(s), {} x {} frames",
            format.sample_rate,
            format.channels,
            settings.buffer_count,
            format.frames_per_buffer
        );

        Ok(Self {
            format,
            shared,
            thread: Some(thread),
        })
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// False once stopped or after a fatal stream error.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// The error that stopped the stream, if any.
    pub fn failure(&self) -> Option<AudioError> {
        self.shared.failure.lock().clone()
    }

    /// Times playback had to be restarted after the sink ran dry.
    pub fn underruns(&self) -> u64 {
        self.shared.underruns.load(Ordering::Relaxed)
    }

    /// Buffers refilled and requeued since start (priming excluded).
    pub fn buffers_streamed(&self) -> u64 {
        self.shared.buffers.load(Ordering::Relaxed)
    }

    /// Stops the thread and closes the sink. Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("audio: thread panicked");
            }
        }
    }
}

impl Drop for StreamingDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Silence;
    use std::collections::VecDeque;

    /// Sink scripted per `processed()` call.
    #[derive(Default)]
    struct Script {
        processed: VecDeque<usize>,
        stop_after_queue: bool,
        queued: Vec<usize>,
        plays: usize,
        finished: VecDeque<usize>,
        playing: VecDeque<usize>,
        state: Option<SinkState>,
    }

    impl QueuedSink for Script {
        fn open(&mut self, _format: &StreamFormat) -> Result<(), AudioError> {
            Ok(())
        }
        fn queue(&mut self, slot: usize, _samples: &[i16]) -> Result<(), AudioError> {
            self.queued.push(slot);
            self.playing.push_back(slot);
            if self.stop_after_queue {
                self.state = Some(SinkState::Stopped);
            }
            Ok(())
        }
        fn processed(&mut self) -> Result<usize, AudioError> {
            let n = self.processed.pop_front().unwrap_or(0);
            for _ in 0..n {
                if let Some(slot) = self.playing.pop_front() {
                    self.finished.push_back(slot);
                }
            }
            Ok(n)
        }
        fn unqueue(&mut self) -> Result<usize, AudioError> {
            self.finished
                .pop_front()
                .ok_or_else(|| AudioError::sink("unqueue", "nothing processed"))
        }
        fn state(&mut self) -> Result<SinkState, AudioError> {
            Ok(self.state.unwrap_or(SinkState::Playing))
        }
        fn play(&mut self) -> Result<(), AudioError> {
            self.plays += 1;
            self.state = Some(SinkState::Playing);
            Ok(())
        }
        fn stop(&mut self) -> Result<(), AudioError> {
            Ok(())
        }
        fn close(&mut self) -> Result<(), AudioError> {
            Ok(())
        }
    }

    fn worker(script: Script) -> StreamWorker<Script, Silence> {
        let format = StreamFormat::from_settings(&AudioSettings {
            channels: 1,
            frames_per_buffer: 8,
            ..AudioSettings::default()
        })
        .unwrap();
        StreamWorker {
            sink: script,
            source: Silence::new(&format),
            format,
            buffer_count: 2,
            next: 0,
            scratch: Vec::new(),
            shared: Arc::new(StreamShared::default()),
        }
    }

    // ── priming ───────────────────────────────────────────────────────────

    #[test]
    fn prime_queues_every_slot_then_plays() {
        let mut w = worker(Script::default());
        w.prime().unwrap();
        assert_eq!(w.sink.queued, vec![0, 1]);
        assert_eq!(w.sink.plays, 1);
    }

    // ── processing ────────────────────────────────────────────────────────

    #[test]
    fn processed_buffers_are_requeued_in_slot_order() {
        let mut w = worker(Script {
            processed: VecDeque::from([1, 2, 0, 1]),
            ..Script::default()
        });
        w.prime().unwrap();

        let total: usize = (0..4).map(|_| w.process().unwrap()).sum();
        assert_eq!(total, 4);
        assert_eq!(w.sink.queued, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(w.next, 0);
        assert_eq!(w.shared.buffers.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn stopped_sink_is_restarted_after_requeue() {
        let mut w = worker(Script {
            processed: VecDeque::from([1]),
            ..Script::default()
        });
        w.prime().unwrap();
        w.sink.stop_after_queue = true;

        w.process().unwrap();
        assert_eq!(w.sink.plays, 2);
        assert_eq!(w.shared.underruns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn nothing_processed_is_a_no_op() {
        let mut w = worker(Script::default());
        w.prime().unwrap();
        assert_eq!(w.process().unwrap(), 0);
        assert_eq!(w.sink.queued, vec![0, 1]);
    }

    #[test]
    fn short_read_is_fatal() {
        let format = StreamFormat::from_settings(&AudioSettings::default()).unwrap();
        let mut w = StreamWorker {
            sink: Script::default(),
            source: |_frames: usize, out: &mut Vec<i16>| -> Result<(), AudioError> {
                out.clear();
                out.push(0);
                Ok(())
            },
            format,
            buffer_count: 2,
            next: 0,
            scratch: Vec::new(),
            shared: Arc::new(StreamShared::default()),
        };
        assert!(matches!(w.prime(), Err(AudioError::ShortRead { got: 1, .. })));
    }
}
