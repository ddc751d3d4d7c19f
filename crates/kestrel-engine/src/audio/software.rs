use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{AudioError, QueuedSink, SinkState, StreamFormat};

#[derive(Debug, Copy, Clone)]
struct Queued {
    slot: usize,
    frames: usize,
}

/// Sink that plays queued buffers against the wall clock and discards them.
///
/// Behaves like a hardware buffer queue: buffers finish in FIFO order at the
/// stream's sample rate, and playback stops by itself when the queue runs dry.
#[derive(Debug)]
pub struct SoftwareSink {
    format: Option<StreamFormat>,
    pending: VecDeque<Queued>,
    finished: VecDeque<usize>,
    state: SinkState,
    /// Playback start of the buffer at the head of `pending`.
    head_started: Option<Instant>,
    frames_played: Arc<AtomicU64>,
}

impl SoftwareSink {
    pub fn new() -> Self {
        Self {
            format: None,
            pending: VecDeque::new(),
            finished: VecDeque::new(),
            state: SinkState::Initial,
            head_started: None,
            frames_played: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of frames played so far; stays readable after the sink moved
    /// to the audio thread.
    pub fn frames_played(&self) -> Arc<AtomicU64> {
        self.frames_played.clone()
    }

    fn format(&self) -> Result<&StreamFormat, AudioError> {
        self.format
            .as_ref()
            .ok_or_else(|| AudioError::sink("software", "sink is not open"))
    }

    fn advance(&mut self) {
        let (Some(format), Some(mut started)) = (self.format, self.head_started) else {
            return;
        };
        if self.state != SinkState::Playing {
            return;
        }

        let now = Instant::now();
        while let Some(head) = self.pending.front().copied() {
            let length = Duration::from_secs_f64(head.frames as f64 / format.sample_rate as f64);
            if now.duration_since(started) < length {
                break;
            }
            started += length;
            self.pending.pop_front();
            self.finished.push_back(head.slot);
            self.frames_played.fetch_add(head.frames as u64, Ordering::Relaxed);
        }

        if self.pending.is_empty() {
            self.state = SinkState::Stopped;
            self.head_started = None;
        } else {
            self.head_started = Some(started);
        }
    }
}

impl Default for SoftwareSink {
    fn default() -> Self {
        Self::new()
    }
}

impl QueuedSink for SoftwareSink {
    fn open(&mut self, format: &StreamFormat) -> Result<(), AudioError> {
        if self.format.is_some() {
            return Err(AudioError::sink("open", "sink is already open"));
        }
        self.format = Some(*format);
        self.state = SinkState::Initial;
        Ok(())
    }

    fn queue(&mut self, slot: usize, samples: &[i16]) -> Result<(), AudioError> {
        let channels = self.format()?.channels as usize;
        if samples.len() % channels != 0 {
            return Err(AudioError::sink("queue", "sample count is not a whole number of frames"));
        }
        if self.pending.iter().any(|q| q.slot == slot) || self.finished.contains(&slot) {
            return Err(AudioError::sink("queue", format!("buffer {slot} is already queued")));
        }

        self.advance();
        self.pending.push_back(Queued {
            slot,
            frames: samples.len() / channels,
        });
        Ok(())
    }

    fn processed(&mut self) -> Result<usize, AudioError> {
        self.format()?;
        self.advance();
        Ok(self.finished.len())
    }

    fn unqueue(&mut self) -> Result<usize, AudioError> {
        self.finished
            .pop_front()
            .ok_or_else(|| AudioError::sink("unqueue", "no processed buffers"))
    }

    fn state(&mut self) -> Result<SinkState, AudioError> {
        self.format()?;
        self.advance();
        Ok(self.state)
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.format()?;
        self.advance();
        if self.state == SinkState::Playing {
            return Ok(());
        }

        if self.pending.is_empty() {
            self.state = SinkState::Stopped;
        } else {
            self.state = SinkState::Playing;
            self.head_started = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.format()?;
        self.finished.extend(self.pending.drain(..).map(|q| q.slot));
        self.state = SinkState::Stopped;
        self.head_started = None;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        self.format()?;
        self.pending.clear();
        self.finished.clear();
        self.format = None;
        self.state = SinkState::Initial;
        self.head_started = None;
        Ok(())
    }
}
