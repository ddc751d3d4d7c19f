use std::f32::consts::TAU;

use super::{AudioError, StreamFormat};

/// Pull callback feeding a stream.
///
/// `get_data` replaces the contents of `out` with exactly
/// `frames * channels` interleaved samples. An error stops the stream.
pub trait DataSource: Send + 'static {
    fn get_data(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<(), AudioError>;
}

impl<F> DataSource for F
where
    F: FnMut(usize, &mut Vec<i16>) -> Result<(), AudioError> + Send + 'static,
{
    fn get_data(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<(), AudioError> {
        self(frames, out)
    }
}

/// Zeros, forever.
#[derive(Debug, Clone)]
pub struct Silence {
    channels: usize,
}

impl Silence {
    pub fn new(format: &StreamFormat) -> Self {
        Self {
            channels: format.channels as usize,
        }
    }
}

impl DataSource for Silence {
    fn get_data(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<(), AudioError> {
        out.clear();
        out.resize(frames * self.channels, 0);
        Ok(())
    }
}

/// Sine tone written to every channel.
#[derive(Debug, Clone)]
pub struct ToneSource {
    channels: usize,
    step: f32,
    phase: f32,
    amplitude: f32,
}

impl ToneSource {
    /// `volume` is clamped to `0.0..=1.0`.
    pub fn new(format: &StreamFormat, frequency: f32, volume: f32) -> Self {
        Self {
            channels: format.channels as usize,
            step: TAU * frequency / format.sample_rate as f32,
            phase: 0.0,
            amplitude: volume.clamp(0.0, 1.0) * i16::MAX as f32,
        }
    }
}

impl DataSource for ToneSource {
    fn get_data(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<(), AudioError> {
        out.clear();
        out.reserve(frames * self.channels);

        for _ in 0..frames {
            let sample = (self.phase.sin() * self.amplitude) as i16;
            out.extend(std::iter::repeat(sample).take(self.channels));
            self.phase = (self.phase + self.step) % TAU;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioSettings;

    fn stereo() -> StreamFormat {
        StreamFormat::from_settings(&AudioSettings::default()).unwrap()
    }

    #[test]
    fn silence_fills_every_channel() {
        let mut out = vec![7; 3];
        Silence::new(&stereo()).get_data(10, &mut out).unwrap();
        assert_eq!(out, vec![0; 20]);
    }

    #[test]
    fn tone_duplicates_frames_across_channels() {
        let mut out = Vec::new();
        ToneSource::new(&stereo(), 440.0, 0.5).get_data(64, &mut out).unwrap();

        assert_eq!(out.len(), 128);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(out.iter().any(|&s| s != 0));
        assert!(out.iter().all(|&s| s.unsigned_abs() <= i16::MAX as u16 / 2 + 1));
    }

    #[test]
    fn tone_phase_continues_between_calls() {
        let format = stereo();
        let mut whole = Vec::new();
        ToneSource::new(&format, 1000.0, 1.0).get_data(32, &mut whole).unwrap();

        let mut split = ToneSource::new(&format, 1000.0, 1.0);
        let (mut a, mut b) = (Vec::new(), Vec::new());
        split.get_data(16, &mut a).unwrap();
        split.get_data(16, &mut b).unwrap();
        a.extend(b);

        assert_eq!(a, whole);
    }

    #[test]
    fn closures_are_sources() {
        let mut calls = 0;
        let mut source = move |frames: usize, out: &mut Vec<i16>| {
            calls += 1;
            if calls > 1 {
                return Err(AudioError::SourceExhausted);
            }
            out.clear();
            out.resize(frames, 1);
            Ok(())
        };

        let mut out = Vec::new();
        assert!(source.get_data(4, &mut out).is_ok());
        assert_eq!(source.get_data(4, &mut out), Err(AudioError::SourceExhausted));
    }
}
