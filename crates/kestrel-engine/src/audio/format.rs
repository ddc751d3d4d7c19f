use crate::config::AudioSettings;

use super::AudioError;

/// Channel layouts a sink can be opened with: mono, stereo, quad, 5.1, 6.1, 7.1.
pub const SUPPORTED_CHANNEL_COUNTS: [u16; 6] = [1, 2, 4, 6, 7, 8];

/// Interleaved signed 16-bit PCM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames_per_buffer: usize,
}

impl StreamFormat {
    pub fn from_settings(settings: &AudioSettings) -> Result<Self, AudioError> {
        if !SUPPORTED_CHANNEL_COUNTS.contains(&settings.channels) {
            return Err(AudioError::UnsupportedChannels(settings.channels));
        }
        if settings.sample_rate == 0 {
            return Err(AudioError::InvalidFormat("sample rate must be non-zero".into()));
        }
        if settings.frames_per_buffer == 0 {
            return Err(AudioError::InvalidFormat("buffers must hold at least one frame".into()));
        }
        if settings.buffer_count < 2 {
            return Err(AudioError::InvalidFormat(format!(
                "at least two buffers are needed for streaming, got {}",
                settings.buffer_count
            )));
        }

        Ok(Self {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            frames_per_buffer: settings.frames_per_buffer,
        })
    }

    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer * self.channels as usize
    }

    pub fn bytes_per_buffer(&self) -> usize {
        self.samples_per_buffer() * std::mem::size_of::<i16>()
    }
}
