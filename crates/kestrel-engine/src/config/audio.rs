use std::time::Duration;

/// Parameters for `StreamingDevice::start`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,

    /// Frames (samples per channel) pulled from the data source per buffer.
    pub frames_per_buffer: usize,

    /// Buffers in flight. Two gives classic double buffering.
    pub buffer_count: usize,

    /// Sleep between "buffers processed" polls.
    pub poll_interval: Duration,
}

impl AudioSettings {
    /// Interleaved samples per buffer.
    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer * self.channels as usize
    }

    /// Wall-clock length of one buffer.
    pub fn buffer_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames_per_buffer as f64 / self.sample_rate.max(1) as f64)
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            frames_per_buffer: 2048,
            buffer_count: 2,
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sizes_follow_channel_count() {
        let settings = AudioSettings {
            channels: 6,
            frames_per_buffer: 100,
            ..Default::default()
        };
        assert_eq!(settings.samples_per_buffer(), 600);
    }

    #[test]
    fn buffer_duration_at_default_rate() {
        let settings = AudioSettings {
            frames_per_buffer: 4410,
            ..Default::default()
        };
        assert_eq!(settings.buffer_duration(), Duration::from_millis(100));
    }
}
