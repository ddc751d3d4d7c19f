use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("unsupported channel count {0} (expected 1, 2, 4, 6, 7 or 8)")]
    UnsupportedChannels(u16),

    #[error("invalid stream format: {0}")]
    InvalidFormat(String),

    #[error("data source is exhausted")]
    SourceExhausted,

    #[error("data source failed: {0}")]
    Source(String),

    #[error("data source returned {got} samples, expected {expected}")]
    ShortRead { expected: usize, got: usize },

    #[error("audio sink `{op}` failed: {message}")]
    Sink { op: &'static str, message: String },

    #[error("audio sink returned buffer {got}, expected {expected}")]
    OutOfOrder { expected: usize, got: usize },

    #[error("failed to spawn the audio thread: {0}")]
    ThreadSpawn(String),
}

impl AudioError {
    pub fn sink(op: &'static str, message: impl Into<String>) -> Self {
        Self::Sink {
            op,
            message: message.into(),
        }
    }
}
