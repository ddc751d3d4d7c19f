//! Streaming audio output.
//!
//! A [`StreamingDevice`] keeps `buffer_count` buffers queued on a
//! [`QueuedSink`]. Its `audio` thread polls the sink for finished buffers,
//! refills each one from a [`DataSource`], queues it again and restarts
//! playback when the sink ran dry in the meantime.

mod error;
mod format;
mod software;
mod source;
mod stream;

pub use error::AudioError;
pub use format::{StreamFormat, SUPPORTED_CHANNEL_COUNTS};
pub use software::SoftwareSink;
pub use source::{DataSource, Silence, ToneSource};
pub use stream::{QueuedSink, SinkState, StreamingDevice};
