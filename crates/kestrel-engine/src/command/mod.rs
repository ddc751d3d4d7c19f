//! Command model.
//!
//! Producers record [`Command`]s into a [`CommandBuffer`] and move the buffer
//! into the render device. The render thread consumes buffers strictly in
//! submission order and each command exactly once.
//!
//! Extending the command set:
//! - add a variant to `Command` (and its name in `Command::name`)
//! - handle it in every `GraphicsBackend::execute` implementation

mod buffer;
mod cmd;
mod ids;

pub use buffer::CommandBuffer;
pub use cmd::{BlendMode, BufferUsage, Command, CullMode, DrawCall, IndexBinding, IndexFormat, Topology};
pub use ids::{BufferId, ResourceId, ResourceIds, ShaderId, TextureId};
