//! Render device.
//!
//! This module is responsible for:
//! - bringing a graphics backend up against a window (display, surface,
//!   configuration, negotiated context)
//! - handing the context to a dedicated `render` thread
//! - feeding that thread `CommandBuffer`s in submission order
//! - stopping the thread and releasing platform handles on drop
//!
//! Backends implement [`GraphicsBackend`]. The render loop is generic over the
//! backend, so the concrete implementation is resolved once, when the device
//! is created.

mod backend;
pub(crate) mod caps;
mod error;
mod negotiate;
pub mod null;
mod render_device;
mod window;
mod worker;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub use backend::{BackendKind, GraphicsBackend, UnknownBackend};
pub use caps::{ApiVersion, Capabilities};
pub use error::{
    BackendError, ContextCreationError, InitStage, PresentError, RenderError, SubmitError,
};
pub use negotiate::negotiate_version;
pub use render_device::{RenderDevice, RenderState};
pub use window::{HeadlessWindow, NativeWindow};
