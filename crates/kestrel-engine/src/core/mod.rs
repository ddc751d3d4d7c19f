//! Core engine-facing contracts.
//!
//! Defines the interface between the window runtime and application code.
//! Everything an application touches is handed to it through a context;
//! nothing is looked up globally.

mod app;
mod clock;
mod ctx;
mod thread;

pub use app::{App, AppControl};
pub use clock::{FrameClock, FrameTime};
pub use ctx::{FrameCtx, RuntimeCtx, StartCtx};

pub(crate) use app::AppListener;
pub(crate) use ctx::RuntimeCommand;
pub(crate) use thread::spawn_owning;
