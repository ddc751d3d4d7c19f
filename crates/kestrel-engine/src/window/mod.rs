//! Window + runtime loop.
//!
//! Owns the `winit` event loop and window and wires them to the render
//! device and the input manager.

mod runtime;

pub use runtime::Runtime;
