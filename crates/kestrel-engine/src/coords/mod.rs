//! Small geometry and color types shared by the command model, the backends
//! and the input subsystem.
//!
//! Render-side rectangles are in physical pixels with a top-left origin.
//! Input positions are whatever the producing platform reports (logical pixels
//! for the winit translation).

mod color;
mod rect;
mod size;
mod vec2;

pub use color::Color;
pub use rect::Rect;
pub use size::Size2;
pub use vec2::Vec2;
