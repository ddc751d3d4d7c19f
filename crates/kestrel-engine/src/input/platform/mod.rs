//! Platform input systems feeding the `InputManager` queue.

pub mod gamepad;
pub mod winit;

pub use gamepad::GamepadSystem;
pub use self::winit::{WinitCursor, WinitInput, PRIMARY_KEYBOARD, PRIMARY_MOUSE, PRIMARY_TOUCHPAD};
