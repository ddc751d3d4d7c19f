//! Input subsystem.
//!
//! Platform systems run on their own threads and push [`PlatformEvent`]s
//! through an [`EventSender`]. The main thread drains them with
//! [`InputManager::update`], which routes each event to its controller and
//! reports the listener's answer back through the event's [`EventTicket`].
//!
//! The public API does not expose winit or gilrs types outside `platform`.

mod completion;
mod controller;
mod event;
mod manager;
pub mod platform;
mod system;
mod types;

pub use completion::{CompletionError, EventSender, EventTicket};
pub use controller::{ButtonState, Controller, Gamepad, Keyboard, Mouse, Touchpad};
pub use event::{PlatformEvent, PlatformEventKind};
pub use manager::InputManager;
pub use system::{InputSystem, SystemCommand};
pub use types::{
    ControllerType,
    DeviceId,
    GamepadButton,
    InputEvent,
    InputListener,
    Key,
    MouseButton,
    TouchId,
};
