use std::fmt;

use crate::coords::Vec2;

/// Platform-assigned identifier of one input device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Identifies one finger for the duration of a touch.
pub type TouchId = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ControllerType {
    Keyboard,
    Mouse,
    Gamepad,
    Touchpad,
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
            Self::Gamepad => "gamepad",
            Self::Touchpad => "touchpad",
        })
    }
}

/// Keyboard key identifier.
///
/// Platform layers map scancodes into these variants where possible and use
/// `Key::Unknown(u32)` with a stable platform code otherwise.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,
    Meta,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Gamepad buttons, with analog sticks split into one pseudo-button per direction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GamepadButton {
    South,
    East,
    North,
    West,
    C,
    Z,
    LeftTrigger,
    RightTrigger,
    LeftTrigger2,
    RightTrigger2,
    Select,
    Start,
    Mode,
    LeftThumb,
    RightThumb,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    LeftStickUp,
    LeftStickDown,
    LeftStickLeft,
    LeftStickRight,
    RightStickUp,
    RightStickDown,
    RightStickLeft,
    RightStickRight,
    Unknown,
}

/// Engine-level input events, emitted by controllers to the active listener.
///
/// Positions are physical pixels relative to the window's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    DeviceConnected {
        device: DeviceId,
        kind: ControllerType,
    },
    DeviceDisconnected {
        device: DeviceId,
        kind: ControllerType,
    },

    KeyPress {
        device: DeviceId,
        key: Key,
        /// Key was already held.
        repeat: bool,
    },
    KeyRelease {
        device: DeviceId,
        key: Key,
    },

    MousePress {
        device: DeviceId,
        button: MouseButton,
        position: Vec2,
    },
    MouseRelease {
        device: DeviceId,
        button: MouseButton,
        position: Vec2,
    },
    MouseScroll {
        device: DeviceId,
        delta: Vec2,
        position: Vec2,
    },
    MouseMove {
        device: DeviceId,
        position: Vec2,
        difference: Vec2,
    },
    MouseLockChanged {
        device: DeviceId,
        locked: bool,
    },

    GamepadButtonChange {
        device: DeviceId,
        button: GamepadButton,
        pressed: bool,
        value: f32,
        previous_pressed: bool,
        previous_value: f32,
    },

    TouchBegin {
        device: DeviceId,
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
    TouchMove {
        device: DeviceId,
        touch: TouchId,
        position: Vec2,
        /// Offset from the previous position of this touch.
        difference: Vec2,
        force: f32,
    },
    TouchEnd {
        device: DeviceId,
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
    TouchCancel {
        device: DeviceId,
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
}

impl InputEvent {
    pub fn device(&self) -> DeviceId {
        match self {
            Self::DeviceConnected { device, .. }
            | Self::DeviceDisconnected { device, .. }
            | Self::KeyPress { device, .. }
            | Self::KeyRelease { device, .. }
            | Self::MousePress { device, .. }
            | Self::MouseRelease { device, .. }
            | Self::MouseScroll { device, .. }
            | Self::MouseMove { device, .. }
            | Self::MouseLockChanged { device, .. }
            | Self::GamepadButtonChange { device, .. }
            | Self::TouchBegin { device, .. }
            | Self::TouchMove { device, .. }
            | Self::TouchEnd { device, .. }
            | Self::TouchCancel { device, .. } => *device,
        }
    }
}

/// Receives engine-level input events; returns whether the event was handled.
pub trait InputListener {
    fn on_input(&mut self, event: &InputEvent) -> bool;
}

impl<F> InputListener for F
where
    F: FnMut(&InputEvent) -> bool,
{
    fn on_input(&mut self, event: &InputEvent) -> bool {
        self(event)
    }
}
