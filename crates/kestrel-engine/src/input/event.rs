use crate::coords::Vec2;

use super::types::{ControllerType, DeviceId, GamepadButton, Key, MouseButton, TouchId};

/// Raw event produced by a platform input system.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformEvent {
    pub device_id: DeviceId,
    pub kind: PlatformEventKind,
}

impl PlatformEvent {
    pub fn new(device_id: DeviceId, kind: PlatformEventKind) -> Self {
        Self { device_id, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEventKind {
    DeviceConnect(ControllerType),
    DeviceDisconnect,
    DeviceDiscoveryComplete,

    GamepadButtonChange {
        button: GamepadButton,
        pressed: bool,
        value: f32,
    },

    KeyPress(Key),
    KeyRelease(Key),

    MousePress {
        button: MouseButton,
        position: Vec2,
    },
    MouseRelease {
        button: MouseButton,
        position: Vec2,
    },
    MouseScroll {
        delta: Vec2,
        position: Vec2,
    },
    MouseMove {
        position: Vec2,
    },
    /// Motion reported while the cursor is locked.
    MouseRelativeMove {
        delta: Vec2,
    },
    MouseLockChanged(bool),

    TouchBegin {
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
    TouchMove {
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
    TouchEnd {
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
    TouchCancel {
        touch: TouchId,
        position: Vec2,
        force: f32,
    },
}

impl PlatformEventKind {
    /// Stable label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceConnect(_) => "DeviceConnect",
            Self::DeviceDisconnect => "DeviceDisconnect",
            Self::DeviceDiscoveryComplete => "DeviceDiscoveryComplete",
            Self::GamepadButtonChange { .. } => "GamepadButtonChange",
            Self::KeyPress(_) => "KeyPress",
            Self::KeyRelease(_) => "KeyRelease",
            Self::MousePress { .. } => "MousePress",
            Self::MouseRelease { .. } => "MouseRelease",
            Self::MouseScroll { .. } => "MouseScroll",
            Self::MouseMove { .. } => "MouseMove",
            Self::MouseRelativeMove { .. } => "MouseRelativeMove",
            Self::MouseLockChanged(_) => "MouseLockChanged",
            Self::TouchBegin { .. } => "TouchBegin",
            Self::TouchMove { .. } => "TouchMove",
            Self::TouchEnd { .. } => "TouchEnd",
            Self::TouchCancel { .. } => "TouchCancel",
        }
    }

    /// Controller type the event is addressed to, for device-scoped events.
    pub fn target(&self) -> Option<ControllerType> {
        match self {
            Self::DeviceConnect(_) | Self::DeviceDisconnect | Self::DeviceDiscoveryComplete => None,
            Self::GamepadButtonChange { .. } => Some(ControllerType::Gamepad),
            Self::KeyPress(_) | Self::KeyRelease(_) => Some(ControllerType::Keyboard),
            Self::MousePress { .. }
            | Self::MouseRelease { .. }
            | Self::MouseScroll { .. }
            | Self::MouseMove { .. }
            | Self::MouseRelativeMove { .. }
            | Self::MouseLockChanged(_) => Some(ControllerType::Mouse),
            Self::TouchBegin { .. }
            | Self::TouchMove { .. }
            | Self::TouchEnd { .. }
            | Self::TouchCancel { .. } => Some(ControllerType::Touchpad),
        }
    }
}
