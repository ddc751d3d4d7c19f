use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use winit::dpi::PhysicalPosition;
use winit::event::{
    DeviceEvent, ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, Touch, TouchPhase,
    WindowEvent,
};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window};

use crate::coords::Vec2;
use crate::input::{
    ControllerType, DeviceId, EventSender, InputSystem, Key, MouseButton, PlatformEvent,
    PlatformEventKind, SystemCommand,
};

/// winit merges every keyboard, mouse and touch surface into one logical device each.
pub const PRIMARY_KEYBOARD: DeviceId = DeviceId(1);
pub const PRIMARY_MOUSE: DeviceId = DeviceId(2);
pub const PRIMARY_TOUCHPAD: DeviceId = DeviceId(3);

/// Translates winit window and device events into `PlatformEvent`s.
///
/// Lives on the event-loop thread; events are queued through the sender and
/// their tickets dropped.
pub struct WinitInput {
    sender: EventSender,
    cursor: Vec2,
    locked: Arc<AtomicBool>,
}

impl WinitInput {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender,
            cursor: Vec2::default(),
            locked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cursor system sharing this translator's lock state.
    pub fn cursor_system(&self, window: Arc<Window>) -> WinitCursor {
        WinitCursor {
            window,
            sender: self.sender.clone(),
            locked: self.locked.clone(),
        }
    }

    /// Announces the primary keyboard, mouse and touchpad.
    pub fn connect_devices(&self) {
        for (id, kind) in [
            (PRIMARY_KEYBOARD, ControllerType::Keyboard),
            (PRIMARY_MOUSE, ControllerType::Mouse),
            (PRIMARY_TOUCHPAD, ControllerType::Touchpad),
        ] {
            self.sender
                .send(PlatformEvent::new(id, PlatformEventKind::DeviceConnect(kind)));
        }
    }

    /// Returns true if the event was forwarded to the input queue.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match translate_window_event(event, &mut self.cursor) {
            Some(event) => {
                self.sender.send(event);
                true
            }
            None => false,
        }
    }

    /// Raw mouse motion is forwarded only while the cursor is locked.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) -> bool {
        let DeviceEvent::MouseMotion { delta: (dx, dy) } = event else {
            return false;
        };
        if !self.locked.load(Ordering::Acquire) {
            return false;
        }

        self.sender.send(PlatformEvent::new(
            PRIMARY_MOUSE,
            PlatformEventKind::MouseRelativeMove {
                delta: Vec2::new(*dx as f32, *dy as f32),
            },
        ));
        true
    }
}

/// Executes cursor and virtual-keyboard commands against the window.
pub struct WinitCursor {
    window: Arc<Window>,
    sender: EventSender,
    locked: Arc<AtomicBool>,
}

impl WinitCursor {
    fn set_locked(&mut self, locked: bool) {
        let result = if locked {
            self.window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };

        match result {
            Ok(()) => {
                self.locked.store(locked, Ordering::Release);
                self.sender.send(PlatformEvent::new(
                    PRIMARY_MOUSE,
                    PlatformEventKind::MouseLockChanged(locked),
                ));
            }
            Err(e) => log::warn!("input: failed to change cursor grab: {e}"),
        }
    }
}

impl InputSystem for WinitCursor {
    fn name(&self) -> &'static str {
        "winit"
    }

    fn execute(&mut self, command: SystemCommand) {
        match command {
            SystemCommand::SetCursorVisible(visible) => self.window.set_cursor_visible(visible),
            SystemCommand::SetCursorLocked(locked) => self.set_locked(locked),
            SystemCommand::ShowVirtualKeyboard => self.window.set_ime_allowed(true),
            SystemCommand::HideVirtualKeyboard => self.window.set_ime_allowed(false),
            SystemCommand::StartDeviceDiscovery | SystemCommand::StopDeviceDiscovery => {}
        }
    }
}

/// Translates one window event; `cursor` tracks the last pointer position
/// because winit does not attach it to button events.
///
/// Returns `None` for events the input subsystem does not represent.
pub fn translate_window_event(event: &WindowEvent, cursor: &mut Vec2) -> Option<PlatformEvent> {
    let (device, kind) = match event {
        WindowEvent::KeyboardInput { event, .. } => {
            let key = map_key(event.physical_key);
            let kind = match event.state {
                ElementState::Pressed => PlatformEventKind::KeyPress(key),
                ElementState::Released => PlatformEventKind::KeyRelease(key),
            };
            (PRIMARY_KEYBOARD, kind)
        }

        WindowEvent::CursorMoved { position, .. } => {
            *cursor = to_vec2(*position);
            (PRIMARY_MOUSE, PlatformEventKind::MouseMove { position: *cursor })
        }

        WindowEvent::MouseInput { state, button, .. } => {
            let button = map_mouse_button(*button);
            let position = *cursor;
            let kind = match state {
                ElementState::Pressed => PlatformEventKind::MousePress { button, position },
                ElementState::Released => PlatformEventKind::MouseRelease { button, position },
            };
            (PRIMARY_MOUSE, kind)
        }

        WindowEvent::MouseWheel { delta, .. } => {
            // Lines for wheels, physical pixels for precise touchpads.
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                MouseScrollDelta::PixelDelta(p) => to_vec2(*p),
            };
            (
                PRIMARY_MOUSE,
                PlatformEventKind::MouseScroll {
                    delta,
                    position: *cursor,
                },
            )
        }

        WindowEvent::Touch(touch) => (PRIMARY_TOUCHPAD, translate_touch(touch)),

        _ => return None,
    };

    Some(PlatformEvent::new(device, kind))
}

fn translate_touch(touch: &Touch) -> PlatformEventKind {
    let position = to_vec2(touch.location);
    let force = touch.force.map_or(1.0, |f| f.normalized() as f32);
    let id = touch.id;

    match touch.phase {
        TouchPhase::Started => PlatformEventKind::TouchBegin { touch: id, position, force },
        TouchPhase::Moved => PlatformEventKind::TouchMove { touch: id, position, force },
        TouchPhase::Ended => PlatformEventKind::TouchEnd { touch: id, position, force },
        TouchPhase::Cancelled => PlatformEventKind::TouchCancel { touch: id, position, force },
    }
}

fn to_vec2(p: PhysicalPosition<f64>) -> Vec2 {
    Vec2::new(p.x as f32, p.y as f32)
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    let code = match pk {
        PhysicalKey::Code(code) => code,
        // No stable numeric for NativeKeyCode in winit 0.30.
        PhysicalKey::Unidentified(_) => return Key::Unknown(0),
    };

    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
        KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,

        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,

        KeyCode::Digit0 => Key::Digit0,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::Digit5 => Key::Digit5,
        KeyCode::Digit6 => Key::Digit6,
        KeyCode::Digit7 => Key::Digit7,
        KeyCode::Digit8 => Key::Digit8,
        KeyCode::Digit9 => Key::Digit9,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,

        other => Key::Unknown(other as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::DeviceId as WinitDeviceId;

    fn device() -> WinitDeviceId {
        // SAFETY: only used as an opaque value in synthetic events.
        unsafe { WinitDeviceId::dummy() }
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn both_shift_keys_map_to_shift() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ShiftLeft)), Key::Shift);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ShiftRight)), Key::Shift);
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        assert!(matches!(map_key(PhysicalKey::Code(KeyCode::NumLock)), Key::Unknown(_)));
    }

    #[test]
    fn mouse_buttons_map_one_to_one() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(map_mouse_button(WinitMouseButton::Other(9)), MouseButton::Other(9));
    }

    // ── window events ─────────────────────────────────────────────────────

    #[test]
    fn button_events_use_last_cursor_position() {
        let mut cursor = Vec2::default();

        let moved = translate_window_event(
            &WindowEvent::CursorMoved {
                device_id: device(),
                position: PhysicalPosition::new(12.0, 34.0),
            },
            &mut cursor,
        )
        .unwrap();
        assert_eq!(moved.device_id, PRIMARY_MOUSE);

        let press = translate_window_event(
            &WindowEvent::MouseInput {
                device_id: device(),
                state: ElementState::Pressed,
                button: WinitMouseButton::Right,
            },
            &mut cursor,
        )
        .unwrap();
        assert_eq!(
            press.kind,
            PlatformEventKind::MousePress {
                button: MouseButton::Right,
                position: Vec2::new(12.0, 34.0),
            }
        );
    }

    #[test]
    fn line_scroll_is_passed_through() {
        let mut cursor = Vec2::new(1.0, 1.0);
        let scroll = translate_window_event(
            &WindowEvent::MouseWheel {
                device_id: device(),
                delta: MouseScrollDelta::LineDelta(0.0, -2.0),
                phase: TouchPhase::Moved,
            },
            &mut cursor,
        )
        .unwrap();
        assert_eq!(
            scroll.kind,
            PlatformEventKind::MouseScroll {
                delta: Vec2::new(0.0, -2.0),
                position: Vec2::new(1.0, 1.0),
            }
        );
    }

    #[test]
    fn touches_go_to_the_touchpad() {
        let mut cursor = Vec2::default();
        let touch = translate_window_event(
            &WindowEvent::Touch(Touch {
                device_id: device(),
                phase: TouchPhase::Started,
                location: PhysicalPosition::new(5.0, 6.0),
                force: None,
                id: 42,
            }),
            &mut cursor,
        )
        .unwrap();

        assert_eq!(touch.device_id, PRIMARY_TOUCHPAD);
        assert_eq!(
            touch.kind,
            PlatformEventKind::TouchBegin {
                touch: 42,
                position: Vec2::new(5.0, 6.0),
                force: 1.0,
            }
        );
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut cursor = Vec2::default();
        assert!(translate_window_event(&WindowEvent::Focused(true), &mut cursor).is_none());
    }
}
