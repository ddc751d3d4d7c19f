use std::collections::{HashMap, HashSet};

use crate::coords::Vec2;

use super::types::{
    ControllerType, DeviceId, GamepadButton, InputEvent, InputListener, Key, MouseButton, TouchId,
};

/// One connected input device, owned by the `InputManager`.
#[derive(Debug, Clone)]
pub enum Controller {
    Keyboard(Keyboard),
    Mouse(Mouse),
    Gamepad(Gamepad),
    Touchpad(Touchpad),
}

impl Controller {
    pub(crate) fn new(kind: ControllerType, id: DeviceId) -> Self {
        match kind {
            ControllerType::Keyboard => Self::Keyboard(Keyboard::new(id)),
            ControllerType::Mouse => Self::Mouse(Mouse::new(id)),
            ControllerType::Gamepad => Self::Gamepad(Gamepad::new(id)),
            ControllerType::Touchpad => Self::Touchpad(Touchpad::new(id)),
        }
    }

    pub fn kind(&self) -> ControllerType {
        match self {
            Self::Keyboard(_) => ControllerType::Keyboard,
            Self::Mouse(_) => ControllerType::Mouse,
            Self::Gamepad(_) => ControllerType::Gamepad,
            Self::Touchpad(_) => ControllerType::Touchpad,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::Keyboard(c) => c.id,
            Self::Mouse(c) => c.id,
            Self::Gamepad(c) => c.id,
            Self::Touchpad(c) => c.id,
        }
    }
}

// ── keyboard ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Keyboard {
    id: DeviceId,
    held: HashSet<Key>,
}

impl Keyboard {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            held: HashSet::new(),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub(crate) fn handle_key_press(&mut self, key: Key, listener: &mut dyn InputListener) -> bool {
        let repeat = !self.held.insert(key);
        listener.on_input(&InputEvent::KeyPress {
            device: self.id,
            key,
            repeat,
        })
    }

    pub(crate) fn handle_key_release(&mut self, key: Key, listener: &mut dyn InputListener) -> bool {
        self.held.remove(&key);
        listener.on_input(&InputEvent::KeyRelease { device: self.id, key })
    }
}

// ── mouse ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Mouse {
    id: DeviceId,
    position: Vec2,
    held: HashSet<MouseButton>,
    locked: bool,
}

impl Mouse {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            position: Vec2::default(),
            held: HashSet::new(),
            locked: false,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_down(&self, button: MouseButton) -> bool {
        self.held.contains(&button)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn handle_button_press(
        &mut self,
        button: MouseButton,
        position: Vec2,
        listener: &mut dyn InputListener,
    ) -> bool {
        self.position = position;
        self.held.insert(button);
        listener.on_input(&InputEvent::MousePress {
            device: self.id,
            button,
            position,
        })
    }

    pub(crate) fn handle_button_release(
        &mut self,
        button: MouseButton,
        position: Vec2,
        listener: &mut dyn InputListener,
    ) -> bool {
        self.position = position;
        self.held.remove(&button);
        listener.on_input(&InputEvent::MouseRelease {
            device: self.id,
            button,
            position,
        })
    }

    pub(crate) fn handle_scroll(&mut self, delta: Vec2, position: Vec2, listener: &mut dyn InputListener) -> bool {
        self.position = position;
        listener.on_input(&InputEvent::MouseScroll {
            device: self.id,
            delta,
            position,
        })
    }

    pub(crate) fn handle_move(&mut self, position: Vec2, listener: &mut dyn InputListener) -> bool {
        let difference = position - self.position;
        self.position = position;
        listener.on_input(&InputEvent::MouseMove {
            device: self.id,
            position,
            difference,
        })
    }

    pub(crate) fn handle_relative_move(&mut self, delta: Vec2, listener: &mut dyn InputListener) -> bool {
        self.handle_move(self.position + delta, listener)
    }

    pub(crate) fn handle_lock_change(&mut self, locked: bool, listener: &mut dyn InputListener) -> bool {
        self.locked = locked;
        listener.on_input(&InputEvent::MouseLockChanged {
            device: self.id,
            locked,
        })
    }
}

// ── gamepad ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ButtonState {
    pub pressed: bool,
    pub value: f32,
}

#[derive(Debug, Clone)]
pub struct Gamepad {
    id: DeviceId,
    buttons: HashMap<GamepadButton, ButtonState>,
}

impl Gamepad {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            buttons: HashMap::new(),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    pub fn button(&self, button: GamepadButton) -> ButtonState {
        self.buttons.get(&button).copied().unwrap_or_default()
    }

    pub(crate) fn handle_button_value_change(
        &mut self,
        button: GamepadButton,
        pressed: bool,
        value: f32,
        listener: &mut dyn InputListener,
    ) -> bool {
        let previous = self.buttons.insert(button, ButtonState { pressed, value }).unwrap_or_default();
        listener.on_input(&InputEvent::GamepadButtonChange {
            device: self.id,
            button,
            pressed,
            value,
            previous_pressed: previous.pressed,
            previous_value: previous.value,
        })
    }
}

// ── touchpad ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Touchpad {
    id: DeviceId,
    touches: HashMap<TouchId, Vec2>,
}

impl Touchpad {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            touches: HashMap::new(),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    /// Current position of an active touch.
    pub fn touch(&self, touch: TouchId) -> Option<Vec2> {
        self.touches.get(&touch).copied()
    }

    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    pub(crate) fn handle_touch_begin(
        &mut self,
        touch: TouchId,
        position: Vec2,
        force: f32,
        listener: &mut dyn InputListener,
    ) -> bool {
        self.touches.insert(touch, position);
        listener.on_input(&InputEvent::TouchBegin {
            device: self.id,
            touch,
            position,
            force,
        })
    }

    /// A move for an unknown touch is measured from its own position.
    pub(crate) fn handle_touch_move(
        &mut self,
        touch: TouchId,
        position: Vec2,
        force: f32,
        listener: &mut dyn InputListener,
    ) -> bool {
        let previous = self.touches.insert(touch, position).unwrap_or(position);
        listener.on_input(&InputEvent::TouchMove {
            device: self.id,
            touch,
            position,
            difference: position - previous,
            force,
        })
    }

    pub(crate) fn handle_touch_end(
        &mut self,
        touch: TouchId,
        position: Vec2,
        force: f32,
        listener: &mut dyn InputListener,
    ) -> bool {
        self.touches.remove(&touch);
        listener.on_input(&InputEvent::TouchEnd {
            device: self.id,
            touch,
            position,
            force,
        })
    }

    pub(crate) fn handle_touch_cancel(
        &mut self,
        touch: TouchId,
        position: Vec2,
        force: f32,
        listener: &mut dyn InputListener,
    ) -> bool {
        self.touches.remove(&touch);
        listener.on_input(&InputEvent::TouchCancel {
            device: self.id,
            touch,
            position,
            force,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    /// Records events and answers with a fixed flag.
    struct Recorder {
        events: Vec<InputEvent>,
        answer: bool,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                answer: true,
            }
        }
    }

    impl InputListener for Recorder {
        fn on_input(&mut self, event: &InputEvent) -> bool {
            self.events.push(event.clone());
            self.answer
        }
    }

    // ── keyboard ──────────────────────────────────────────────────────────

    #[test]
    fn second_press_without_release_is_a_repeat() {
        let mut kb = Keyboard::new(DeviceId(1));
        let mut rec = Recorder::new();

        kb.handle_key_press(Key::A, &mut rec);
        kb.handle_key_press(Key::A, &mut rec);
        kb.handle_key_release(Key::A, &mut rec);
        kb.handle_key_press(Key::A, &mut rec);

        let repeats: Vec<bool> = rec
            .events
            .iter()
            .filter_map(|e| match e {
                InputEvent::KeyPress { repeat, .. } => Some(*repeat),
                _ => None,
            })
            .collect();
        assert_eq!(repeats, vec![false, true, false]);
        assert!(kb.is_down(Key::A));
    }

    #[test]
    fn listener_answer_is_returned() {
        let mut kb = Keyboard::new(DeviceId(1));
        let mut rec = Recorder::new();
        rec.answer = false;
        assert!(!kb.handle_key_press(Key::Space, &mut rec));
    }

    // ── mouse ─────────────────────────────────────────────────────────────

    #[test]
    fn mouse_move_carries_difference() {
        let mut mouse = Mouse::new(DeviceId(2));
        let mut rec = Recorder::new();

        mouse.handle_move(v(10.0, 10.0), &mut rec);
        mouse.handle_move(v(13.0, 6.0), &mut rec);

        assert_eq!(
            rec.events[1],
            InputEvent::MouseMove {
                device: DeviceId(2),
                position: v(13.0, 6.0),
                difference: v(3.0, -4.0),
            }
        );
    }

    #[test]
    fn relative_move_offsets_last_position() {
        let mut mouse = Mouse::new(DeviceId(2));
        let mut rec = Recorder::new();

        mouse.handle_move(v(5.0, 5.0), &mut rec);
        mouse.handle_relative_move(v(1.0, -2.0), &mut rec);
        assert_eq!(mouse.position(), v(6.0, 3.0));
    }

    #[test]
    fn buttons_and_lock_are_tracked() {
        let mut mouse = Mouse::new(DeviceId(2));
        let mut rec = Recorder::new();

        mouse.handle_button_press(MouseButton::Left, v(1.0, 2.0), &mut rec);
        assert!(mouse.is_down(MouseButton::Left));
        assert_eq!(mouse.position(), v(1.0, 2.0));

        mouse.handle_button_release(MouseButton::Left, v(1.0, 2.0), &mut rec);
        assert!(!mouse.is_down(MouseButton::Left));

        mouse.handle_lock_change(true, &mut rec);
        assert!(mouse.is_locked());
    }

    // ── gamepad ───────────────────────────────────────────────────────────

    #[test]
    fn gamepad_reports_previous_button_state() {
        let mut pad = Gamepad::new(DeviceId(3));
        let mut rec = Recorder::new();

        pad.handle_button_value_change(GamepadButton::South, true, 1.0, &mut rec);
        pad.handle_button_value_change(GamepadButton::South, false, 0.0, &mut rec);

        assert_eq!(
            rec.events[1],
            InputEvent::GamepadButtonChange {
                device: DeviceId(3),
                button: GamepadButton::South,
                pressed: false,
                value: 0.0,
                previous_pressed: true,
                previous_value: 1.0,
            }
        );
        assert_eq!(pad.button(GamepadButton::South), ButtonState::default());
    }

    // ── touchpad ──────────────────────────────────────────────────────────

    #[test]
    fn touch_move_reports_delta_from_previous_position() {
        let mut pad = Touchpad::new(DeviceId(4));
        let mut rec = Recorder::new();

        pad.handle_touch_begin(7, v(100.0, 100.0), 1.0, &mut rec);
        pad.handle_touch_move(7, v(110.0, 95.0), 1.0, &mut rec);

        match &rec.events[1] {
            InputEvent::TouchMove { difference, .. } => assert_eq!(*difference, v(10.0, -5.0)),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(pad.touch(7), Some(v(110.0, 95.0)));
    }

    #[test]
    fn touch_end_and_cancel_forget_the_touch() {
        let mut pad = Touchpad::new(DeviceId(4));
        let mut rec = Recorder::new();

        pad.handle_touch_begin(1, v(0.0, 0.0), 1.0, &mut rec);
        pad.handle_touch_begin(2, v(5.0, 5.0), 1.0, &mut rec);
        pad.handle_touch_end(1, v(0.0, 0.0), 0.0, &mut rec);
        pad.handle_touch_cancel(2, v(5.0, 5.0), 0.0, &mut rec);

        assert_eq!(pad.active_touches(), 0);
        assert_eq!(pad.touch(1), None);
    }

    #[test]
    fn move_of_unknown_touch_has_zero_difference() {
        let mut pad = Touchpad::new(DeviceId(4));
        let mut rec = Recorder::new();
        pad.handle_touch_move(9, v(3.0, 4.0), 1.0, &mut rec);

        match &rec.events[0] {
            InputEvent::TouchMove { difference, .. } => assert_eq!(*difference, Vec2::default()),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
