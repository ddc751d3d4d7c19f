use std::collections::HashMap;

use super::completion::{EventSender, SharedQueue};
use super::controller::{Controller, Gamepad, Keyboard, Mouse, Touchpad};
use super::event::{PlatformEvent, PlatformEventKind};
use super::system::{InputSystem, SystemCommand};
use super::types::{ControllerType, DeviceId, InputEvent, InputListener};

/// Owns every connected controller and drains the cross-thread event queue.
///
/// Platform threads push events through an [`EventSender`]; the main thread
/// calls [`update`](Self::update) once per tick.
pub struct InputManager {
    queue: SharedQueue,
    controllers: HashMap<DeviceId, Controller>,
    /// Connection order; any disconnect resets the active device of that kind
    /// to the latest connected one remaining.
    order: Vec<DeviceId>,
    keyboard: Option<DeviceId>,
    mouse: Option<DeviceId>,
    touchpad: Option<DeviceId>,
    discovering: bool,
    systems: Vec<Box<dyn InputSystem>>,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            queue: SharedQueue::default(),
            controllers: HashMap::new(),
            order: Vec::new(),
            keyboard: None,
            mouse: None,
            touchpad: None,
            discovering: false,
            systems: Vec::new(),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender::new(self.queue.clone())
    }

    pub fn add_system(&mut self, system: Box<dyn InputSystem>) {
        log::debug!("input: registered system `{}`", system.name());
        self.systems.push(system);
    }

    /// Dispatches every queued event in enqueue order and resolves each
    /// ticket exactly once. Returns the number of events dispatched.
    pub fn update(&mut self, listener: &mut dyn InputListener) -> usize {
        let events = {
            let mut queue = self.queue.lock();
            if queue.events.is_empty() {
                return 0;
            }
            std::mem::take(&mut queue.events)
        };

        let count = events.len();
        for (event, completion) in events {
            let handled = self.handle_event(&event, listener);
            completion.resolve(handled);
        }
        count
    }

    /// Routes one platform event to its controller.
    ///
    /// Events for unknown devices are dropped and reported as not handled.
    pub fn handle_event(&mut self, event: &PlatformEvent, listener: &mut dyn InputListener) -> bool {
        let id = event.device_id;

        match &event.kind {
            PlatformEventKind::DeviceConnect(kind) => self.connect(id, *kind, listener),
            PlatformEventKind::DeviceDisconnect => self.disconnect(id, listener),
            PlatformEventKind::DeviceDiscoveryComplete => {
                self.discovering = false;
                true
            }
            kind => {
                let Some(controller) = self.controllers.get_mut(&id) else {
                    log::trace!("input: {} for unknown {id} dropped", kind.name());
                    return false;
                };
                dispatch(controller, kind, listener)
            }
        }
    }

    fn connect(&mut self, id: DeviceId, kind: ControllerType, listener: &mut dyn InputListener) -> bool {
        if let Some(existing) = self.controllers.get(&id) {
            log::warn!(
                "input: {id} connected twice (already a {}); ignoring",
                existing.kind()
            );
            return false;
        }

        self.controllers.insert(id, Controller::new(kind, id));
        self.order.push(id);
        match kind {
            ControllerType::Keyboard => {
                self.keyboard.get_or_insert(id);
            }
            ControllerType::Mouse => {
                self.mouse.get_or_insert(id);
            }
            ControllerType::Touchpad => {
                self.touchpad.get_or_insert(id);
            }
            ControllerType::Gamepad => {}
        }

        log::debug!("input: {kind} {id} connected");
        listener.on_input(&InputEvent::DeviceConnected { device: id, kind })
    }

    fn disconnect(&mut self, id: DeviceId, listener: &mut dyn InputListener) -> bool {
        let Some(controller) = self.controllers.remove(&id) else {
            log::trace!("input: disconnect for unknown {id} dropped");
            return false;
        };
        self.order.retain(|d| *d != id);

        let kind = controller.kind();
        let replacement = self
            .order
            .iter()
            .rev()
            .copied()
            .find(|d| self.controllers.get(d).is_some_and(|c| c.kind() == kind));
        let active = match kind {
            ControllerType::Keyboard => Some(&mut self.keyboard),
            ControllerType::Mouse => Some(&mut self.mouse),
            ControllerType::Touchpad => Some(&mut self.touchpad),
            ControllerType::Gamepad => None,
        };
        if let Some(active) = active {
            *active = replacement;
        }

        log::debug!("input: {kind} {id} disconnected");
        listener.on_input(&InputEvent::DeviceDisconnected { device: id, kind })
    }

    // ── lookup ────────────────────────────────────────────────────────────

    pub fn controller(&self, id: DeviceId) -> Option<&Controller> {
        self.controllers.get(&id)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.order.iter().filter_map(|id| self.controllers.get(id))
    }

    /// Active keyboard: the first connected, reset to the latest remaining one
    /// whenever any keyboard disconnects.
    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self.controllers.get(self.keyboard.as_ref()?)? {
            Controller::Keyboard(k) => Some(k),
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<&Mouse> {
        match self.controllers.get(self.mouse.as_ref()?)? {
            Controller::Mouse(m) => Some(m),
            _ => None,
        }
    }

    pub fn touchpad(&self) -> Option<&Touchpad> {
        match self.controllers.get(self.touchpad.as_ref()?)? {
            Controller::Touchpad(t) => Some(t),
            _ => None,
        }
    }

    pub fn gamepads(&self) -> impl Iterator<Item = &Gamepad> {
        self.controllers().filter_map(|c| match c {
            Controller::Gamepad(g) => Some(g),
            _ => None,
        })
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    // ── platform commands ─────────────────────────────────────────────────

    pub fn start_device_discovery(&mut self) {
        self.discovering = true;
        self.broadcast(SystemCommand::StartDeviceDiscovery);
    }

    pub fn stop_device_discovery(&mut self) {
        self.discovering = false;
        self.broadcast(SystemCommand::StopDeviceDiscovery);
    }

    pub fn show_virtual_keyboard(&mut self) {
        self.broadcast(SystemCommand::ShowVirtualKeyboard);
    }

    pub fn hide_virtual_keyboard(&mut self) {
        self.broadcast(SystemCommand::HideVirtualKeyboard);
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.broadcast(SystemCommand::SetCursorVisible(visible));
    }

    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.broadcast(SystemCommand::SetCursorLocked(locked));
    }

    fn broadcast(&mut self, command: SystemCommand) {
        for system in &mut self.systems {
            system.execute(command);
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputManager {
    /// Abandons undispatched events and refuses new ones.
    fn drop(&mut self) {
        let pending = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            std::mem::take(&mut queue.events)
        };
        if !pending.is_empty() {
            log::debug!("input: {} queued event(s) abandoned", pending.len());
        }
    }
}

fn dispatch(controller: &mut Controller, kind: &PlatformEventKind, listener: &mut dyn InputListener) -> bool {
    use PlatformEventKind as K;

    match (controller, kind) {
        (Controller::Keyboard(k), K::KeyPress(key)) => k.handle_key_press(*key, listener),
        (Controller::Keyboard(k), K::KeyRelease(key)) => k.handle_key_release(*key, listener),

        (Controller::Mouse(m), K::MousePress { button, position }) => {
            m.handle_button_press(*button, *position, listener)
        }
        (Controller::Mouse(m), K::MouseRelease { button, position }) => {
            m.handle_button_release(*button, *position, listener)
        }
        (Controller::Mouse(m), K::MouseScroll { delta, position }) => m.handle_scroll(*delta, *position, listener),
        (Controller::Mouse(m), K::MouseMove { position }) => m.handle_move(*position, listener),
        (Controller::Mouse(m), K::MouseRelativeMove { delta }) => m.handle_relative_move(*delta, listener),
        (Controller::Mouse(m), K::MouseLockChanged(locked)) => m.handle_lock_change(*locked, listener),

        (Controller::Gamepad(g), K::GamepadButtonChange { button, pressed, value }) => {
            g.handle_button_value_change(*button, *pressed, *value, listener)
        }

        (Controller::Touchpad(t), K::TouchBegin { touch, position, force }) => {
            t.handle_touch_begin(*touch, *position, *force, listener)
        }
        (Controller::Touchpad(t), K::TouchMove { touch, position, force }) => {
            t.handle_touch_move(*touch, *position, *force, listener)
        }
        (Controller::Touchpad(t), K::TouchEnd { touch, position, force }) => {
            t.handle_touch_end(*touch, *position, *force, listener)
        }
        (Controller::Touchpad(t), K::TouchCancel { touch, position, force }) => {
            t.handle_touch_cancel(*touch, *position, *force, listener)
        }

        (controller, kind) => {
            log::error!(
                "input: {} sent to {} {}",
                kind.name(),
                controller.kind(),
                controller.device_id()
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::input::Key;
    use std::sync::Arc;
    use parking_lot::Mutex;

    fn ev(id: u32, kind: PlatformEventKind) -> PlatformEvent {
        PlatformEvent::new(DeviceId(id), kind)
    }

    fn connect(id: u32, kind: ControllerType) -> PlatformEvent {
        ev(id, PlatformEventKind::DeviceConnect(kind))
    }

    fn accept_all() -> impl FnMut(&InputEvent) -> bool {
        |_| true
    }

    #[derive(Clone, Default)]
    struct Commands(Arc<Mutex<Vec<SystemCommand>>>);

    impl InputSystem for Commands {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn execute(&mut self, command: SystemCommand) {
            self.0.lock().push(command);
        }
    }

    // ── connect / disconnect ──────────────────────────────────────────────

    #[test]
    fn first_keyboard_becomes_active() {
        let mut input = InputManager::new();
        let mut l = accept_all();

        input.handle_event(&connect(1, ControllerType::Keyboard), &mut l);
        input.handle_event(&connect(2, ControllerType::Keyboard), &mut l);

        assert_eq!(input.keyboard().map(Keyboard::device_id), Some(DeviceId(1)));
    }

    #[test]
    fn disconnect_hands_active_role_to_remaining_keyboard() {
        let mut input = InputManager::new();
        let mut l = accept_all();

        input.handle_event(&connect(1, ControllerType::Keyboard), &mut l);
        input.handle_event(&connect(2, ControllerType::Mouse), &mut l);
        input.handle_event(&connect(3, ControllerType::Keyboard), &mut l);
        input.handle_event(&ev(1, PlatformEventKind::DeviceDisconnect), &mut l);

        assert_eq!(input.keyboard().map(Keyboard::device_id), Some(DeviceId(3)));
        assert_eq!(input.mouse().map(Mouse::device_id), Some(DeviceId(2)));
    }

    #[test]
    fn any_disconnect_resets_active_to_latest_remaining() {
        let mut input = InputManager::new();
        let mut l = accept_all();

        input.handle_event(&connect(1, ControllerType::Keyboard), &mut l);
        input.handle_event(&connect(2, ControllerType::Keyboard), &mut l);
        input.handle_event(&connect(3, ControllerType::Keyboard), &mut l);
        input.handle_event(&connect(4, ControllerType::Mouse), &mut l);
        assert_eq!(input.keyboard().map(Keyboard::device_id), Some(DeviceId(1)));

        input.handle_event(&ev(2, PlatformEventKind::DeviceDisconnect), &mut l);
        assert_eq!(input.keyboard().map(Keyboard::device_id), Some(DeviceId(3)));

        input.handle_event(&ev(4, PlatformEventKind::DeviceDisconnect), &mut l);
        assert_eq!(input.keyboard().map(Keyboard::device_id), Some(DeviceId(3)));
        assert!(input.mouse().is_none());
    }

    #[test]
    fn disconnect_of_last_mouse_clears_active_mouse() {
        let mut input = InputManager::new();
        let mut l = accept_all();

        input.handle_event(&connect(5, ControllerType::Mouse), &mut l);
        input.handle_event(&ev(5, PlatformEventKind::DeviceDisconnect), &mut l);

        assert!(input.mouse().is_none());
        assert!(input.controller(DeviceId(5)).is_none());
    }

    #[test]
    fn duplicate_connect_keeps_first_controller() {
        let mut input = InputManager::new();
        let mut l = accept_all();

        assert!(input.handle_event(&connect(1, ControllerType::Keyboard), &mut l));
        assert!(!input.handle_event(&connect(1, ControllerType::Mouse), &mut l));
        assert_eq!(input.controller(DeviceId(1)).map(Controller::kind), Some(ControllerType::Keyboard));
    }

    #[test]
    fn gamepads_are_listed_in_connection_order() {
        let mut input = InputManager::new();
        let mut l = accept_all();

        input.handle_event(&connect(20, ControllerType::Gamepad), &mut l);
        input.handle_event(&connect(10, ControllerType::Gamepad), &mut l);

        let ids: Vec<DeviceId> = input.gamepads().map(Gamepad::device_id).collect();
        assert_eq!(ids, vec![DeviceId(20), DeviceId(10)]);
    }

    // ── routing ───────────────────────────────────────────────────────────

    #[test]
    fn events_for_unknown_devices_are_not_handled() {
        let mut input = InputManager::new();
        let mut called = false;
        let mut l = |_: &InputEvent| {
            called = true;
            true
        };

        assert!(!input.handle_event(&ev(9, PlatformEventKind::KeyPress(Key::A)), &mut l));
        assert!(!input.handle_event(&ev(9, PlatformEventKind::DeviceDisconnect), &mut l));
        assert!(!called);
    }

    #[test]
    fn event_for_wrong_controller_type_is_not_handled() {
        let mut input = InputManager::new();
        let mut l = accept_all();
        input.handle_event(&connect(2, ControllerType::Mouse), &mut l);

        assert!(!input.handle_event(&ev(2, PlatformEventKind::KeyPress(Key::A)), &mut l));
    }

    #[test]
    fn discovery_complete_always_succeeds() {
        let mut input = InputManager::new();
        input.start_device_discovery();
        assert!(input.is_discovering());

        let mut l = |_: &InputEvent| false;
        assert!(input.handle_event(&ev(0, PlatformEventKind::DeviceDiscoveryComplete), &mut l));
        assert!(!input.is_discovering());
    }

    #[test]
    fn controller_state_follows_events() {
        let mut input = InputManager::new();
        let mut l = accept_all();
        input.handle_event(&connect(2, ControllerType::Mouse), &mut l);
        input.handle_event(
            &ev(2, PlatformEventKind::MouseMove { position: Vec2::new(4.0, 8.0) }),
            &mut l,
        );

        assert_eq!(input.mouse().map(Mouse::position), Some(Vec2::new(4.0, 8.0)));
    }

    // ── queue ─────────────────────────────────────────────────────────────

    #[test]
    fn update_on_empty_queue_does_nothing() {
        let mut input = InputManager::new();
        assert_eq!(input.update(&mut accept_all()), 0);
    }

    #[test]
    fn update_drains_everything_in_order() {
        let mut input = InputManager::new();
        let tx = input.sender();

        let t1 = tx.send(connect(1, ControllerType::Keyboard));
        let t2 = tx.send(ev(1, PlatformEventKind::KeyPress(Key::Q)));
        let t3 = tx.send(ev(1, PlatformEventKind::KeyRelease(Key::Q)));

        let mut seen = Vec::new();
        let mut l = |e: &InputEvent| {
            seen.push(e.clone());
            !matches!(e, InputEvent::KeyRelease { .. })
        };
        assert_eq!(input.update(&mut l), 3);

        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[1], InputEvent::KeyPress { key: Key::Q, .. }));
        assert_eq!(t1.wait(), Ok(true));
        assert_eq!(t2.wait(), Ok(true));
        assert_eq!(t3.wait(), Ok(false));
        assert_eq!(input.update(&mut accept_all()), 0);
    }

    #[test]
    fn dropping_manager_abandons_pending_events() {
        let input = InputManager::new();
        let tx = input.sender();
        let ticket = tx.send(connect(1, ControllerType::Keyboard));

        drop(input);
        assert_eq!(ticket.wait(), Err(crate::input::CompletionError::Abandoned));
        assert!(tx.is_closed());
    }

    // ── systems ───────────────────────────────────────────────────────────

    #[test]
    fn platform_commands_reach_every_system() {
        let mut input = InputManager::new();
        let a = Commands::default();
        let b = Commands::default();
        input.add_system(Box::new(a.clone()));
        input.add_system(Box::new(b.clone()));

        input.set_cursor_locked(true);
        input.show_virtual_keyboard();
        input.stop_device_discovery();

        let expected = vec![
            SystemCommand::SetCursorLocked(true),
            SystemCommand::ShowVirtualKeyboard,
            SystemCommand::StopDeviceDiscovery,
        ];
        assert_eq!(*a.0.lock(), expected);
        assert_eq!(*b.0.lock(), expected);
    }
}
