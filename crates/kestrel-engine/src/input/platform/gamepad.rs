use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};

use crate::input::{
    ControllerType, DeviceId, EventSender, GamepadButton, InputSystem, PlatformEvent,
    PlatformEventKind, SystemCommand,
};

/// Gamepad device ids start here so they never collide with the primary
/// keyboard/mouse/touchpad.
pub const GAMEPAD_ID_BASE: u32 = 0x100;

/// Analog values above this count as pressed.
pub const PRESS_THRESHOLD: f32 = 0.5;

const POLL_INTERVAL: Duration = Duration::from_millis(4);

/// Polls gilrs on a `gamepad-input` thread.
///
/// Connected pads are announced at startup and on every device discovery.
pub struct GamepadSystem {
    commands: Sender<SystemCommand>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl GamepadSystem {
    pub fn start(sender: EventSender) -> std::io::Result<Self> {
        let (commands, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));

        let thread = std::thread::Builder::new().name("gamepad-input".to_string()).spawn({
            let running = running.clone();
            move || run(sender, receiver, running)
        })?;

        Ok(Self {
            commands,
            running,
            thread: Some(thread),
        })
    }
}

impl InputSystem for GamepadSystem {
    fn name(&self) -> &'static str {
        "gilrs"
    }

    fn execute(&mut self, command: SystemCommand) {
        if self.commands.send(command).is_err() {
            log::debug!("input: gamepad thread is gone; {command:?} dropped");
        }
    }
}

impl Drop for GamepadSystem {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("input: gamepad thread panicked");
            }
        }
    }
}

fn run(sender: EventSender, commands: Receiver<SystemCommand>, running: Arc<AtomicBool>) {
    let mut gilrs = match Gilrs::new() {
        Ok(gilrs) => gilrs,
        Err(gilrs::Error::NotImplemented(dummy)) => {
            log::warn!("input: gamepads are not supported on this platform");
            dummy
        }
        Err(e) => {
            log::error!("input: failed to initialise gilrs: {e}");
            return;
        }
    };

    let mut announced = HashSet::new();
    announce(&gilrs, &sender, &mut announced);

    while running.load(Ordering::Acquire) {
        while let Ok(command) = commands.try_recv() {
            if command == SystemCommand::StartDeviceDiscovery {
                announce(&gilrs, &sender, &mut announced);
                sender.send(PlatformEvent::new(
                    DeviceId(GAMEPAD_ID_BASE),
                    PlatformEventKind::DeviceDiscoveryComplete,
                ));
            }
        }

        while let Some(event) = gilrs.next_event() {
            let device = device_id(event.id);
            match event.event {
                EventType::Connected => {
                    if announced.insert(event.id) {
                        sender.send(PlatformEvent::new(
                            device,
                            PlatformEventKind::DeviceConnect(ControllerType::Gamepad),
                        ));
                    }
                }
                EventType::Disconnected => {
                    announced.remove(&event.id);
                    sender.send(PlatformEvent::new(device, PlatformEventKind::DeviceDisconnect));
                }
                EventType::ButtonChanged(button, value, _) => {
                    sender.send(PlatformEvent::new(device, button_change(map_button(button), value)));
                }
                EventType::AxisChanged(axis, value, _) => {
                    let Some((positive, negative)) = axis_buttons(axis) else {
                        continue;
                    };
                    sender.send(PlatformEvent::new(device, button_change(positive, value.max(0.0))));
                    sender.send(PlatformEvent::new(device, button_change(negative, (-value).max(0.0))));
                }
                _ => {}
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
    log::debug!("input: gamepad thread exiting");
}

fn announce(gilrs: &Gilrs, sender: &EventSender, announced: &mut HashSet<GamepadId>) {
    for (id, pad) in gilrs.gamepads() {
        if announced.insert(id) {
            log::info!("input: gamepad `{}` connected", pad.name());
            sender.send(PlatformEvent::new(
                device_id(id),
                PlatformEventKind::DeviceConnect(ControllerType::Gamepad),
            ));
        }
    }
}

fn device_id(id: GamepadId) -> DeviceId {
    DeviceId(GAMEPAD_ID_BASE + usize::from(id) as u32)
}

fn button_change(button: GamepadButton, value: f32) -> PlatformEventKind {
    PlatformEventKind::GamepadButtonChange {
        button,
        pressed: value > PRESS_THRESHOLD,
        value,
    }
}

fn map_button(button: Button) -> GamepadButton {
    match button {
        Button::South => GamepadButton::South,
        Button::East => GamepadButton::East,
        Button::North => GamepadButton::North,
        Button::West => GamepadButton::West,
        Button::C => GamepadButton::C,
        Button::Z => GamepadButton::Z,
        Button::LeftTrigger => GamepadButton::LeftTrigger,
        Button::RightTrigger => GamepadButton::RightTrigger,
        Button::LeftTrigger2 => GamepadButton::LeftTrigger2,
        Button::RightTrigger2 => GamepadButton::RightTrigger2,
        Button::Select => GamepadButton::Select,
        Button::Start => GamepadButton::Start,
        Button::Mode => GamepadButton::Mode,
        Button::LeftThumb => GamepadButton::LeftThumb,
        Button::RightThumb => GamepadButton::RightThumb,
        Button::DPadUp => GamepadButton::DPadUp,
        Button::DPadDown => GamepadButton::DPadDown,
        Button::DPadLeft => GamepadButton::DPadLeft,
        Button::DPadRight => GamepadButton::DPadRight,
        Button::Unknown => GamepadButton::Unknown,
    }
}

/// (positive, negative) pseudo-buttons of a stick axis. D-pad and Z axes
/// duplicate button events and are skipped.
fn axis_buttons(axis: Axis) -> Option<(GamepadButton, GamepadButton)> {
    match axis {
        Axis::LeftStickX => Some((GamepadButton::LeftStickRight, GamepadButton::LeftStickLeft)),
        Axis::LeftStickY => Some((GamepadButton::LeftStickUp, GamepadButton::LeftStickDown)),
        Axis::RightStickX => Some((GamepadButton::RightStickRight, GamepadButton::RightStickLeft)),
        Axis::RightStickY => Some((GamepadButton::RightStickUp, GamepadButton::RightStickDown)),
        Axis::Unknown => Some((GamepadButton::Unknown, GamepadButton::Unknown)),
        Axis::DPadX | Axis::DPadY | Axis::LeftZ | Axis::RightZ => None,
    }
}
