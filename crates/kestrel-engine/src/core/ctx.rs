use crate::command::CommandBuffer;
use crate::coords::Size2;
use crate::device::{RenderDevice, SubmitError};
use crate::input::InputManager;

use super::clock::FrameTime;

/// Requests buffered during a callback and applied by the runtime afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RuntimeCommand {
    Exit,
    SetFullscreen(bool),
    SetCursorVisible(bool),
    SetCursorLocked(bool),
    StartDeviceDiscovery,
    StopDeviceDiscovery,
}

/// Runtime requests an application can make from any callback.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    commands: Vec<RuntimeCommand>,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.commands.push(RuntimeCommand::Exit);
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.commands.push(RuntimeCommand::SetFullscreen(fullscreen));
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.commands.push(RuntimeCommand::SetCursorVisible(visible));
    }

    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.commands.push(RuntimeCommand::SetCursorLocked(locked));
    }

    pub fn start_device_discovery(&mut self) {
        self.commands.push(RuntimeCommand::StartDeviceDiscovery);
    }

    pub fn stop_device_discovery(&mut self) {
        self.commands.push(RuntimeCommand::StopDeviceDiscovery);
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, RuntimeCommand> {
        self.commands.drain(..)
    }
}

/// Context passed to `App::on_start`.
pub struct StartCtx<'a> {
    pub device: &'a RenderDevice,
    pub input: &'a InputManager,
    pub window_size: Size2,
    pub runtime: &'a mut RuntimeCtx,
}

/// Per-frame context passed to `App::on_frame`.
pub struct FrameCtx<'a> {
    pub device: &'a RenderDevice,
    pub input: &'a InputManager,
    pub time: FrameTime,
    pub window_size: Size2,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_> {
    /// Submits `buffer`, asking the runtime to exit if the device has stopped.
    pub fn submit(&mut self, buffer: CommandBuffer) {
        if let Err(SubmitError::Stopped(dropped)) = self.device.submit(buffer) {
            log::error!(
                "render device stopped; {} command(s) dropped, exiting",
                dropped.len()
            );
            self.runtime.exit();
        }
    }
}
