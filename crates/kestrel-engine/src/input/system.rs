/// Requests the manager forwards to platform input systems.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SystemCommand {
    StartDeviceDiscovery,
    StopDeviceDiscovery,
    ShowVirtualKeyboard,
    HideVirtualKeyboard,
    SetCursorVisible(bool),
    SetCursorLocked(bool),
}

/// A platform source of input events.
///
/// Systems receive an `EventSender` when they are built and push
/// `PlatformEvent`s through it from whatever thread they run on.
/// `execute` is called on the main thread; commands a system does not
/// support are ignored.
pub trait InputSystem: Send {
    fn name(&self) -> &'static str;
    fn execute(&mut self, command: SystemCommand);
}
