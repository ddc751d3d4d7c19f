use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WindowHandle,
};

use crate::coords::Size2;

/// What the render core needs from the platform window.
///
/// Resize and fullscreen notifications are delivered to the device through
/// `RenderDevice::resize`; implementors never call into the device.
pub trait NativeWindow: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static {
    /// Drawable size in physical pixels.
    fn size(&self) -> Size2;

    fn scale_factor(&self) -> f64 {
        1.0
    }

    /// Display modes of the monitor hosting the window. Empty when the
    /// platform cannot enumerate them.
    fn supported_resolutions(&self) -> Vec<Size2> {
        Vec::new()
    }

    /// Raw native handles, when the platform exposes them.
    fn raw_handles(&self) -> Option<(RawWindowHandle, RawDisplayHandle)> {
        let window = self.window_handle().ok()?.as_raw();
        let display = self.display_handle().ok()?.as_raw();
        Some((window, display))
    }
}

impl NativeWindow for winit::window::Window {
    fn size(&self) -> Size2 {
        self.inner_size().into()
    }

    fn scale_factor(&self) -> f64 {
        winit::window::Window::scale_factor(self)
    }

    fn supported_resolutions(&self) -> Vec<Size2> {
        let Some(monitor) = self.current_monitor() else {
            return Vec::new();
        };

        let mut modes: Vec<Size2> = monitor.video_modes().map(|m| m.size().into()).collect();
        modes.sort_unstable_by_key(|s| (s.width, s.height));
        modes.dedup();
        modes
    }
}

/// Window stand-in without native handles, for the null backend and tests.
#[derive(Debug, Clone, Default)]
pub struct HeadlessWindow {
    pub size: Size2,
    pub resolutions: Vec<Size2>,
}

impl HeadlessWindow {
    pub fn new(size: Size2) -> Self {
        Self {
            size,
            resolutions: Vec::new(),
        }
    }

    pub fn with_resolutions(mut self, resolutions: Vec<Size2>) -> Self {
        self.resolutions = resolutions;
        self
    }
}

impl HasWindowHandle for HeadlessWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for HeadlessWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl NativeWindow for HeadlessWindow {
    fn size(&self) -> Size2 {
        self.size
    }

    fn supported_resolutions(&self) -> Vec<Size2> {
        self.resolutions.clone()
    }
}
