use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::command::Command;
use crate::config::RenderSettings;
use crate::coords::Size2;

use super::caps::{ApiVersion, Capabilities};
use super::error::{BackendError, PresentError};
use super::window::NativeWindow;

/// Capability set a graphics backend implements.
///
/// `RenderDevice::init` drives the acquisition methods in declaration order on
/// the initialising thread, then moves the backend to the render thread. From
/// then on every method is called from that thread only.
///
/// Release methods are called only for handles whose acquisition succeeded,
/// in the order surface, context, display.
pub trait GraphicsBackend: Send + 'static {
    fn name(&self) -> &'static str;

    fn open_display(&mut self, settings: &RenderSettings) -> Result<(), BackendError>;

    fn create_surface(
        &mut self,
        window: &Arc<dyn NativeWindow>,
        settings: &RenderSettings,
    ) -> Result<(), BackendError>;

    /// Picks the frame-buffer configuration (format, samples) for the surface.
    fn choose_config(&mut self, settings: &RenderSettings) -> Result<(), BackendError>;

    /// Tries to create a context of exactly `version`.
    ///
    /// Called once per negotiation candidate; a failed attempt must leave no
    /// context behind.
    fn create_context(
        &mut self,
        version: ApiVersion,
        settings: &RenderSettings,
    ) -> Result<(), BackendError>;

    /// Only meaningful after `create_context` succeeded.
    fn capabilities(&self) -> Capabilities;

    /// Best-effort; the device logs failures and carries on.
    fn set_vertical_sync(&mut self, enabled: bool) -> Result<(), BackendError>;

    /// Binds the context to the calling thread.
    fn make_current(&mut self) -> Result<(), BackendError>;

    /// Unbinds the context from the calling thread.
    fn release_current(&mut self) -> Result<(), BackendError>;

    fn resize(&mut self, size: Size2) -> Result<(), BackendError>;

    /// Executes one command. `Command::Present` is routed to [`present`](Self::present)
    /// by the render thread and never reaches this method.
    fn execute(&mut self, command: Command) -> Result<(), BackendError>;

    fn present(&mut self) -> Result<(), PresentError>;

    fn release_surface(&mut self) -> Result<(), BackendError>;
    fn release_context(&mut self) -> Result<(), BackendError>;
    fn release_display(&mut self) -> Result<(), BackendError>;
}

/// Backend selected at startup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BackendKind {
    #[cfg(feature = "wgpu-backend")]
    Wgpu,
    Null,
}

impl Default for BackendKind {
    fn default() -> Self {
        #[cfg(feature = "wgpu-backend")]
        {
            BackendKind::Wgpu
        }
        #[cfg(not(feature = "wgpu-backend"))]
        {
            BackendKind::Null
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            #[cfg(feature = "wgpu-backend")]
            BackendKind::Wgpu => "wgpu",
            BackendKind::Null => "null",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown or disabled backend `{0}`")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            #[cfg(feature = "wgpu-backend")]
            "wgpu" => Ok(BackendKind::Wgpu),
            "null" => Ok(BackendKind::Null),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Handles successfully acquired during init.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct Acquired {
    pub display: bool,
    pub surface: bool,
    pub context: bool,
}

/// Releases acquired handles, surface first and display last.
///
/// Failures are logged; every acquired handle is attempted.
pub(crate) fn release_handles<B: GraphicsBackend>(backend: &mut B, acquired: Acquired) {
    let name = backend.name();

    if acquired.surface {
        if let Err(e) = backend.release_surface() {
            log::error!("{name}: failed to release surface: {e}");
        }
    }
    if acquired.context {
        if let Err(e) = backend.release_context() {
            log::error!("{name}: failed to release context: {e}");
        }
    }
    if acquired.display {
        if let Err(e) = backend.release_display() {
            log::error!("{name}: failed to release display: {e}");
        }
    }

    log::debug!("{name}: handles released");
}
