use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::command::CommandBuffer;
use crate::config::RenderSettings;
use crate::coords::Size2;
use crate::core::spawn_owning;

use super::backend::{release_handles, Acquired, BackendKind, GraphicsBackend};
use super::caps::Capabilities;
use super::error::{BackendError, ContextCreationError, InitStage, SubmitError};
use super::negotiate::negotiate_version;
use super::null::NullBackend;
use super::window::NativeWindow;
use super::worker::{render_thread, Submission};

/// Lifecycle of the render thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RenderState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Joined = 3,
}

impl RenderState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RenderState::Created,
            1 => RenderState::Running,
            2 => RenderState::Stopping,
            _ => RenderState::Joined,
        }
    }
}

/// State shared between the device handle and its render thread.
#[derive(Debug)]
pub(crate) struct DeviceShared {
    state: AtomicU8,
    running: AtomicBool,
    pending_resize: Mutex<Option<Size2>>,
}

impl DeviceShared {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(RenderState::Created as u8),
            running: AtomicBool::new(false),
            pending_resize: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> RenderState {
        RenderState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: RenderState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Latest request wins.
    pub(crate) fn request_resize(&self, size: Size2) {
        *self.pending_resize.lock() = Some(size);
    }

    pub(crate) fn take_resize(&self) -> Option<Size2> {
        self.pending_resize.lock().take()
    }
}

/// Main-thread handle to a render thread and the backend it owns.
///
/// Created by [`RenderDevice::init`] (or [`RenderDevice::create`] for startup
/// selection). Dropping the handle stops the thread: buffers submitted before
/// the drop still execute in order, then the context is unbound and every
/// acquired handle is released.
pub struct RenderDevice {
    backend_name: &'static str,
    capabilities: Capabilities,
    window: Arc<dyn NativeWindow>,
    shared: Arc<DeviceShared>,
    sender: Option<mpsc::Sender<Submission>>,
    thread: Option<JoinHandle<()>>,
}

impl RenderDevice {
    /// Brings up `backend` for `window` and starts the render thread.
    ///
    /// Acquisition order is display, surface, configuration, context. The
    /// context version is negotiated over `settings.api_versions`. On any
    /// failure the handles acquired so far are released before returning.
    pub fn init<B: GraphicsBackend>(
        mut backend: B,
        window: Arc<dyn NativeWindow>,
        settings: &RenderSettings,
    ) -> Result<Self, ContextCreationError> {
        let backend_name = backend.name();
        log::debug!("{backend_name}: initialising render device");

        let mut acquired = Acquired::default();
        let capabilities = match bring_up(&mut backend, &window, settings, &mut acquired) {
            Ok(caps) => caps,
            Err(e) => {
                release_handles(&mut backend, acquired);
                return Err(e);
            }
        };

        log::info!(
            "{backend_name}: context {} ({} sample(s), anisotropy {}, max texture {})",
            capabilities.api_version,
            capabilities.sample_count,
            capabilities.max_anisotropy,
            capabilities.max_texture_size,
        );

        let shared = Arc::new(DeviceShared::new());
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread_shared = shared.clone();
        let thread = spawn_owning(
            "render",
            (backend, acquired),
            move |(backend, acquired)| render_thread(backend, acquired, receiver, thread_shared, ready_tx),
            |(mut backend, acquired)| release_handles(&mut backend, acquired),
        )
        .map_err(ContextCreationError::ThreadSpawn)?;

        let bound = ready_rx.recv().unwrap_or_else(|_| {
            Err(BackendError::Failed(
                "render thread exited before binding the context".to_string(),
            ))
        });

        if let Err(e) = bound {
            if thread.join().is_err() {
                log::error!("{backend_name}: render thread panicked during startup");
            }
            shared.set_state(RenderState::Joined);
            return Err(ContextCreationError::MakeCurrent(e));
        }

        Ok(Self {
            backend_name,
            capabilities,
            window,
            shared,
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    /// Startup backend registry.
    pub fn create(
        kind: BackendKind,
        window: Arc<dyn NativeWindow>,
        settings: &RenderSettings,
    ) -> Result<Self, ContextCreationError> {
        match kind {
            #[cfg(feature = "wgpu-backend")]
            BackendKind::Wgpu => Self::init(super::wgpu_backend::WgpuBackend::new(), window, settings),
            BackendKind::Null => Self::init(NullBackend::new(), window, settings),
        }
    }

    /// Hands `buffer` to the render thread. Never blocks.
    ///
    /// Fails once the device is stopping or the render thread is gone; the
    /// buffer is returned inside the error.
    pub fn submit(&self, buffer: CommandBuffer) -> Result<(), SubmitError> {
        if !self.shared.is_running() {
            return Err(SubmitError::Stopped(buffer));
        }

        let Some(sender) = &self.sender else {
            return Err(SubmitError::Stopped(buffer));
        };

        sender
            .send(Submission::Commands(buffer))
            .map_err(|e| match e.0 {
                Submission::Commands(buffer) => SubmitError::Stopped(buffer),
                Submission::Stop => SubmitError::Stopped(CommandBuffer::new()),
            })
    }

    /// Requests a drawable resize. Applied by the render thread before the
    /// next buffer; repeated requests coalesce.
    pub fn resize(&self, size: Size2) {
        self.shared.request_resize(size);
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Display modes reported by the window; empty when unsupported.
    pub fn supported_resolutions(&self) -> Vec<Size2> {
        self.window.supported_resolutions()
    }

    pub fn state(&self) -> RenderState {
        self.shared.state()
    }

    /// False once stopped, or once the render thread has exited on its own.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Stops and joins the render thread. Idempotent; also run on drop.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.shared.set_running(false);
        self.shared.set_state(RenderState::Stopping);

        if let Some(sender) = self.sender.take() {
            // A dead receiver means the thread already left its loop.
            let _ = sender.send(Submission::Stop);
        }

        if thread.join().is_err() {
            log::error!("{}: render thread panicked", self.backend_name);
        }

        self.shared.set_state(RenderState::Joined);
        log::debug!("{}: render thread joined", self.backend_name);
    }
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bring_up<B: GraphicsBackend>(
    backend: &mut B,
    window: &Arc<dyn NativeWindow>,
    settings: &RenderSettings,
    acquired: &mut Acquired,
) -> Result<Capabilities, ContextCreationError> {
    backend
        .open_display(settings)
        .map_err(ContextCreationError::stage(InitStage::Display))?;
    acquired.display = true;

    backend
        .create_surface(window, settings)
        .map_err(ContextCreationError::stage(InitStage::Surface))?;
    acquired.surface = true;

    backend
        .choose_config(settings)
        .map_err(ContextCreationError::stage(InitStage::Config))?;

    negotiate_version(&settings.api_versions, |version| {
        backend.create_context(version, settings)
    })?;
    acquired.context = true;

    if let Err(e) = backend.set_vertical_sync(settings.vertical_sync) {
        log::warn!("{}: vertical sync unavailable: {e}", backend.name());
    }

    // The render thread binds the context itself.
    backend
        .release_current()
        .map_err(ContextCreationError::MakeCurrent)?;

    Ok(backend.capabilities())
}
