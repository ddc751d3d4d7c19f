use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::config::EngineConfig;
use crate::coords::Size2;
use crate::core::{App, AppControl, AppListener, FrameClock, FrameCtx, RuntimeCommand, RuntimeCtx, StartCtx};
use crate::device::{NativeWindow, RenderDevice};
use crate::input::InputManager;
use crate::input::platform::{GamepadSystem, WinitInput};
use crate::logging::init_logging;

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Runs `app` until it exits or its window is closed.
    ///
    /// Initialises logging from `config.logging` (no-op if already done).
    pub fn run<A>(config: EngineConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        init_logging(config.logging.clone());

        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Field order matters: the device (and its render thread) is dropped before
/// the window it renders into.
struct WindowEntry {
    device: RenderDevice,
    window: Arc<Window>,
    clock: FrameClock,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: EngineConfig,
    app: A,

    input: InputManager,
    winit_input: WinitInput,

    entry: Option<WindowEntry>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: EngineConfig, app: A) -> Self {
        let input = InputManager::new();
        let winit_input = WinitInput::new(input.sender());
        Self {
            config,
            app,
            input,
            winit_input,
            entry: None,
            exit_requested: false,
            error: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error.get_or_insert(error);
        self.request_exit();
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.config.window;
        let mut attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(window_config.initial_size);
        if window_config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let mut settings = self.config.render.clone();
        if settings.size.is_empty() {
            settings.size = window.inner_size().into();
        }

        let native: Arc<dyn NativeWindow> = window.clone();
        let device = RenderDevice::create(self.config.backend, native, &settings)
            .with_context(|| format!("failed to create the {} render device", self.config.backend))?;

        self.input
            .add_system(Box::new(self.winit_input.cursor_system(window.clone())));
        self.winit_input.connect_devices();

        if self.config.gamepads {
            match GamepadSystem::start(self.input.sender()) {
                Ok(system) => self.input.add_system(Box::new(system)),
                Err(e) => log::warn!("gamepad support disabled: {e}"),
            }
        }

        let mut runtime = RuntimeCtx::default();
        self.app.on_start(&mut StartCtx {
            device: &device,
            input: &self.input,
            window_size: window.inner_size().into(),
            runtime: &mut runtime,
        });

        self.entry = Some(WindowEntry {
            device,
            window,
            clock: FrameClock::new(),
        });
        self.apply_commands(event_loop, runtime);
        Ok(())
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut ctx: RuntimeCtx) {
        for command in ctx.drain() {
            match command {
                RuntimeCommand::Exit => self.exit_requested = true,
                RuntimeCommand::SetFullscreen(on) => {
                    if let Some(entry) = &self.entry {
                        entry
                            .window
                            .set_fullscreen(on.then_some(Fullscreen::Borderless(None)));
                    }
                }
                RuntimeCommand::SetCursorVisible(visible) => self.input.set_cursor_visible(visible),
                RuntimeCommand::SetCursorLocked(locked) => self.input.set_cursor_locked(locked),
                RuntimeCommand::StartDeviceDiscovery => self.input.start_device_discovery(),
                RuntimeCommand::StopDeviceDiscovery => self.input.stop_device_discovery(),
            }
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.input.update(&mut AppListener(&mut self.app));

        let stopped = match &self.entry {
            Some(entry) if !entry.device.is_running() => Some(entry.device.backend_name()),
            _ => None,
        };
        if let Some(backend) = stopped {
            self.fail(event_loop, anyhow::anyhow!("render device `{backend}` stopped"));
            return;
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let mut runtime = RuntimeCtx::default();
        let control = self.app.on_frame(&mut FrameCtx {
            device: &entry.device,
            input: &self.input,
            time: entry.clock.tick(),
            window_size: entry.window.inner_size().into(),
            runtime: &mut runtime,
        });

        if control == AppControl::Exit {
            runtime.exit();
        }
        self.apply_commands(event_loop, runtime);
    }

    fn shutdown(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.app.on_exit();
            drop(entry);
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e.context("engine startup failed"));
            return;
        }

        if let Some(entry) = &self.entry {
            entry.window.request_redraw();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(entry) = &self.entry {
            entry.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if self.entry.as_ref().map(|e| e.window.id()) != Some(window_id) {
            return;
        }

        self.winit_input.handle_window_event(&event);

        match &event {
            WindowEvent::CloseRequested => {
                self.request_exit();
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = &self.entry {
                    entry.device.resize(Size2::from(*new_size));
                    entry.window.request_redraw();
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = &self.entry {
                    entry.device.resize(entry.window.inner_size().into());
                    entry.window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.winit_input.handle_device_event(&event);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
