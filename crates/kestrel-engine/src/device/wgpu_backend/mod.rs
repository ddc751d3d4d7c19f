//! wgpu backend.
//!
//! Handle mapping:
//! - display: `wgpu::Instance`
//! - surface: `wgpu::Surface<'static>` over the shared window
//! - configuration: adapter, surface format, sample count
//! - context: `wgpu::Device` + `wgpu::Queue`, with limits chosen by the
//!   negotiated version (3.x full WebGPU limits, 2.x WebGL2 downlevel limits)
//!
//! wgpu devices are not bound to threads, so `make_current` and
//! `release_current` only track ownership for diagnostics.
//!
//! Commands are recorded into one encoder per frame; each clear or draw is its
//! own render pass. `Present` submits the encoder and presents the surface
//! texture. Clears ignore the scissor rectangle.
//!
//! Uncaptured device errors are collected instead of panicking and fail the
//! `execute`, `present` or `resize` call that was running when they arrived.

mod errors;
mod frame;
mod pipeline;
mod resources;
mod surface;

use std::sync::Arc;

use crate::command::{BlendMode, Command, CullMode, DrawCall, ResourceId, TextureId};
use crate::config::RenderSettings;
use crate::coords::{Color, Rect, Size2};
use crate::device::caps::clamp_sample_count;
use crate::device::{
    ApiVersion, BackendError, Capabilities, GraphicsBackend, NativeWindow, PresentError,
};

use errors::DeviceErrors;
use frame::{Attachments, Frame, FrameTarget, DEPTH_FORMAT};
use pipeline::{PipelineKey, PipelineTarget};
use resources::Resources;
use surface::{choose_alpha_mode, choose_present_mode, choose_surface_format, handle_surface_error};

fn no_context() -> BackendError {
    BackendError::Failed("no context".to_string())
}

fn not_acquired(handle: &str) -> BackendError {
    BackendError::Failed(format!("{handle} was never acquired"))
}

/// Fixed-function state set by commands and read by draws.
#[derive(Debug, Default)]
struct DrawState {
    viewport: Option<Rect>,
    scissor: Option<Rect>,
    blend: BlendMode,
    cull: CullMode,
    texture: Option<TextureId>,
}

/// Everything that exists once a context has been created.
struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    capabilities: Capabilities,
    attachments: Attachments,
    resources: Resources,
    state: DrawState,
    frame: Option<Frame>,
    errors: DeviceErrors,
}

impl Gpu {
    /// Acquires the surface texture for the current frame if not done yet.
    fn acquire(&mut self, surface: &wgpu::Surface, size: Size2) -> Result<(), BackendError> {
        if size.is_empty() {
            return Err(BackendError::FrameSkipped("zero-size surface".to_string()));
        }

        let device = &self.device;
        let frame = self.frame.get_or_insert_with(|| Frame::new(device));
        if frame.target.is_some() {
            return Ok(());
        }

        match surface.get_current_texture() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                frame.target = Some(FrameTarget {
                    surface_texture,
                    view,
                });
                Ok(())
            }
            Err(e) => Err(handle_surface_error(surface, device, &self.config, size, e)),
        }
    }

    fn clear(
        &mut self,
        surface: &wgpu::Surface,
        size: Size2,
        color: Option<Color>,
        depth: Option<f32>,
    ) -> Result<(), BackendError> {
        self.acquire(surface, size)?;
        let Some(Frame {
            encoder,
            target: Some(target),
        }) = self.frame.as_mut()
        else {
            return Err(BackendError::Failed("frame target missing".to_string()));
        };

        let (view, resolve_target) = self.attachments.color_views(&target.view);
        let load = match color {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kestrel clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: self.attachments.depth.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn draw(&mut self, surface: &wgpu::Surface, size: Size2, call: DrawCall) -> Result<(), BackendError> {
        let key = PipelineKey {
            shader: call.shader,
            blend: self.state.blend,
            cull: self.state.cull,
            topology: call.topology,
        };
        let target = PipelineTarget {
            format: self.config.format,
            sample_count: self.capabilities.sample_count,
            depth: self.attachments.depth.is_some(),
        };
        self.resources
            .prepare_draw(&self.device, &call, key, target, self.state.texture)?;

        let full = Rect::from_size(size);
        let Some(viewport) = self.state.viewport.map_or(Some(full), |v| v.intersect(full)) else {
            log::trace!("wgpu: draw outside the surface skipped");
            return Ok(());
        };
        let scissor = match self.state.scissor.map(|r| r.clamp_to(size)) {
            Some(None) => {
                log::trace!("wgpu: fully scissored draw skipped");
                return Ok(());
            }
            Some(bounds) => bounds,
            None => None,
        };

        self.acquire(surface, size)?;
        let Some(Frame {
            encoder,
            target: Some(target),
        }) = self.frame.as_mut()
        else {
            return Err(BackendError::Failed("frame target missing".to_string()));
        };

        let (view, resolve_target) = self.attachments.color_views(&target.view);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kestrel draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: self.attachments.depth.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_viewport(viewport.x, viewport.y, viewport.width, viewport.height, 0.0, 1.0);
        if let Some((x, y, w, h)) = scissor {
            pass.set_scissor_rect(x, y, w, h);
        }
        self.resources.record_draw(&mut pass, &call, key)
    }

    /// Submits recorded work without presenting; used when the surface changes under a frame.
    fn flush(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.queue.submit(std::iter::once(frame.encoder.finish()));
            if frame.target.is_some() {
                log::debug!("wgpu: frame in flight discarded");
            }
        }
    }
}

pub struct WgpuBackend {
    settings: RenderSettings,
    size: Size2,

    instance: Option<wgpu::Instance>,
    surface: Option<wgpu::Surface<'static>>,
    adapter: Option<wgpu::Adapter>,
    format: Option<wgpu::TextureFormat>,
    alpha_mode: wgpu::CompositeAlphaMode,
    present_modes: Vec<wgpu::PresentMode>,
    sample_count: u32,

    gpu: Option<Gpu>,
    owner: Option<String>,
}

impl WgpuBackend {
    pub fn new() -> Self {
        Self {
            settings: RenderSettings::default(),
            size: Size2::default(),
            instance: None,
            surface: None,
            adapter: None,
            format: None,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            present_modes: Vec::new(),
            sample_count: 1,
            gpu: None,
            owner: None,
        }
    }

    fn limits_for(version: ApiVersion, adapter: &wgpu::Adapter) -> Result<wgpu::Limits, BackendError> {
        match version.major {
            major if major >= 3 => {
                if !adapter.get_downlevel_capabilities().is_webgpu_compliant() {
                    return Err(BackendError::Unsupported("WebGPU-level contexts on this adapter"));
                }
                Ok(wgpu::Limits::default())
            }
            2 => Ok(wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())),
            _ => Err(BackendError::Unsupported("context versions below 2.0")),
        }
    }

    fn capabilities_for(&self, version: ApiVersion, adapter: &wgpu::Adapter, device: &wgpu::Device) -> Capabilities {
        let downlevel = adapter.get_downlevel_capabilities().flags;
        let max_anisotropy = if downlevel.contains(wgpu::DownlevelFlags::ANISOTROPIC_FILTERING) {
            self.settings.max_anisotropy.clamp(1, 16)
        } else {
            1
        };

        Capabilities {
            api_version: version,
            max_anisotropy,
            sample_count: self.sample_count,
            texture_filter: self.settings.texture_filter,
            depth: self.settings.depth,
            npot_textures: downlevel.contains(wgpu::DownlevelFlags::NON_POWER_OF_TWO_MIPMAPPED_TEXTURES),
            max_texture_size: device.limits().max_texture_dimension_2d,
        }
    }
}

impl Default for WgpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WgpuBackend {
    /// Surfaces errors the device reported while `result` was produced.
    fn check_device<E>(&self, result: Result<(), E>) -> Result<(), E>
    where
        E: From<BackendError> + std::fmt::Display,
    {
        match &self.gpu {
            Some(gpu) => gpu.errors.check(result),
            None => result,
        }
    }

    fn resize_surface(&mut self, size: Size2) -> Result<(), BackendError> {
        self.size = size;

        let (Some(surface), Some(gpu)) = (&self.surface, &mut self.gpu) else {
            return Ok(());
        };

        gpu.flush();
        if size.is_empty() {
            return Ok(());
        }

        gpu.config.width = size.width;
        gpu.config.height = size.height;
        surface.configure(&gpu.device, &gpu.config);

        gpu.attachments = Attachments::new(
            &gpu.device,
            size,
            gpu.config.format,
            gpu.capabilities.sample_count,
            gpu.capabilities.depth,
        );
        Ok(())
    }

    fn execute_command(&mut self, command: Command) -> Result<(), BackendError> {
        let Self {
            surface, gpu, size, ..
        } = self;
        let gpu = gpu.as_mut().ok_or_else(no_context)?;

        match command {
            Command::CreateBuffer { id, usage, data } => {
                gpu.resources.create_buffer(&gpu.device, id, usage, &data)
            }
            Command::UpdateBuffer { id, offset, data } => {
                let Gpu {
                    device,
                    resources,
                    frame,
                    ..
                } = gpu;
                let encoder = &mut frame.get_or_insert_with(|| Frame::new(device)).encoder;
                resources.update_buffer(device, encoder, id, offset, &data)
            }
            Command::CreateTexture { id, size, pixels } => gpu.resources.create_texture(
                &gpu.device,
                &gpu.queue,
                &gpu.capabilities,
                id,
                size,
                &pixels,
            ),
            Command::CreateShader { id, desc } => gpu.resources.create_shader(&gpu.device, id, desc),
            Command::SetShaderConstants { shader, block } => {
                gpu.resources.set_constants(&gpu.device, shader, &block)
            }
            Command::Delete(id) => {
                gpu.resources.delete(id)?;
                if let ResourceId::Texture(t) = id {
                    if gpu.state.texture == Some(t) {
                        gpu.state.texture = None;
                    }
                }
                Ok(())
            }
            Command::SetViewport(rect) => {
                gpu.state.viewport = Some(rect.normalized());
                Ok(())
            }
            Command::SetScissor(rect) => {
                gpu.state.scissor = rect.map(Rect::normalized);
                Ok(())
            }
            Command::SetBlendMode(mode) => {
                gpu.state.blend = mode;
                Ok(())
            }
            Command::SetCullMode(mode) => {
                gpu.state.cull = mode;
                Ok(())
            }
            Command::SetTexture(texture) => {
                if let Some(t) = texture {
                    if !gpu.resources.has_texture(t) {
                        return Err(BackendError::UnknownResource(ResourceId::Texture(t)));
                    }
                }
                gpu.state.texture = texture;
                Ok(())
            }
            Command::Clear { color, depth } => {
                let surface = surface.as_ref().ok_or_else(no_context)?;
                gpu.clear(surface, *size, color, depth)
            }
            Command::Draw(call) => {
                let surface = surface.as_ref().ok_or_else(no_context)?;
                gpu.draw(surface, *size, call)
            }
            Command::Present => Err(BackendError::InvalidCommand(
                "Present must go through present()".to_string(),
            )),
        }
    }

    fn present_frame(&mut self) -> Result<(), PresentError> {
        let gpu = self.gpu.as_mut().ok_or(PresentError::NoContext)?;

        let Some(frame) = gpu.frame.take() else {
            log::trace!("wgpu: present with nothing recorded");
            return Ok(());
        };

        gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        match frame.target {
            Some(target) => {
                drop(target.view);
                target.surface_texture.present();
            }
            None => log::trace!("wgpu: frame had no draws; nothing to present"),
        }
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn open_display(&mut self, settings: &RenderSettings) -> Result<(), BackendError> {
        self.settings = settings.clone();

        let flags = if settings.debug_renderer {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        };

        self.instance = Some(wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            ..Default::default()
        }));
        Ok(())
    }

    fn create_surface(
        &mut self,
        window: &Arc<dyn NativeWindow>,
        settings: &RenderSettings,
    ) -> Result<(), BackendError> {
        let instance = self.instance.as_ref().ok_or_else(no_context)?;

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| BackendError::Failed(format!("failed to create wgpu surface: {e}")))?;

        self.size = if settings.size.is_empty() {
            window.size()
        } else {
            settings.size
        };
        self.surface = Some(surface);
        Ok(())
    }

    fn choose_config(&mut self, settings: &RenderSettings) -> Result<(), BackendError> {
        let (Some(instance), Some(surface)) = (&self.instance, &self.surface) else {
            return Err(no_context());
        };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| BackendError::Failed(format!("failed to find a suitable GPU adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!("wgpu: adapter {} ({:?})", info.name, info.backend);

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats, settings.prefer_srgb)
            .ok_or(BackendError::Unsupported("any surface format"))?;

        let mut supported = adapter
            .get_texture_format_features(format)
            .flags
            .supported_sample_counts();
        if settings.depth {
            let depth = adapter
                .get_texture_format_features(DEPTH_FORMAT)
                .flags
                .supported_sample_counts();
            supported.retain(|n| depth.contains(n));
        }

        self.sample_count = clamp_sample_count(settings.sample_count, &supported);
        if self.sample_count != settings.sample_count {
            log::debug!(
                "wgpu: sample count {} clamped to {}",
                settings.sample_count,
                self.sample_count
            );
        }

        self.format = Some(format);
        self.alpha_mode = choose_alpha_mode(&caps.alpha_modes);
        self.present_modes = caps.present_modes;
        self.adapter = Some(adapter);
        Ok(())
    }

    fn create_context(
        &mut self,
        version: ApiVersion,
        settings: &RenderSettings,
    ) -> Result<(), BackendError> {
        let (Some(adapter), Some(surface), Some(format)) = (&self.adapter, &self.surface, self.format) else {
            return Err(no_context());
        };

        let required_limits = Self::limits_for(version, adapter)?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("kestrel device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| BackendError::Failed(format!("failed to create a {version} device: {e}")))?;

        let errors = DeviceErrors::default();
        errors.install(&device);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: self.size.width.max(1),
            height: self.size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: settings.desired_maximum_frame_latency,
        };
        if !self.size.is_empty() {
            surface.configure(&device, &config);
        }

        let capabilities = self.capabilities_for(version, adapter, &device);
        let attachments = Attachments::new(&device, self.size, format, self.sample_count, settings.depth);
        let resources = Resources::new(&device, &queue, &capabilities);

        self.gpu = Some(Gpu {
            device,
            queue,
            config,
            capabilities,
            attachments,
            resources,
            state: DrawState::default(),
            frame: None,
            errors,
        });
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        match &self.gpu {
            Some(gpu) => gpu.capabilities.clone(),
            None => Capabilities {
                api_version: ApiVersion::new(0, 0),
                max_anisotropy: 1,
                sample_count: self.sample_count,
                texture_filter: self.settings.texture_filter,
                depth: self.settings.depth,
                npot_textures: false,
                max_texture_size: 0,
            },
        }
    }

    fn set_vertical_sync(&mut self, enabled: bool) -> Result<(), BackendError> {
        let present_mode = choose_present_mode(&self.present_modes, enabled)
            .ok_or(BackendError::Unsupported("presenting without vertical sync"))?;

        let (Some(surface), Some(gpu)) = (&self.surface, &mut self.gpu) else {
            return Err(no_context());
        };

        gpu.config.present_mode = present_mode;
        if !self.size.is_empty() {
            surface.configure(&gpu.device, &gpu.config);
        }
        log::debug!("wgpu: present mode {present_mode:?}");
        Ok(())
    }

    fn make_current(&mut self) -> Result<(), BackendError> {
        let thread = std::thread::current().name().unwrap_or("<unnamed>").to_string();
        log::debug!("wgpu: context owned by thread `{thread}`");
        self.owner = Some(thread);
        Ok(())
    }

    fn release_current(&mut self) -> Result<(), BackendError> {
        self.owner = None;
        Ok(())
    }

    fn resize(&mut self, size: Size2) -> Result<(), BackendError> {
        let result = self.resize_surface(size);
        self.check_device(result)
    }

    fn execute(&mut self, command: Command) -> Result<(), BackendError> {
        let result = self.execute_command(command);
        self.check_device(result)
    }

    fn present(&mut self) -> Result<(), PresentError> {
        let result = self.present_frame();
        self.check_device(result)
    }

    fn release_surface(&mut self) -> Result<(), BackendError> {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.frame = None;
        }
        self.surface.take().map(drop).ok_or_else(|| not_acquired("surface"))
    }

    fn release_context(&mut self) -> Result<(), BackendError> {
        self.gpu.take().map(drop).ok_or_else(|| not_acquired("context"))
    }

    fn release_display(&mut self) -> Result<(), BackendError> {
        self.adapter = None;
        self.instance.take().map(drop).ok_or_else(|| not_acquired("display"))
    }
}
