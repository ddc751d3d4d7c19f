use anyhow::Result;

use kestrel_engine::audio::{SoftwareSink, StreamFormat, StreamingDevice, ToneSource};
use kestrel_engine::command::{BlendMode, BufferId, BufferUsage, Command, CommandBuffer, DrawCall, ResourceIds};
use kestrel_engine::config::{AudioSettings, EngineConfig};
use kestrel_engine::coords::{Color, Rect};
use kestrel_engine::core::{App, AppControl, FrameCtx, StartCtx};
use kestrel_engine::input::{InputEvent, Key};
use kestrel_engine::shader::{ConstantDecl, ConstantId, ConstantKind, ConstantValue, Shader, ShaderDesc, VertexFormat};
use kestrel_engine::window::Runtime;

const TRIANGLE_WGSL: &str = r#"
struct Constants {
    tint: vec4<f32>,
    angle: f32,
};

@group(0) @binding(0) var<uniform> constants: Constants;

struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOut {
    let c = cos(constants.angle);
    let s = sin(constants.angle);
    var out: VertexOut;
    out.position = vec4<f32>(position.x * c - position.y * s, position.x * s + position.y * c, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0) * constants.tint;
}
"#;

#[rustfmt::skip]
const TRIANGLE: [f32; 15] = [
     0.0,  0.6,   1.0, 0.3, 0.2,
    -0.6, -0.5,   0.2, 1.0, 0.3,
     0.6, -0.5,   0.2, 0.4, 1.0,
];

struct Triangle {
    shader: Shader,
    vertices: BufferId,
    tint: ConstantId,
    angle: ConstantId,
}

#[derive(Default)]
struct Demo {
    ids: ResourceIds,
    triangle: Option<Triangle>,
    audio: Option<StreamingDevice>,
    audio_settings: AudioSettings,
    paused: bool,
    fullscreen: bool,
    toggle_fullscreen: bool,
    quit: bool,
    elapsed: f32,
}

impl Demo {
    fn new(config: &EngineConfig) -> Self {
        Self {
            audio_settings: config.audio.clone(),
            fullscreen: config.window.fullscreen,
            ..Self::default()
        }
    }

    fn start_audio(&mut self) {
        let format = match StreamFormat::from_settings(&self.audio_settings) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("audio disabled: {e}");
                return;
            }
        };

        let tone = ToneSource::new(&format, 220.0, 0.2);
        match StreamingDevice::start(SoftwareSink::new(), tone, &self.audio_settings) {
            Ok(stream) => self.audio = Some(stream),
            Err(e) => log::warn!("audio disabled: {e}"),
        }
    }

    fn frame(&self, triangle: &Triangle, ctx: &FrameCtx<'_>) -> CommandBuffer {
        let size = ctx.window_size;
        let mut buffer = CommandBuffer::with_capacity(6);
        buffer
            .viewport(Rect::new(0.0, 0.0, size.width as f32, size.height as f32))
            .clear(Color::rgb(0.05, 0.06, 0.09));

        let mut constants = triangle.shader.constants();
        let filled = constants
            .set(triangle.tint, ConstantValue::Vec4(&[[1.0, 1.0, 1.0, 1.0]]))
            .and_then(|b| b.set(triangle.angle, ConstantValue::Float(&[self.elapsed])))
            .map(|_| ());
        match filled {
            Ok(()) => {
                buffer
                    .push(triangle.shader.bind_constants(constants))
                    .draw(DrawCall::new(triangle.shader.id(), triangle.vertices, 3));
            }
            Err(e) => log::error!("demo: {e}"),
        }

        buffer.present();
        buffer
    }
}

impl App for Demo {
    fn on_start(&mut self, ctx: &mut StartCtx<'_>) {
        log::info!(
            "demo: {} backend, context {}, window {}",
            ctx.device.backend_name(),
            ctx.device.capabilities().api_version,
            ctx.window_size
        );

        let desc = ShaderDesc::wgsl("triangle", TRIANGLE_WGSL)
            .with_vertex_layout(vec![VertexFormat::Float32x2, VertexFormat::Float32x3])
            .with_constants(vec![
                ConstantDecl::new("tint", ConstantKind::Vec4),
                ConstantDecl::new("angle", ConstantKind::Float),
            ]);
        let (shader, create_shader) = Shader::create(&mut self.ids, desc);
        let vertices = self.ids.buffer();

        let (Some(tint), Some(angle)) = (shader.constant_id("tint"), shader.constant_id("angle")) else {
            log::error!("demo: triangle shader lost its constants");
            ctx.runtime.exit();
            return;
        };

        let mut setup = CommandBuffer::new();
        setup
            .push(create_shader)
            .push(Command::CreateBuffer {
                id: vertices,
                usage: BufferUsage::Vertex,
                data: vertex_bytes(&TRIANGLE),
            })
            .push(Command::SetBlendMode(BlendMode::Alpha));

        if ctx.device.submit(setup).is_err() {
            log::error!("demo: render device stopped during startup");
            ctx.runtime.exit();
            return;
        }

        self.triangle = Some(Triangle {
            shader,
            vertices,
            tint,
            angle,
        });
        self.start_audio();
    }

    fn on_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::KeyPress { key: Key::Escape, .. } => {
                self.quit = true;
                true
            }
            InputEvent::KeyPress { key: Key::Space, repeat: false, .. } => {
                self.paused = !self.paused;
                true
            }
            InputEvent::KeyPress { key: Key::F, repeat: false, .. } => {
                self.toggle_fullscreen = true;
                true
            }
            InputEvent::DeviceConnected { device, kind } => {
                log::info!("demo: {kind} {device} connected");
                false
            }
            _ => false,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        if self.quit {
            return AppControl::Exit;
        }
        if std::mem::take(&mut self.toggle_fullscreen) {
            self.fullscreen = !self.fullscreen;
            ctx.runtime.set_fullscreen(self.fullscreen);
        }
        if !self.paused {
            self.elapsed += ctx.time.dt;
        }

        if let Some(triangle) = &self.triangle {
            let buffer = self.frame(triangle, ctx);
            ctx.submit(buffer);
        }
        AppControl::Continue
    }

    fn on_exit(&mut self) {
        if let Some(mut stream) = self.audio.take() {
            stream.stop();
            log::info!(
                "demo: audio streamed {} buffer(s), {} underrun(s)",
                stream.buffers_streamed(),
                stream.underruns()
            );
        }
    }
}

fn vertex_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn main() -> Result<()> {
    let config = EngineConfig::default().with_env_overrides();
    let demo = Demo::new(&config);
    Runtime::run(config, demo)
}
