//! Backend without a GPU.
//!
//! Validates commands against the resources it has seen created, so the
//! recoverable error path behaves like a real backend, and records every call
//! in a [`NullJournal`]. Faults can be injected at each init stage and per command.

mod journal;

pub use journal::{Handle, JournalEntry, NullJournal};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::command::{BufferId, Command, ResourceId, ShaderId, TextureId};
use crate::config::RenderSettings;
use crate::coords::Size2;
use crate::device::{
    ApiVersion, BackendError, Capabilities, GraphicsBackend, InitStage, NativeWindow, PresentError,
};
use crate::shader::ConstantLayout;

const SUPPORTED_SAMPLE_COUNTS: [u32; 4] = [1, 2, 4, 8];
const MAX_ANISOTROPY: u16 = 16;
const MAX_TEXTURE_SIZE: u32 = 8192;

/// Failures to inject into a [`NullBackend`].
#[derive(Debug, Clone, Default)]
pub struct NullFaults {
    pub fail_stage: Option<InitStage>,
    pub rejected_versions: Vec<ApiVersion>,
    pub fail_vertical_sync: bool,
    pub fail_make_current: bool,
    pub fail_present: bool,
    /// Name of a command whose execution panics.
    pub panic_on: Option<&'static str>,
}

pub struct NullBackend {
    journal: NullJournal,
    faults: NullFaults,
    settings: RenderSettings,

    display: bool,
    surface: bool,
    context: Option<ApiVersion>,
    current: bool,
    size: Size2,

    buffers: HashMap<BufferId, usize>,
    shaders: HashMap<ShaderId, usize>,
    textures: HashSet<TextureId>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            journal: NullJournal::default(),
            faults: NullFaults::default(),
            settings: RenderSettings::default(),
            display: false,
            surface: false,
            context: None,
            current: false,
            size: Size2::default(),
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            textures: HashSet::new(),
        }
    }

    pub fn with_faults(mut self, faults: NullFaults) -> Self {
        self.faults = faults;
        self
    }

    pub fn fail_present(mut self, fail: bool) -> Self {
        self.faults.fail_present = fail;
        self
    }

    /// Handle on the shared journal; stays valid after the backend moves.
    pub fn journal(&self) -> NullJournal {
        self.journal.clone()
    }

    fn injected(&self, stage: InitStage) -> Result<(), BackendError> {
        if self.faults.fail_stage == Some(stage) {
            return Err(BackendError::Failed(format!("injected failure: {stage}")));
        }
        Ok(())
    }

    fn check_buffer(&self, id: BufferId) -> Result<usize, BackendError> {
        self.buffers
            .get(&id)
            .copied()
            .ok_or(BackendError::UnknownResource(ResourceId::Buffer(id)))
    }

    fn check_shader(&self, id: ShaderId) -> Result<usize, BackendError> {
        self.shaders
            .get(&id)
            .copied()
            .ok_or(BackendError::UnknownResource(ResourceId::Shader(id)))
    }

    fn check_texture(&self, id: TextureId) -> Result<(), BackendError> {
        if self.textures.contains(&id) {
            Ok(())
        } else {
            Err(BackendError::UnknownResource(ResourceId::Texture(id)))
        }
    }

    fn apply(&mut self, command: &Command) -> Result<(), BackendError> {
        match command {
            Command::CreateBuffer { id, data, .. } => {
                if data.is_empty() {
                    return Err(BackendError::InvalidCommand("empty buffer".to_string()));
                }
                self.buffers.insert(*id, data.len());
            }
            Command::UpdateBuffer { id, offset, data } => {
                let len = self.check_buffer(*id)?;
                let end = *offset as usize + data.len();
                if end > len {
                    return Err(BackendError::InvalidCommand(format!(
                        "update of {} bytes at {offset} overflows a {len}-byte buffer",
                        data.len()
                    )));
                }
            }
            Command::CreateTexture { id, size, pixels } => {
                if size.is_empty() || size.width > MAX_TEXTURE_SIZE || size.height > MAX_TEXTURE_SIZE {
                    return Err(BackendError::InvalidCommand(format!("texture size {size}")));
                }
                if pixels.len() as u64 != size.area() * 4 {
                    return Err(BackendError::InvalidCommand(format!(
                        "{} bytes of pixels for a {size} RGBA8 texture",
                        pixels.len()
                    )));
                }
                self.textures.insert(*id);
            }
            Command::CreateShader { id, desc } => {
                let layout = ConstantLayout::new(&desc.constants);
                self.shaders.insert(*id, layout.size());
            }
            Command::SetShaderConstants { shader, block } => {
                let size = self.check_shader(*shader)?;
                if block.bytes().len() != size {
                    return Err(BackendError::InvalidCommand(format!(
                        "constant block of {} bytes for a {size}-byte layout",
                        block.bytes().len()
                    )));
                }
            }
            Command::Delete(id) => {
                let known = match id {
                    ResourceId::Buffer(b) => self.buffers.remove(b).is_some(),
                    ResourceId::Shader(s) => self.shaders.remove(s).is_some(),
                    ResourceId::Texture(t) => self.textures.remove(t),
                };
                if !known {
                    return Err(BackendError::UnknownResource(*id));
                }
            }
            Command::SetTexture(Some(id)) => self.check_texture(*id)?,
            Command::Draw(call) => {
                self.check_shader(call.shader)?;
                self.check_buffer(call.vertex_buffer)?;
                if let Some(index) = call.index_buffer {
                    self.check_buffer(index.buffer)?;
                }
            }
            Command::SetViewport(_)
            | Command::SetScissor(_)
            | Command::SetBlendMode(_)
            | Command::SetCullMode(_)
            | Command::SetTexture(None)
            | Command::Clear { .. } => {}
            Command::Present => {
                return Err(BackendError::InvalidCommand(
                    "Present must go through present()".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn thread_name() -> Option<String> {
    std::thread::current().name().map(str::to_string)
}

impl GraphicsBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn open_display(&mut self, settings: &RenderSettings) -> Result<(), BackendError> {
        self.injected(InitStage::Display)?;
        self.settings = settings.clone();
        self.display = true;
        self.journal.record(JournalEntry::Acquired(Handle::Display));
        Ok(())
    }

    fn create_surface(
        &mut self,
        window: &Arc<dyn NativeWindow>,
        settings: &RenderSettings,
    ) -> Result<(), BackendError> {
        self.injected(InitStage::Surface)?;
        let size = if settings.size.is_empty() {
            window.size()
        } else {
            settings.size
        };
        if size.is_empty() {
            return Err(BackendError::Failed("window has zero size".to_string()));
        }
        self.size = size;
        self.surface = true;
        self.journal.record(JournalEntry::Acquired(Handle::Surface));
        Ok(())
    }

    fn choose_config(&mut self, _settings: &RenderSettings) -> Result<(), BackendError> {
        self.injected(InitStage::Config)
    }

    fn create_context(
        &mut self,
        version: ApiVersion,
        _settings: &RenderSettings,
    ) -> Result<(), BackendError> {
        self.journal.record(JournalEntry::ContextAttempt(version));
        self.injected(InitStage::Context)?;
        if self.faults.rejected_versions.contains(&version) {
            return Err(BackendError::Unsupported("context version"));
        }

        self.context = Some(version);
        self.current = true;
        self.journal.record(JournalEntry::Acquired(Handle::Context));
        self.journal.record(JournalEntry::Bound(thread_name()));
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            api_version: self.context.unwrap_or(ApiVersion::new(0, 0)),
            max_anisotropy: self.settings.max_anisotropy.clamp(1, MAX_ANISOTROPY),
            sample_count: crate::device::caps::clamp_sample_count(
                self.settings.sample_count,
                &SUPPORTED_SAMPLE_COUNTS,
            ),
            texture_filter: self.settings.texture_filter,
            depth: self.settings.depth,
            npot_textures: true,
            max_texture_size: MAX_TEXTURE_SIZE,
        }
    }

    fn set_vertical_sync(&mut self, enabled: bool) -> Result<(), BackendError> {
        if self.faults.fail_vertical_sync {
            return Err(BackendError::Unsupported("swap interval"));
        }
        self.journal.record(JournalEntry::VerticalSync(enabled));
        Ok(())
    }

    fn make_current(&mut self) -> Result<(), BackendError> {
        if self.faults.fail_make_current {
            return Err(BackendError::Failed("injected bind failure".to_string()));
        }
        self.current = true;
        self.journal.record(JournalEntry::Bound(thread_name()));
        Ok(())
    }

    fn release_current(&mut self) -> Result<(), BackendError> {
        self.current = false;
        self.journal.record(JournalEntry::Unbound(thread_name()));
        Ok(())
    }

    fn resize(&mut self, size: Size2) -> Result<(), BackendError> {
        log::trace!("null: resize {} -> {size}", self.size);
        self.size = size;
        self.journal.record(JournalEntry::Resized(size));
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<(), BackendError> {
        if self.faults.panic_on == Some(command.name()) {
            panic!("injected panic on {}", command.name());
        }
        match self.apply(&command) {
            Ok(()) => {
                self.journal.record(JournalEntry::Executed(command));
                Ok(())
            }
            Err(e) => {
                self.journal.record(JournalEntry::Rejected(command));
                Err(e)
            }
        }
    }

    fn present(&mut self) -> Result<(), PresentError> {
        if self.faults.fail_present {
            return Err(PresentError::Backend(BackendError::Failed(
                "injected present failure".to_string(),
            )));
        }
        if !self.current {
            return Err(PresentError::NoContext);
        }
        self.journal.record(JournalEntry::Presented);
        Ok(())
    }

    fn release_surface(&mut self) -> Result<(), BackendError> {
        if !std::mem::take(&mut self.surface) {
            return Err(BackendError::Failed("surface was never acquired".to_string()));
        }
        self.journal.record(JournalEntry::Released(Handle::Surface));
        Ok(())
    }

    fn release_context(&mut self) -> Result<(), BackendError> {
        if self.context.take().is_none() {
            return Err(BackendError::Failed("context was never acquired".to_string()));
        }
        self.current = false;
        self.journal.record(JournalEntry::Released(Handle::Context));
        Ok(())
    }

    fn release_display(&mut self) -> Result<(), BackendError> {
        if !std::mem::take(&mut self.display) {
            return Err(BackendError::Failed("display was never acquired".to_string()));
        }
        self.journal.record(JournalEntry::Released(Handle::Display));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BufferUsage, DrawCall, ResourceIds};
    use crate::shader::{ConstantDecl, ConstantKind, Shader, ShaderDesc};

    fn exec(backend: &mut NullBackend, command: Command) -> Result<(), BackendError> {
        backend.execute(command)
    }

    #[test]
    fn draw_needs_known_shader_and_buffer() {
        let mut ids = ResourceIds::new();
        let mut backend = NullBackend::new();

        let (shader, create) = Shader::create(&mut ids, ShaderDesc::wgsl("s", ""));
        let vb = ids.buffer();
        let draw = Command::Draw(DrawCall::new(shader.id(), vb, 3));

        assert_eq!(
            exec(&mut backend, draw.clone()),
            Err(BackendError::UnknownResource(ResourceId::Shader(shader.id())))
        );

        exec(&mut backend, create).unwrap();
        exec(
            &mut backend,
            Command::CreateBuffer {
                id: vb,
                usage: BufferUsage::Vertex,
                data: vec![0; 36],
            },
        )
        .unwrap();
        assert_eq!(exec(&mut backend, draw), Ok(()));
    }

    #[test]
    fn update_past_end_is_rejected() {
        let mut backend = NullBackend::new();
        exec(
            &mut backend,
            Command::CreateBuffer {
                id: BufferId(1),
                usage: BufferUsage::Vertex,
                data: vec![0; 8],
            },
        )
        .unwrap();

        let overflow = Command::UpdateBuffer {
            id: BufferId(1),
            offset: 4,
            data: vec![0; 8],
        };
        assert!(matches!(exec(&mut backend, overflow), Err(BackendError::InvalidCommand(_))));
    }

    #[test]
    fn constant_block_must_match_layout() {
        let mut ids = ResourceIds::new();
        let mut backend = NullBackend::new();
        let desc = ShaderDesc::wgsl("s", "").with_constants(vec![ConstantDecl::new("tint", ConstantKind::Vec4)]);
        let (shader, create) = Shader::create(&mut ids, desc);
        exec(&mut backend, create).unwrap();

        assert_eq!(exec(&mut backend, shader.bind_constants(shader.constants())), Ok(()));
    }

    #[test]
    fn delete_forgets_resource() {
        let mut backend = NullBackend::new();
        exec(
            &mut backend,
            Command::CreateTexture {
                id: TextureId(3),
                size: Size2::new(2, 2),
                pixels: vec![255; 16],
            },
        )
        .unwrap();

        exec(&mut backend, Command::SetTexture(Some(TextureId(3)))).unwrap();
        exec(&mut backend, Command::Delete(ResourceId::Texture(TextureId(3)))).unwrap();
        assert!(exec(&mut backend, Command::SetTexture(Some(TextureId(3)))).is_err());
        assert!(exec(&mut backend, Command::Delete(ResourceId::Texture(TextureId(3)))).is_err());
    }

    #[test]
    fn journal_separates_executed_and_rejected() {
        let mut backend = NullBackend::new();
        let journal = backend.journal();

        let _ = exec(&mut backend, Command::SetTexture(Some(TextureId(9))));
        let _ = exec(&mut backend, Command::SetTexture(None));

        assert_eq!(
            journal.entries(),
            vec![
                JournalEntry::Rejected(Command::SetTexture(Some(TextureId(9)))),
                JournalEntry::Executed(Command::SetTexture(None)),
            ]
        );
    }

    #[test]
    fn releasing_twice_fails() {
        let mut backend = NullBackend::new();
        backend.open_display(&RenderSettings::default()).unwrap();
        assert_eq!(backend.release_display(), Ok(()));
        assert!(backend.release_display().is_err());
        assert!(backend.release_surface().is_err());
    }

    #[test]
    fn present_needs_bound_context() {
        let mut backend = NullBackend::new();
        assert_eq!(backend.present(), Err(PresentError::NoContext));
        backend.make_current().unwrap();
        assert_eq!(backend.present(), Ok(()));
        assert_eq!(backend.journal().presents(), 1);
    }

    #[test]
    fn capabilities_clamp_requests() {
        let mut backend = NullBackend::new();
        let settings = RenderSettings {
            sample_count: 6,
            max_anisotropy: 64,
            ..Default::default()
        };
        backend.open_display(&settings).unwrap();
        backend.create_context(ApiVersion::new(3, 0), &settings).unwrap();

        let caps = backend.capabilities();
        assert_eq!(caps.sample_count, 4);
        assert_eq!(caps.max_anisotropy, 16);
        assert_eq!(caps.api_version, ApiVersion::new(3, 0));
    }
}
