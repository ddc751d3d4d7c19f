use std::fmt;

/// Opaque handle to a GPU buffer created by a `CreateBuffer` command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Opaque handle to a shader created by a `CreateShader` command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Opaque handle to a texture created by a `CreateTexture` command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Any resource handle; used by `Delete` and in error reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Buffer(BufferId),
    Shader(ShaderId),
    Texture(TextureId),
}

impl From<BufferId> for ResourceId {
    fn from(id: BufferId) -> Self {
        ResourceId::Buffer(id)
    }
}

impl From<ShaderId> for ResourceId {
    fn from(id: ShaderId) -> Self {
        ResourceId::Shader(id)
    }
}

impl From<TextureId> for ResourceId {
    fn from(id: TextureId) -> Self {
        ResourceId::Texture(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Buffer(id) => write!(f, "buffer#{}", id.0),
            ResourceId::Shader(id) => write!(f, "shader#{}", id.0),
            ResourceId::Texture(id) => write!(f, "texture#{}", id.0),
        }
    }
}

/// Producer-side id allocator.
///
/// Ids are never reused, so a stale id can only miss, never alias a newer resource.
#[derive(Debug, Default)]
pub struct ResourceIds {
    next: u32,
}

impl ResourceIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u32 {
        self.next = self.next.wrapping_add(1);
        self.next
    }

    pub fn buffer(&mut self) -> BufferId {
        BufferId(self.bump())
    }

    pub fn shader(&mut self) -> ShaderId {
        ShaderId(self.bump())
    }

    pub fn texture(&mut self) -> TextureId {
        TextureId(self.bump())
    }
}
