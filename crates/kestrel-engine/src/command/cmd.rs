use crate::coords::{Color, Rect, Size2};
use crate::shader::{ConstantBlock, ShaderDesc};

use super::ids::{BufferId, ResourceId, ShaderId, TextureId};

/// How a buffer will be bound by draws.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Straight alpha: `src * a + dst * (1 - a)`.
    Alpha,
    Additive,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IndexBinding {
    pub buffer: BufferId,
    pub format: IndexFormat,
}

/// One draw call. `first`/`count` address indices when an index buffer is
/// bound, vertices otherwise.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DrawCall {
    pub shader: ShaderId,
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<IndexBinding>,
    pub topology: Topology,
    pub first: u32,
    pub count: u32,
}

impl DrawCall {
    pub fn new(shader: ShaderId, vertex_buffer: BufferId, count: u32) -> Self {
        Self {
            shader,
            vertex_buffer,
            index_buffer: None,
            topology: Topology::TriangleList,
            first: 0,
            count,
        }
    }

    pub fn indexed(mut self, buffer: BufferId, format: IndexFormat) -> Self {
        self.index_buffer = Some(IndexBinding { buffer, format });
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn range(mut self, first: u32, count: u32) -> Self {
        self.first = first;
        self.count = count;
        self
    }
}

/// A single recorded render-thread operation.
///
/// Commands are immutable once pushed; executing one may change live GPU state
/// (bound texture, blend, viewport), so execution order is the only ordering
/// guarantee.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer {
        id: BufferId,
        usage: BufferUsage,
        data: Vec<u8>,
    },
    UpdateBuffer {
        id: BufferId,
        offset: u64,
        data: Vec<u8>,
    },
    /// RGBA8 pixels, row-major, `size.width * size.height * 4` bytes.
    CreateTexture {
        id: TextureId,
        size: Size2,
        pixels: Vec<u8>,
    },
    CreateShader {
        id: ShaderId,
        desc: ShaderDesc,
    },
    SetShaderConstants {
        shader: ShaderId,
        block: ConstantBlock,
    },
    Delete(ResourceId),

    SetViewport(Rect),
    /// `None` disables scissoring.
    SetScissor(Option<Rect>),
    SetBlendMode(BlendMode),
    SetCullMode(CullMode),
    SetTexture(Option<TextureId>),

    Clear {
        color: Option<Color>,
        depth: Option<f32>,
    },
    Draw(DrawCall),

    /// Ends the frame and swaps buffers.
    Present,
}

impl Command {
    /// Stable label for logs and error values.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateBuffer { .. } => "CreateBuffer",
            Command::UpdateBuffer { .. } => "UpdateBuffer",
            Command::CreateTexture { .. } => "CreateTexture",
            Command::CreateShader { .. } => "CreateShader",
            Command::SetShaderConstants { .. } => "SetShaderConstants",
            Command::Delete(_) => "Delete",
            Command::SetViewport(_) => "SetViewport",
            Command::SetScissor(_) => "SetScissor",
            Command::SetBlendMode(_) => "SetBlendMode",
            Command::SetCullMode(_) => "SetCullMode",
            Command::SetTexture(_) => "SetTexture",
            Command::Clear { .. } => "Clear",
            Command::Draw(_) => "Draw",
            Command::Present => "Present",
        }
    }
}
