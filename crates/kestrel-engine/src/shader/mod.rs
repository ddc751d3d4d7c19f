//! Shader resources as seen by producers.
//!
//! The render core never interprets shader source. What it does own is the
//! constant-binding contract: a shader declares its constants, the declaration
//! is turned into a fixed uniform-block layout, and producers fill
//! [`ConstantBlock`]s that the backend binds for subsequent draws.
//!
//! Block layout rule (matches WGSL uniform layout for the declared types when
//! every array element is written as a 16-byte aligned vector):
//! - each constant starts at a 16-byte aligned offset
//! - element stride is 16 bytes for `Float`/`Vec2`/`Vec3`/`Vec4` and 64 for `Mat4`
//! - total block size is rounded up to 16 bytes

mod constants;
mod desc;

pub use constants::{ConstantBlock, ConstantId, ConstantLayout, ConstantValue, LayoutEntry};
pub use desc::{ConstantDecl, ConstantKind, ShaderDesc, ShaderStage, VertexFormat};

use std::sync::Arc;

use crate::command::{Command, ResourceIds, ShaderId};

/// Errors raised while filling constant blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("shader has no constant #{0}")]
    UnknownConstant(u32),

    #[error("constant `{name}` is declared as {expected:?}, got {actual:?}")]
    KindMismatch {
        name: String,
        expected: ConstantKind,
        actual: ConstantKind,
    },

    #[error("constant `{name}` holds {expected} element(s), got {actual}")]
    CountMismatch {
        name: String,
        expected: u32,
        actual: usize,
    },
}

/// Producer-side handle to a shader created through a `CreateShader` command.
///
/// Holds only the id and the constant layout; the GPU object lives on the
/// render thread.
#[derive(Debug, Clone)]
pub struct Shader {
    id: ShaderId,
    layout: Arc<ConstantLayout>,
}

impl Shader {
    /// Allocates an id for `desc` and returns the handle plus the command that
    /// creates the shader on the render thread.
    pub fn create(ids: &mut ResourceIds, desc: ShaderDesc) -> (Shader, Command) {
        let id = ids.shader();
        let layout = Arc::new(ConstantLayout::new(&desc.constants));
        let shader = Shader { id, layout };
        (shader, Command::CreateShader { id, desc })
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn layout(&self) -> &Arc<ConstantLayout> {
        &self.layout
    }

    /// Looks up a declared constant by name.
    pub fn constant_id(&self, name: &str) -> Option<ConstantId> {
        self.layout.id(name)
    }

    /// A zeroed block matching this shader's layout.
    pub fn constants(&self) -> ConstantBlock {
        ConstantBlock::new(self.layout.clone())
    }

    /// Wraps a filled block into the command that binds it.
    pub fn bind_constants(&self, block: ConstantBlock) -> Command {
        Command::SetShaderConstants {
            shader: self.id,
            block,
        }
    }
}
