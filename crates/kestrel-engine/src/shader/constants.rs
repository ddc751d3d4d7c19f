use std::sync::Arc;

use super::desc::{ConstantDecl, ConstantKind, ShaderStage};
use super::ShaderError;

/// Index of a constant inside its shader's declaration list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConstantId(pub(crate) u32);

impl ConstantId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Resolved placement of one declared constant.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEntry {
    pub name: String,
    pub kind: ConstantKind,
    pub count: u32,
    pub stage: ShaderStage,
    pub offset: usize,
}

/// Uniform-block layout computed from a shader's constant declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantLayout {
    entries: Vec<LayoutEntry>,
    size: usize,
}

const BLOCK_ALIGN: usize = 16;

fn align_up(v: usize, align: usize) -> usize {
    v.div_ceil(align) * align
}

impl ConstantLayout {
    pub fn new(decls: &[ConstantDecl]) -> Self {
        let mut offset = 0;
        let mut entries = Vec::with_capacity(decls.len());

        for decl in decls {
            offset = align_up(offset, BLOCK_ALIGN);
            entries.push(LayoutEntry {
                name: decl.name.clone(),
                kind: decl.kind,
                count: decl.count,
                stage: decl.stage,
                offset,
            });
            offset += decl.kind.stride() * decl.count as usize;
        }

        Self {
            entries,
            size: align_up(offset, BLOCK_ALIGN),
        }
    }

    /// Block size in bytes; zero when the shader declares no constants.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn entry(&self, id: ConstantId) -> Option<&LayoutEntry> {
        self.entries.get(id.0 as usize)
    }

    pub fn id(&self, name: &str) -> Option<ConstantId> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| ConstantId(i as u32))
    }

    /// Stages that read at least one constant; `None` for an empty layout.
    pub fn visibility(&self) -> Option<ShaderStage> {
        self.entries
            .iter()
            .map(|e| e.stage)
            .reduce(ShaderStage::union)
    }
}

/// Values for one constant, borrowed from the caller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConstantValue<'a> {
    Float(&'a [f32]),
    Vec2(&'a [[f32; 2]]),
    Vec3(&'a [[f32; 3]]),
    Vec4(&'a [[f32; 4]]),
    Mat4(&'a [[f32; 16]]),
}

impl ConstantValue<'_> {
    pub fn kind(&self) -> ConstantKind {
        match self {
            ConstantValue::Float(_) => ConstantKind::Float,
            ConstantValue::Vec2(_) => ConstantKind::Vec2,
            ConstantValue::Vec3(_) => ConstantKind::Vec3,
            ConstantValue::Vec4(_) => ConstantKind::Vec4,
            ConstantValue::Mat4(_) => ConstantKind::Mat4,
        }
    }

    fn len(&self) -> usize {
        match self {
            ConstantValue::Float(v) => v.len(),
            ConstantValue::Vec2(v) => v.len(),
            ConstantValue::Vec3(v) => v.len(),
            ConstantValue::Vec4(v) => v.len(),
            ConstantValue::Mat4(v) => v.len(),
        }
    }

    /// Flattened components of element `i`.
    fn element(&self, i: usize) -> &[f32] {
        match self {
            ConstantValue::Float(v) => std::slice::from_ref(&v[i]),
            ConstantValue::Vec2(v) => &v[i],
            ConstantValue::Vec3(v) => &v[i],
            ConstantValue::Vec4(v) => &v[i],
            ConstantValue::Mat4(v) => &v[i],
        }
    }
}

/// A filled uniform block for one shader, ready to travel in a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantBlock {
    layout: Arc<ConstantLayout>,
    bytes: Vec<u8>,
}

impl ConstantBlock {
    pub fn new(layout: Arc<ConstantLayout>) -> Self {
        let bytes = vec![0u8; layout.size()];
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &ConstantLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes all elements of one constant.
    ///
    /// The value kind must match the declaration and carry exactly the declared
    /// number of elements.
    pub fn set(&mut self, id: ConstantId, value: ConstantValue<'_>) -> Result<&mut Self, ShaderError> {
        let entry = self
            .layout
            .entry(id)
            .ok_or(ShaderError::UnknownConstant(id.0))?;

        if entry.kind != value.kind() {
            return Err(ShaderError::KindMismatch {
                name: entry.name.clone(),
                expected: entry.kind,
                actual: value.kind(),
            });
        }
        if entry.count as usize != value.len() {
            return Err(ShaderError::CountMismatch {
                name: entry.name.clone(),
                expected: entry.count,
                actual: value.len(),
            });
        }

        let stride = entry.kind.stride();
        for i in 0..value.len() {
            let src: &[u8] = bytemuck::cast_slice(value.element(i));
            let start = entry.offset + i * stride;
            self.bytes[start..start + src.len()].copy_from_slice(src);
        }

        Ok(self)
    }
}
