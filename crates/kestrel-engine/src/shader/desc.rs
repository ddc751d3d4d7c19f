/// Vertex attribute formats a shader can consume, in buffer order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Unorm8x4,
}

impl VertexFormat {
    /// Size of one attribute in bytes.
    pub const fn size(self) -> u64 {
        match self {
            VertexFormat::Float32 | VertexFormat::Unorm8x4 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// Which stage reads a constant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Both,
}

impl ShaderStage {
    pub fn union(self, other: ShaderStage) -> ShaderStage {
        if self == other { self } else { ShaderStage::Both }
    }
}

/// Declared type of a shader constant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl ConstantKind {
    /// Number of f32 components in one element.
    pub const fn components(self) -> usize {
        match self {
            ConstantKind::Float => 1,
            ConstantKind::Vec2 => 2,
            ConstantKind::Vec3 => 3,
            ConstantKind::Vec4 => 4,
            ConstantKind::Mat4 => 16,
        }
    }

    /// Distance between consecutive elements inside a block, in bytes.
    pub const fn stride(self) -> usize {
        match self {
            ConstantKind::Mat4 => 64,
            _ => 16,
        }
    }
}

/// One named constant (or constant array) of a shader.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDecl {
    pub name: String,
    pub kind: ConstantKind,
    pub count: u32,
    pub stage: ShaderStage,
}

impl ConstantDecl {
    pub fn new(name: impl Into<String>, kind: ConstantKind) -> Self {
        Self {
            name: name.into(),
            kind,
            count: 1,
            stage: ShaderStage::Both,
        }
    }

    pub fn array(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn stage(mut self, stage: ShaderStage) -> Self {
        self.stage = stage;
        self
    }
}

/// Everything a backend needs to build a shader object.
///
/// `source` is WGSL and is passed to the backend untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDesc {
    pub label: String,
    pub source: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub vertex_layout: Vec<VertexFormat>,
    pub constants: Vec<ConstantDecl>,

    /// Samples the currently bound texture (binding 1) with the device sampler (binding 2).
    pub textured: bool,
}

impl ShaderDesc {
    /// A WGSL shader with `vs_main`/`fs_main` entry points and no inputs.
    pub fn wgsl(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            vertex_layout: Vec::new(),
            constants: Vec::new(),
            textured: false,
        }
    }

    pub fn with_entry_points(mut self, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.vertex_entry = vertex.into();
        self.fragment_entry = fragment.into();
        self
    }

    pub fn with_vertex_layout(mut self, layout: Vec<VertexFormat>) -> Self {
        self.vertex_layout = layout;
        self
    }

    pub fn with_constants(mut self, constants: Vec<ConstantDecl>) -> Self {
        self.constants = constants;
        self
    }

    pub fn textured(mut self) -> Self {
        self.textured = true;
        self
    }

    /// Bytes per vertex for the declared layout.
    pub fn vertex_stride(&self) -> u64 {
        self.vertex_layout.iter().map(|f| f.size()).sum()
    }
}
