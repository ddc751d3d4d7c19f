use std::fmt;

use crate::config::TextureFilter;

/// Graphics API version as `major.minor`. Higher compares greater.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u8,
    pub minor: u8,
}

impl ApiVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What the initialised device actually provides.
///
/// Requested values from `RenderSettings` are clamped to backend limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    /// Version accepted during negotiation.
    pub api_version: ApiVersion,
    pub max_anisotropy: u16,
    pub sample_count: u32,
    pub texture_filter: TextureFilter,
    pub depth: bool,
    pub npot_textures: bool,
    pub max_texture_size: u32,
}

/// Largest power of two not above `requested`, limited to `supported`.
pub(crate) fn clamp_sample_count(requested: u32, supported: &[u32]) -> u32 {
    supported
        .iter()
        .copied()
        .filter(|&n| n <= requested.max(1))
        .max()
        .unwrap_or(1)
}
