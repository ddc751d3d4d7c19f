use crate::coords::Size2;
use crate::device::ApiVersion;

/// Texture sampling quality applied to every bound texture.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

/// Parameters for `RenderDevice::init`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Initial drawable size in physical pixels. Zero means "ask the window".
    pub size: Size2,

    /// Requested MSAA sample count; clamped to what the backend supports.
    pub sample_count: u32,

    pub texture_filter: TextureFilter,

    /// Requested anisotropy; `1` disables it. Clamped by the backend.
    pub max_anisotropy: u16,

    pub vertical_sync: bool,

    /// Allocate a depth attachment.
    pub depth: bool,

    /// Enable backend validation and debug labels.
    pub debug_renderer: bool,

    /// Context versions to try, highest first.
    pub api_versions: Vec<ApiVersion>,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Presentation latency hint; support depends on platform.
    pub desired_maximum_frame_latency: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            size: Size2::new(0, 0),
            sample_count: 1,
            texture_filter: TextureFilter::default(),
            max_anisotropy: 1,
            vertical_sync: true,
            depth: true,
            debug_renderer: false,
            api_versions: vec![ApiVersion::new(3, 0), ApiVersion::new(2, 0)],
            prefer_srgb: true,
            desired_maximum_frame_latency: 2,
        }
    }
}
