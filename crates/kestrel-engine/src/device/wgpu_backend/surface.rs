use crate::coords::Size2;
use crate::device::BackendError;

pub(super) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| formats.contains(f)) {
            return Some(f);
        }
    }

    formats.first().copied()
}

pub(super) fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    [wgpu::CompositeAlphaMode::Opaque]
        .into_iter()
        .find(|m| modes.contains(m))
        .or_else(|| modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// `Fifo` is always available; tearing modes only when the surface lists them.
pub(super) fn choose_present_mode(
    supported: &[wgpu::PresentMode],
    vertical_sync: bool,
) -> Option<wgpu::PresentMode> {
    if vertical_sync {
        return Some(wgpu::PresentMode::Fifo);
    }

    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|m| supported.contains(m))
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}

pub(super) fn surface_error_action(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Reconfigures when the surface went stale and turns the error into a
/// per-command failure.
pub(super) fn handle_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: Size2,
    err: wgpu::SurfaceError,
) -> BackendError {
    match surface_error_action(&err) {
        SurfaceErrorAction::Reconfigured => {
            if !size.is_empty() {
                surface.configure(device, config);
            }
            BackendError::SurfaceLost
        }
        SurfaceErrorAction::SkipFrame => BackendError::FrameSkipped(err.to_string()),
        SurfaceErrorAction::Fatal => BackendError::OutOfMemory,
    }
}
