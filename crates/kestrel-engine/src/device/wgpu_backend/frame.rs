use crate::coords::Size2;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Work recorded since the last present.
///
/// The encoder exists as soon as anything is recorded; the surface texture is
/// acquired on the first pass that draws.
pub(super) struct Frame {
    pub encoder: wgpu::CommandEncoder,
    pub target: Option<FrameTarget>,
}

pub(super) struct FrameTarget {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl Frame {
    pub fn new(device: &wgpu::Device) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("kestrel frame encoder"),
        });
        Self {
            encoder,
            target: None,
        }
    }
}

/// Off-screen attachments sized to the surface.
#[derive(Default)]
pub(super) struct Attachments {
    /// Multisampled color target resolved into the surface texture.
    pub msaa: Option<wgpu::TextureView>,
    pub depth: Option<wgpu::TextureView>,
}

impl Attachments {
    pub fn new(
        device: &wgpu::Device,
        size: Size2,
        format: wgpu::TextureFormat,
        sample_count: u32,
        depth: bool,
    ) -> Self {
        if size.is_empty() {
            return Self::default();
        }

        let make = |label: &str, format: wgpu::TextureFormat| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width: size.width,
                        height: size.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };

        Self {
            msaa: (sample_count > 1).then(|| make("kestrel msaa color", format)),
            depth: depth.then(|| make("kestrel depth", DEPTH_FORMAT)),
        }
    }

    /// Color view to render into and the view to resolve into, if any.
    pub fn color_views<'a>(
        &'a self,
        target: &'a wgpu::TextureView,
    ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match &self.msaa {
            Some(msaa) => (msaa, Some(target)),
            None => (target, None),
        }
    }
}
