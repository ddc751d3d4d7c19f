use crate::command::{BlendMode, CullMode, IndexFormat, ShaderId, Topology};
use crate::shader::{ShaderStage, VertexFormat};

use super::frame::DEPTH_FORMAT;
use super::resources::GpuShader;

/// Pipelines are cached per shader and the fixed-function state a draw sees.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub shader: ShaderId,
    pub blend: BlendMode,
    pub cull: CullMode,
    pub topology: Topology,
}

/// Attachment layout every pipeline renders into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) struct PipelineTarget {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub depth: bool,
}

pub(super) fn build_pipeline(
    device: &wgpu::Device,
    shader: &GpuShader,
    key: PipelineKey,
    target: PipelineTarget,
) -> wgpu::RenderPipeline {
    let attributes = vertex_attributes(&shader.desc.vertex_layout);
    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: shader.desc.vertex_stride(),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    };
    let buffers: &[wgpu::VertexBufferLayout] = if attributes.is_empty() {
        &[]
    } else {
        std::slice::from_ref(&vertex_layout)
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&shader.desc.label),
        layout: Some(&shader.pipeline_layout),

        vertex: wgpu::VertexState {
            module: &shader.module,
            entry_point: Some(&shader.desc.vertex_entry),
            compilation_options: Default::default(),
            buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader.module,
            entry_point: Some(&shader.desc.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.format,
                blend: blend_state(key.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: primitive_topology(key.topology),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: cull_face(key.cull),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: target.depth.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: target.sample_count,
            ..Default::default()
        },

        multiview_mask: None,
        cache: None,
    })
}

/// Attributes at consecutive shader locations, tightly packed in declaration order.
pub(super) fn vertex_attributes(layout: &[VertexFormat]) -> Vec<wgpu::VertexAttribute> {
    let mut offset = 0;
    layout
        .iter()
        .enumerate()
        .map(|(location, format)| {
            let attribute = wgpu::VertexAttribute {
                format: vertex_format(*format),
                offset,
                shader_location: location as u32,
            };
            offset += format.size();
            attribute
        })
        .collect()
}

pub(super) fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

pub(super) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    match mode {
        BlendMode::Opaque => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        }),
    }
}

pub(super) fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
    }
}

pub(super) fn cull_face(cull: CullMode) -> Option<wgpu::Face> {
    match cull {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

pub(super) fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::U16 => wgpu::IndexFormat::Uint16,
        IndexFormat::U32 => wgpu::IndexFormat::Uint32,
    }
}

pub(super) fn index_size(format: IndexFormat) -> u64 {
    match format {
        IndexFormat::U16 => 2,
        IndexFormat::U32 => 4,
    }
}

pub(super) fn shader_stages(stage: ShaderStage) -> wgpu::ShaderStages {
    match stage {
        ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
        ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        ShaderStage::Both => wgpu::ShaderStages::VERTEX_FRAGMENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_pack_in_declaration_order() {
        let attrs = vertex_attributes(&[
            VertexFormat::Float32x2,
            VertexFormat::Unorm8x4,
            VertexFormat::Float32x3,
        ]);

        let placed: Vec<(u64, u32)> = attrs.iter().map(|a| (a.offset, a.shader_location)).collect();
        assert_eq!(placed, vec![(0, 0), (8, 1), (12, 2)]);
        assert_eq!(attrs[1].format, wgpu::VertexFormat::Unorm8x4);
    }

    #[test]
    fn opaque_disables_blending() {
        assert_eq!(blend_state(BlendMode::Opaque), None);
        assert_eq!(blend_state(BlendMode::Alpha), Some(wgpu::BlendState::ALPHA_BLENDING));
        let additive = blend_state(BlendMode::Additive).unwrap();
        assert_eq!(additive.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn stage_union_maps_to_both() {
        assert_eq!(shader_stages(ShaderStage::Both), wgpu::ShaderStages::VERTEX_FRAGMENT);
        assert_eq!(index_size(IndexFormat::U16), 2);
    }
}
