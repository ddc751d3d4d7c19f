use std::collections::HashMap;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::command::{BufferId, BufferUsage, DrawCall, ResourceId, ShaderId, TextureId};
use crate::config::TextureFilter;
use crate::coords::Size2;
use crate::device::{BackendError, Capabilities};
use crate::shader::{ConstantBlock, ConstantLayout, ShaderDesc};

use super::pipeline::{
    build_pipeline, index_format, index_size, shader_stages, PipelineKey, PipelineTarget,
};

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub(super) struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub usage: BufferUsage,
    pub size: u64,
}

pub(super) struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub(super) struct GpuShader {
    pub module: wgpu::ShaderModule,
    pub desc: ShaderDesc,
    pub layout: ConstantLayout,
    pub bind_group_layout: Option<wgpu::BindGroupLayout>,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub uniform: Option<wgpu::Buffer>,
    /// Cached for the texture it was built with.
    pub bind_group: Option<(Option<TextureId>, wgpu::BindGroup)>,
}

/// Every GPU object created through commands, keyed by producer ids.
pub(super) struct Resources {
    buffers: HashMap<BufferId, GpuBuffer>,
    textures: HashMap<TextureId, GpuTexture>,
    shaders: HashMap<ShaderId, GpuShader>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    sampler: wgpu::Sampler,
    fallback: GpuTexture,
}

fn unknown(id: impl Into<ResourceId>) -> BackendError {
    BackendError::UnknownResource(id.into())
}

fn invalid(msg: impl Into<String>) -> BackendError {
    BackendError::InvalidCommand(msg.into())
}

impl Resources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, caps: &Capabilities) -> Self {
        Self {
            buffers: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
            sampler: create_sampler(device, caps.texture_filter, caps.max_anisotropy),
            fallback: upload_texture(device, queue, "kestrel fallback texture", Size2::new(1, 1), &[255; 4]),
        }
    }

    // ── buffers ───────────────────────────────────────────────────────────

    pub fn create_buffer(
        &mut self,
        device: &wgpu::Device,
        id: BufferId,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<(), BackendError> {
        if data.is_empty() {
            return Err(invalid("empty buffer"));
        }

        let wgpu_usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kestrel buffer"),
            contents: data,
            usage: wgpu_usage,
        });

        self.buffers.insert(
            id,
            GpuBuffer {
                buffer,
                usage,
                size: data.len() as u64,
            },
        );
        Ok(())
    }

    /// Records the update into `encoder` so it lands between the passes
    /// recorded before and after it.
    pub fn update_buffer(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        id: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let target = self.buffers.get(&id).ok_or_else(|| unknown(id))?;

        let len = data.len() as u64;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(invalid(format!(
                "buffer update offset {offset} and length {len} must be multiples of {}",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        if offset + len > target.size {
            return Err(invalid(format!(
                "update of {len} bytes at {offset} overflows a {}-byte buffer",
                target.size
            )));
        }
        if len == 0 {
            return Ok(());
        }

        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kestrel staging buffer"),
            contents: data,
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        encoder.copy_buffer_to_buffer(&staging, 0, &target.buffer, offset, len);
        Ok(())
    }

    // ── textures ──────────────────────────────────────────────────────────

    pub fn create_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        caps: &Capabilities,
        id: TextureId,
        size: Size2,
        pixels: &[u8],
    ) -> Result<(), BackendError> {
        if size.is_empty() || size.width > caps.max_texture_size || size.height > caps.max_texture_size {
            return Err(invalid(format!(
                "texture size {size} outside 1..={}",
                caps.max_texture_size
            )));
        }
        if !caps.npot_textures && !(size.width.is_power_of_two() && size.height.is_power_of_two()) {
            return Err(BackendError::Unsupported("non-power-of-two textures"));
        }
        if pixels.len() as u64 != size.area() * 4 {
            return Err(invalid(format!(
                "{} bytes of pixels for a {size} RGBA8 texture",
                pixels.len()
            )));
        }

        let texture = upload_texture(device, queue, "kestrel texture", size, pixels);
        if self.textures.insert(id, texture).is_some() {
            self.forget_bind_groups_using(id);
        }
        Ok(())
    }

    pub fn has_texture(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    // ── shaders ───────────────────────────────────────────────────────────

    pub fn create_shader(
        &mut self,
        device: &wgpu::Device,
        id: ShaderId,
        desc: ShaderDesc,
    ) -> Result<(), BackendError> {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
        });

        let layout = ConstantLayout::new(&desc.constants);
        let entries = bind_group_layout_entries(&layout, desc.textured);

        let bind_group_layout = (!entries.is_empty()).then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&desc.label),
                entries: &entries,
            })
        });

        let group_layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layout.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&desc.label),
            bind_group_layouts: &group_layouts,
            immediate_size: 0,
        });

        // Zeroed until the first SetShaderConstants.
        let uniform = (!layout.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("kestrel constants"),
                contents: &vec![0u8; layout.size()],
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        self.pipelines.retain(|key, _| key.shader != id);
        self.shaders.insert(
            id,
            GpuShader {
                module,
                desc,
                layout,
                bind_group_layout,
                pipeline_layout,
                uniform,
                bind_group: None,
            },
        );
        Ok(())
    }

    /// Binds `block` for later draws of `shader`.
    ///
    /// Each call gets a fresh uniform buffer: draws already recorded keep
    /// reading the previous values.
    pub fn set_constants(
        &mut self,
        device: &wgpu::Device,
        id: ShaderId,
        block: &ConstantBlock,
    ) -> Result<(), BackendError> {
        let shader = self.shaders.get_mut(&id).ok_or_else(|| unknown(id))?;

        if block.layout() != &shader.layout {
            return Err(invalid(format!(
                "constant block does not match the layout of shader `{}`",
                shader.desc.label
            )));
        }
        if shader.layout.is_empty() {
            return Ok(());
        }

        shader.uniform = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kestrel constants"),
            contents: block.bytes(),
            usage: wgpu::BufferUsages::UNIFORM,
        }));
        shader.bind_group = None;
        Ok(())
    }

    // ── deletion ──────────────────────────────────────────────────────────

    pub fn delete(&mut self, id: ResourceId) -> Result<(), BackendError> {
        let known = match id {
            ResourceId::Buffer(b) => self.buffers.remove(&b).is_some(),
            ResourceId::Shader(s) => {
                self.pipelines.retain(|key, _| key.shader != s);
                self.shaders.remove(&s).is_some()
            }
            ResourceId::Texture(t) => {
                self.forget_bind_groups_using(t);
                self.textures.remove(&t).is_some()
            }
        };

        if known { Ok(()) } else { Err(unknown(id)) }
    }

    fn forget_bind_groups_using(&mut self, texture: TextureId) {
        for shader in self.shaders.values_mut() {
            if matches!(shader.bind_group, Some((Some(t), _)) if t == texture) {
                shader.bind_group = None;
            }
        }
    }

    // ── draws ─────────────────────────────────────────────────────────────

    /// Validates `call` and makes sure its pipeline and bind group exist.
    pub fn prepare_draw(
        &mut self,
        device: &wgpu::Device,
        call: &DrawCall,
        key: PipelineKey,
        target: PipelineTarget,
        texture: Option<TextureId>,
    ) -> Result<(), BackendError> {
        let shader = self.shaders.get(&call.shader).ok_or_else(|| unknown(call.shader))?;
        let end = call
            .first
            .checked_add(call.count)
            .ok_or_else(|| invalid("draw range overflows"))? as u64;

        let stride = shader.desc.vertex_stride();
        if stride > 0 {
            let vertices = self.buffers.get(&call.vertex_buffer).ok_or_else(|| unknown(call.vertex_buffer))?;
            if vertices.usage != BufferUsage::Vertex {
                return Err(invalid("draw bound an index buffer as vertex buffer"));
            }
            if call.index_buffer.is_none() && end * stride > vertices.size {
                return Err(invalid(format!("draw reads past the {}-byte vertex buffer", vertices.size)));
            }
        }

        if let Some(index) = call.index_buffer {
            let indices = self.buffers.get(&index.buffer).ok_or_else(|| unknown(index.buffer))?;
            if indices.usage != BufferUsage::Index {
                return Err(invalid("draw bound a vertex buffer as index buffer"));
            }
            if end * index_size(index.format) > indices.size {
                return Err(invalid(format!("draw reads past the {}-byte index buffer", indices.size)));
            }
        }

        if !self.pipelines.contains_key(&key) {
            log::debug!("wgpu: building pipeline for {key:?}");
            let pipeline = build_pipeline(device, shader, key, target);
            self.pipelines.insert(key, pipeline);
        }

        self.ensure_bind_group(device, call.shader, texture)
    }

    fn ensure_bind_group(
        &mut self,
        device: &wgpu::Device,
        id: ShaderId,
        texture: Option<TextureId>,
    ) -> Result<(), BackendError> {
        let Self {
            shaders,
            textures,
            sampler,
            fallback,
            ..
        } = self;
        let shader = shaders.get_mut(&id).ok_or_else(|| unknown(id))?;

        let Some(layout) = &shader.bind_group_layout else {
            return Ok(());
        };
        let texture = if shader.desc.textured { texture } else { None };
        if matches!(&shader.bind_group, Some((t, _)) if *t == texture) {
            return Ok(());
        }

        let view = match texture {
            Some(t) => &textures.get(&t).ok_or_else(|| unknown(t))?.view,
            None => &fallback.view,
        };

        let mut entries = Vec::with_capacity(3);
        if let Some(uniform) = &shader.uniform {
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            });
        }
        if shader.desc.textured {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&shader.desc.label),
            layout,
            entries: &entries,
        });
        shader.bind_group = Some((texture, bind_group));
        Ok(())
    }

    /// Records a draw prepared by [`prepare_draw`](Self::prepare_draw).
    pub fn record_draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        call: &DrawCall,
        key: PipelineKey,
    ) -> Result<(), BackendError> {
        let shader = self.shaders.get(&call.shader).ok_or_else(|| unknown(call.shader))?;
        let pipeline = self
            .pipelines
            .get(&key)
            .ok_or_else(|| BackendError::Failed("pipeline was not prepared".to_string()))?;

        pass.set_pipeline(pipeline);
        if let Some((_, bind_group)) = &shader.bind_group {
            pass.set_bind_group(0, bind_group, &[]);
        }
        if shader.desc.vertex_stride() > 0 {
            let vertices = self.buffers.get(&call.vertex_buffer).ok_or_else(|| unknown(call.vertex_buffer))?;
            pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        }

        let range = call.first..call.first + call.count;
        match call.index_buffer {
            Some(index) => {
                let indices = self.buffers.get(&index.buffer).ok_or_else(|| unknown(index.buffer))?;
                pass.set_index_buffer(indices.buffer.slice(..), index_format(index.format));
                pass.draw_indexed(range, 0, 0..1);
            }
            None => pass.draw(range, 0..1),
        }
        Ok(())
    }
}

fn bind_group_layout_entries(layout: &ConstantLayout, textured: bool) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(3);

    if let Some(stage) = layout.visibility() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: shader_stages(stage),
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(layout.size() as u64),
            },
            count: None,
        });
    }

    if textured {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    entries
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    size: Size2,
    pixels: &[u8],
) -> GpuTexture {
    let extent = wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    // New texture: nothing recorded earlier can observe the write.
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(size.width * 4),
            rows_per_image: Some(size.height),
        },
        extent,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

fn create_sampler(device: &wgpu::Device, filter: TextureFilter, max_anisotropy: u16) -> wgpu::Sampler {
    let (filter_mode, mipmap_filter) = match filter {
        TextureFilter::Point => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest),
        TextureFilter::Bilinear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest),
        TextureFilter::Trilinear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear),
    };

    // Anisotropy requires linear filtering on every axis.
    let anisotropy_clamp = if filter == TextureFilter::Trilinear {
        max_anisotropy.clamp(1, 16)
    } else {
        1
    };

    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("kestrel sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter_mode,
        min_filter: filter_mode,
        mipmap_filter,
        anisotropy_clamp,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{ConstantDecl, ConstantKind, ShaderStage};

    #[test]
    fn untextured_shader_without_constants_needs_no_bindings() {
        let layout = ConstantLayout::new(&[]);
        assert!(bind_group_layout_entries(&layout, false).is_empty());
    }

    #[test]
    fn bindings_follow_constant_and_texture_usage() {
        let layout = ConstantLayout::new(&[
            ConstantDecl::new("mvp", ConstantKind::Mat4).stage(ShaderStage::Vertex),
        ]);

        let entries = bind_group_layout_entries(&layout, true);
        let bindings: Vec<u32> = entries.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2]);
        assert_eq!(entries[0].visibility, wgpu::ShaderStages::VERTEX);

        let constants_only = bind_group_layout_entries(&layout, false);
        assert_eq!(constants_only.len(), 1);
    }
}
