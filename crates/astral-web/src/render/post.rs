use super::helpers::{self, HDR_FORMAT};
use astral_core::PostFxUniforms;

pub(crate) struct PostResources {
    pub(crate) bgl: wgpu::BindGroupLayout, // tex+sampler+uniform
    pub(crate) sampler: wgpu::Sampler,
    pub(crate) effect_pipeline: wgpu::RenderPipeline,
    pub(crate) present_pipeline: wgpu::RenderPipeline,
    pub(crate) present_uniform_buffer: wgpu::Buffer,
}

pub(crate) fn create_post_resources(
    device: &wgpu::Device,
    post_shader: &wgpu::ShaderModule,
    swap_format: wgpu::TextureFormat,
) -> PostResources {
    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("post_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            helpers::uniform_layout_entry(2, wgpu::ShaderStages::FRAGMENT),
        ],
    });
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("post_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("post_pl"),
        bind_group_layouts: &[&bgl],
        push_constant_ranges: &[],
    });
    let effect_pipeline =
        helpers::make_post_pipeline(device, &layout, post_shader, "fs_effect", HDR_FORMAT, None);
    let present_pipeline = helpers::make_post_pipeline(
        device,
        &layout,
        post_shader,
        "fs_present",
        swap_format,
        Some(wgpu::BlendState::REPLACE),
    );
    let present_uniform_buffer = create_uniform_buffer(device, "present_uniforms");

    PostResources {
        bgl,
        sampler,
        effect_pipeline,
        present_pipeline,
        present_uniform_buffer,
    }
}

pub(crate) fn create_uniform_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<PostFxUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub(crate) fn source_bind_group(
    device: &wgpu::Device,
    res: &PostResources,
    label: &str,
    source: &wgpu::TextureView,
    uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &res.bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&res.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniforms.as_entire_binding(),
            },
        ],
    })
}

/// One live post pass on the GPU: its own uniform buffer and a bind group
/// sampling the previous stage.
pub(crate) struct PassGpu {
    pub(crate) key: String,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_group: Option<wgpu::BindGroup>,
}

impl PassGpu {
    pub(crate) fn new(device: &wgpu::Device, key: &str) -> Self {
        Self {
            key: key.to_string(),
            uniform_buffer: create_uniform_buffer(device, "post_pass_uniforms"),
            bind_group: None,
        }
    }
}

/// Uniforms for the final tone-map pass; only the resolution matters.
pub(crate) fn present_uniforms(width: u32, height: u32) -> PostFxUniforms {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    PostFxUniforms {
        resolution: [w, h],
        texel_size: [1.0 / w, 1.0 / h],
        center: [0.5, 0.5],
        intensity: 1.0,
        ..bytemuck::Zeroable::zeroed()
    }
}
