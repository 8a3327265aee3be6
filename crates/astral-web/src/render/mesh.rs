use super::helpers::{self, ADDITIVE, HDR_FORMAT};
use astral_core::{EngineUniforms, GpuVertex, VisualEngine};
use wgpu::util::DeviceExt;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
    2 => Float32x4,
    3 => Float32x4,
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Motif pipelines: one back-face culled, one for two-sided petals and
/// ribbons. Both draw into the HDR scene target.
pub(crate) struct MeshPipelines {
    pub(crate) camera_bgl: wgpu::BindGroupLayout,
    pub(crate) engine_bgl: wgpu::BindGroupLayout,
    pub(crate) culled: wgpu::RenderPipeline,
    pub(crate) two_sided: wgpu::RenderPipeline,
}

pub(crate) fn create_mesh_pipelines(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
) -> MeshPipelines {
    let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bgl"),
        entries: &[helpers::uniform_layout_entry(0, wgpu::ShaderStages::VERTEX)],
    });
    let engine_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("engine_bgl"),
        entries: &[helpers::uniform_layout_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        )],
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("motif_pl"),
        bind_group_layouts: &[&camera_bgl, &engine_bgl],
        push_constant_ranges: &[],
    });
    let make = |label: &str, cull_mode: Option<wgpu::Face>| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(ADDITIVE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            cache: None,
            multiview: None,
        })
    };
    let culled = make("motif_culled", Some(wgpu::Face::Back));
    let two_sided = make("motif_two_sided", None);
    MeshPipelines {
        camera_bgl,
        engine_bgl,
        culled,
        two_sided,
    }
}

/// GPU copy of one engine's mesh plus its uniform buffer. Dropped when the
/// engine is disposed.
pub(crate) struct MeshBuffers {
    pub(crate) key: String,
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
    pub(crate) two_sided: bool,
}

impl MeshBuffers {
    pub(crate) fn upload(
        device: &wgpu::Device,
        engine_bgl: &wgpu::BindGroupLayout,
        engine: &VisualEngine,
    ) -> anyhow::Result<Self> {
        let key = engine.config().key().to_string();
        let mesh = engine.mesh();
        if mesh.is_empty() {
            anyhow::bail!("engine '{}' has no geometry", key);
        }
        let vertices = mesh.gpu_vertices()?;
        let index_count = u32::try_from(mesh.index_count())?;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("motif_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("motif_indices"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("engine_uniforms"),
            contents: bytemuck::bytes_of(engine.uniforms()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("engine_bg"),
            layout: engine_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        log::info!(
            "[gpu] uploaded '{}': {} vertices, {} indices",
            key,
            vertices.len(),
            index_count
        );
        Ok(Self {
            key,
            vertex_buffer,
            index_buffer,
            index_count,
            uniform_buffer,
            bind_group,
            two_sided: engine.config().is_two_sided(),
        })
    }

    pub(crate) fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &EngineUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }
}
