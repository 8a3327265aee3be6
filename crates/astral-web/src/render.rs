mod chain;
mod helpers;
mod mesh;
mod post;
mod targets;

use astral_core::{Camera, CameraUniforms, EngineLifecycle, PostFxPass, VisualEngine};
use web_sys as web;
use wgpu::util::DeviceExt;

use mesh::{MeshBuffers, MeshPipelines};
use post::{PassGpu, PostResources};
use targets::RenderTargets;

pub struct GpuState<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    targets: RenderTargets,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    pipelines: MeshPipelines,
    meshes: Vec<MeshBuffers>,
    // keys whose upload failed; not retried every frame
    rejected: Vec<String>,

    post: PostResources,
    chain: Vec<PassGpu>,
    present_bind_group: wgpu::BindGroup,

    width: u32,
    height: u32,
    clear_color: wgpu::Color,
}

impl<'a> GpuState<'a> {
    pub async fn new(canvas: &'a web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // default limits; older WebGPU implementations reject unknown fields
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let targets = RenderTargets::new(&device, width, height);

        let motif_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("motif_shader"),
            source: wgpu::ShaderSource::Wgsl(astral_core::MOTIF_WGSL.into()),
        });
        let pipelines = mesh::create_mesh_pipelines(&device, &motif_shader);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_uniforms"),
            contents: bytemuck::bytes_of(&Camera::default().uniforms()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bg"),
            layout: &pipelines.camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(astral_core::POST_WGSL.into()),
        });
        let post = post::create_post_resources(&device, &post_shader, format);
        let present_bind_group = post::source_bind_group(
            &device,
            &post,
            "present_bg",
            &targets.scene_view,
            &post.present_uniform_buffer,
        );

        log::info!("[gpu] ready {}x{} {:?}", width, height, format);
        Ok(Self {
            surface,
            device,
            queue,
            config,
            targets,
            camera_buffer,
            camera_bind_group,
            pipelines,
            meshes: Vec::new(),
            rejected: Vec::new(),
            post,
            chain: Vec::new(),
            present_bind_group,
            width,
            height,
            clear_color: wgpu::Color {
                r: 0.004,
                g: 0.003,
                b: 0.012,
                a: 1.0,
            },
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.targets.recreate(&self.device, width, height);
            self.rebuild_post_bind_groups();
            log::debug!("[gpu] resized to {}x{}", width, height);
        }
    }

    /// Upload meshes for new engines and drop buffers of disposed ones.
    fn sync_meshes(&mut self, engines: &[EngineLifecycle<VisualEngine>]) {
        self.meshes.retain(|m| {
            engines
                .iter()
                .any(|e| e.key() == m.key && !e.is_disposed())
        });
        for lifecycle in engines {
            if lifecycle.is_disposed()
                || self.meshes.iter().any(|m| m.key == lifecycle.key())
                || self.rejected.iter().any(|k| k == lifecycle.key())
            {
                continue;
            }
            let Ok(engine) = lifecycle.receiver().try_borrow() else {
                continue;
            };
            match MeshBuffers::upload(&self.device, &self.pipelines.engine_bgl, &*engine) {
                Ok(buffers) => self.meshes.push(buffers),
                Err(e) => {
                    log::error!("[gpu] mesh upload failed for '{}': {:?}", lifecycle.key(), e);
                    self.rejected.push(lifecycle.key().to_string());
                }
            }
        }
    }

    /// Keep one GPU slot per live post pass, in order.
    fn sync_chain(&mut self, passes: &[EngineLifecycle<PostFxPass>]) {
        let live: Vec<&str> = passes
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.key())
            .collect();
        let unchanged = live.len() == self.chain.len()
            && live.iter().zip(&self.chain).all(|(k, g)| *k == g.key);
        if unchanged {
            return;
        }
        let mut old = std::mem::take(&mut self.chain);
        for key in live {
            match old.iter().position(|g| g.key == key) {
                Some(i) => self.chain.push(old.swap_remove(i)),
                None => self.chain.push(PassGpu::new(&self.device, key)),
            }
        }
        log::debug!("[gpu] post chain now {} passes", self.chain.len());
        self.rebuild_post_bind_groups();
    }

    fn rebuild_post_bind_groups(&mut self) {
        for (i, pass) in self.chain.iter_mut().enumerate() {
            let (src, _) = chain::chain_slots(i);
            pass.bind_group = Some(post::source_bind_group(
                &self.device,
                &self.post,
                "post_pass_bg",
                self.targets.view(src),
                &pass.uniform_buffer,
            ));
        }
        let out = chain::chain_output(self.chain.len());
        self.present_bind_group = post::source_bind_group(
            &self.device,
            &self.post,
            "present_bg",
            self.targets.view(out),
            &self.post.present_uniform_buffer,
        );
    }

    /// Draw every visible engine into the HDR target, run the post chain and
    /// present. `is_visible` decides per engine (section gating).
    pub fn render(
        &mut self,
        camera: &Camera,
        engines: &[EngineLifecycle<VisualEngine>],
        passes: &[EngineLifecycle<PostFxPass>],
        is_visible: impl Fn(&VisualEngine) -> bool,
    ) -> Result<(), wgpu::SurfaceError> {
        self.sync_meshes(engines);
        self.sync_chain(passes);

        let cam: CameraUniforms = camera.uniforms();
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&cam));

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.scene_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            for lifecycle in engines.iter().filter(|e| e.is_active()) {
                let Some(buffers) = self.meshes.iter().find(|m| m.key == lifecycle.key()) else {
                    continue;
                };
                let Ok(engine) = lifecycle.receiver().try_borrow() else {
                    continue;
                };
                if !is_visible(&*engine) {
                    continue;
                }
                buffers.write_uniforms(&self.queue, engine.uniforms());
                let pipeline = if buffers.two_sided {
                    &self.pipelines.two_sided
                } else {
                    &self.pipelines.culled
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(1, &buffers.bind_group, &[]);
                rpass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
                rpass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..buffers.index_count, 0, 0..1);
            }
        }

        let live = passes.iter().filter(|p| p.is_active());
        for (i, (pass, gpu)) in live.zip(&self.chain).enumerate() {
            let Some(bind_group) = gpu.bind_group.as_ref() else {
                continue;
            };
            if let Ok(p) = pass.receiver().try_borrow() {
                self.queue
                    .write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(p.uniforms()));
            }
            let (_, dst) = chain::chain_slots(i);
            helpers::blit(
                &mut encoder,
                pass.key(),
                self.targets.view(dst),
                wgpu::Color::BLACK,
                &self.post.effect_pipeline,
                bind_group,
            );
        }

        let present = post::present_uniforms(self.width, self.height);
        self.queue.write_buffer(
            &self.post.present_uniform_buffer,
            0,
            bytemuck::bytes_of(&present),
        );
        helpers::blit(
            &mut encoder,
            "present",
            &view,
            self.clear_color,
            &self.post.present_pipeline,
            &self.present_bind_group,
        );

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Reconfigure after a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}
