use super::chain::Slot;
use super::helpers::{self, HDR_FORMAT};

/// Offscreen HDR targets: the scene color plus two ping-pong buffers for the
/// post chain, all at full resolution.
pub(crate) struct RenderTargets {
    #[allow(dead_code)]
    pub(crate) scene_tex: wgpu::Texture,
    pub(crate) scene_view: wgpu::TextureView,
    #[allow(dead_code)]
    pub(crate) ping_tex: wgpu::Texture,
    pub(crate) ping_view: wgpu::TextureView,
    #[allow(dead_code)]
    pub(crate) pong_tex: wgpu::Texture,
    pub(crate) pong_view: wgpu::TextureView,
}

impl RenderTargets {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let (scene_tex, scene_view) =
            helpers::create_color_texture(device, "scene_tex", width, height, HDR_FORMAT, usage);
        let (ping_tex, ping_view) =
            helpers::create_color_texture(device, "post_ping", width, height, HDR_FORMAT, usage);
        let (pong_tex, pong_view) =
            helpers::create_color_texture(device, "post_pong", width, height, HDR_FORMAT, usage);
        Self {
            scene_tex,
            scene_view,
            ping_tex,
            ping_view,
            pong_tex,
            pong_view,
        }
    }

    pub(crate) fn recreate(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        *self = Self::new(device, width, height);
    }

    pub(crate) fn view(&self, slot: Slot) -> &wgpu::TextureView {
        match slot {
            Slot::Scene => &self.scene_view,
            Slot::Ping => &self.ping_view,
            Slot::Pong => &self.pong_view,
        }
    }
}
