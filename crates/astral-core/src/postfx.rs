//! Screen-space post passes driven by the same broadcast as the motifs.

use crate::constants::FALLBACK_RESOLUTION;
use crate::engine::{EngineLifecycle, MotionReceiver};
use crate::motion::MotionState;

/// Effect selected by a pass, with its own parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostFxKind {
    /// Radial RGB split growing towards the screen edge.
    ChromaticAberration { strength: f32 },
    /// Soft tinted glow around bright areas; `radius` in pixels.
    Halation { radius: f32, tint: [f32; 3] },
    /// Lift everything above `threshold` by `boost`.
    BloomBoost { threshold: f32, boost: f32 },
}

impl PostFxKind {
    /// Selector read by `post.wgsl`.
    pub fn mode(&self) -> u32 {
        match self {
            PostFxKind::ChromaticAberration { .. } => 0,
            PostFxKind::Halation { .. } => 1,
            PostFxKind::BloomBoost { .. } => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostFxKind::ChromaticAberration { .. } => "chromatic_aberration",
            PostFxKind::Halation { .. } => "halation",
            PostFxKind::BloomBoost { .. } => "bloom_boost",
        }
    }

    fn params(&self) -> [f32; 4] {
        match *self {
            PostFxKind::ChromaticAberration { strength } => [strength, 0.0, 0.0, 0.0],
            PostFxKind::Halation { radius, tint } => [radius, tint[0], tint[1], tint[2]],
            PostFxKind::BloomBoost { threshold, boost } => [threshold, boost, 0.0, 0.0],
        }
    }
}

/// Mirrors `PostUniforms` in `post.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostFxUniforms {
    pub resolution: [f32; 2],
    pub texel_size: [f32; 2],
    pub center: [f32; 2],
    pub time: f32,
    pub intensity: f32,
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
    pub scroll: f32,
    pub blessing: f32,
    pub breath: f32,
    pub mode: u32,
    pub _pad: f32,
    pub params: [f32; 4],
}

/// A full-screen pass. Same lifecycle as a motif engine plus a resolution
/// that must track the render target.
#[derive(Clone, Debug)]
pub struct PostFxPass {
    key: String,
    kind: PostFxKind,
    uniforms: PostFxUniforms,
    released: bool,
}

impl PostFxPass {
    pub fn new(key: impl Into<String>, kind: PostFxKind) -> Self {
        let mut pass = Self {
            key: key.into(),
            kind,
            uniforms: PostFxUniforms {
                resolution: [0.0; 2],
                texel_size: [0.0; 2],
                center: [0.5, 0.5],
                time: 0.0,
                intensity: 1.0,
                bass: 0.0,
                mid: 0.0,
                high: 0.0,
                scroll: 0.0,
                blessing: 0.0,
                breath: 0.0,
                mode: kind.mode(),
                _pad: 0.0,
                params: kind.params(),
            },
            released: false,
        };
        pass.set_resolution(FALLBACK_RESOLUTION[0], FALLBACK_RESOLUTION[1]);
        pass
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.uniforms.intensity = intensity.max(0.0);
        self
    }

    pub fn into_lifecycle(self) -> EngineLifecycle<Self> {
        let key = self.key.clone();
        EngineLifecycle::new(key, None, self)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> PostFxKind {
        self.kind
    }

    pub fn uniforms(&self) -> &PostFxUniforms {
        &self.uniforms
    }

    pub fn resolution(&self) -> [u32; 2] {
        [
            self.uniforms.resolution[0] as u32,
            self.uniforms.resolution[1] as u32,
        ]
    }

    /// Record the render target size. A zero dimension (collapsed canvas)
    /// falls back to the minimum so texel sizes stay finite.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        let w = if width == 0 { FALLBACK_RESOLUTION[0] } else { width };
        let h = if height == 0 { FALLBACK_RESOLUTION[1] } else { height };
        if w != width || h != height {
            log::debug!("post pass '{}': resolution {width}x{height} replaced by {w}x{h}", self.key);
        }
        self.uniforms.resolution = [w as f32, h as f32];
        self.uniforms.texel_size = [1.0 / w as f32, 1.0 / h as f32];
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl MotionReceiver for PostFxPass {
    fn on_motion_update(&mut self, state: &MotionState) -> anyhow::Result<()> {
        if self.released {
            return Ok(());
        }
        let u = &mut self.uniforms;
        u.time = state.time;
        u.bass = state.bass_motion;
        u.mid = state.mid_motion;
        u.high = state.high_motion;
        u.scroll = state.scroll_progress;
        u.blessing = state.blessing_wave_progress;
        u.breath = state.breath_strength;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}
