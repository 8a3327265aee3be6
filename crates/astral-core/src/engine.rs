//! Visual engine lifecycle and per-frame uniform assignment.
//!
//! An engine is split in two: a [`MotionReceiver`] that owns the geometry and
//! uniform values, and an [`EngineLifecycle`] that owns the registration with
//! the orchestrator. The orchestrator only ever holds a weak reference to the
//! receiver, so dropping the lifecycle releases everything.

use glam::{Mat4, Quat, Vec2, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

use crate::aggregator::ema_alpha;
use crate::config::EngineConfig;
use crate::constants::{
    DEFAULT_CAMERA_FOV_DEG, MAX_GPU_LAYERS, POINTER_EASE_TAU_SEC,
};
use crate::error::{Error, Result};
use crate::mesh::{LayerKind, LayeredMesh};
use crate::motion::MotionState;
use crate::orchestrator::{EngineHandle, MotionOrchestrator};

/// Anything that consumes the per-frame broadcast.
pub trait MotionReceiver {
    /// Copy this frame's drivers into local state. Must not allocate or
    /// rebuild geometry.
    fn on_motion_update(&mut self, state: &MotionState) -> anyhow::Result<()>;

    /// Free host-side resources. Called once, on dispose.
    fn release(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built, not receiving broadcasts.
    Constructed,
    /// Registered with an orchestrator.
    Active,
    /// Released; cannot be reactivated.
    Disposed,
}

/// Registration and teardown wrapper around a receiver.
pub struct EngineLifecycle<R: MotionReceiver + 'static> {
    key: String,
    section: Option<String>,
    receiver: Rc<RefCell<R>>,
    state: LifecycleState,
    handle: Option<EngineHandle>,
}

impl<R: MotionReceiver + 'static> EngineLifecycle<R> {
    pub fn new(key: impl Into<String>, section: Option<String>, receiver: R) -> Self {
        Self {
            key: key.into(),
            section,
            receiver: Rc::new(RefCell::new(receiver)),
            state: LifecycleState::Constructed,
            handle: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    pub fn is_disposed(&self) -> bool {
        self.state == LifecycleState::Disposed
    }

    /// Shared access to the receiver for the renderer.
    pub fn receiver(&self) -> &Rc<RefCell<R>> {
        &self.receiver
    }

    /// Start receiving broadcasts from `orchestrator`. Activating twice is a
    /// no-op; activating after dispose, or against a disposed orchestrator,
    /// is an error and leaves the state unchanged.
    pub fn activate(&mut self, orchestrator: &MotionOrchestrator) -> Result<()> {
        match self.state {
            LifecycleState::Disposed => return Err(Error::EngineDisposed(self.key.clone())),
            LifecycleState::Active => return Ok(()),
            LifecycleState::Constructed => {}
        }
        if orchestrator.is_disposed() {
            return Err(Error::OrchestratorDisposed(self.key.clone()));
        }
        let weak = Rc::downgrade(&self.receiver);
        let callback = move |state: &MotionState| -> anyhow::Result<()> {
            let Some(receiver) = weak.upgrade() else {
                return Ok(());
            };
            let mut receiver = receiver
                .try_borrow_mut()
                .map_err(|_| anyhow::anyhow!("engine state is borrowed elsewhere"))?;
            receiver.on_motion_update(state)
        };
        let handle = match &self.section {
            Some(section) => orchestrator.register_engine_in_section(&self.key, section, callback),
            None => orchestrator.register_engine(&self.key, callback),
        };
        self.handle = Some(handle);
        self.state = LifecycleState::Active;
        log::debug!("engine '{}' active", self.key);
        Ok(())
    }

    /// Unregister and release. Safe to call repeatedly; only the first call
    /// does anything. Returns whether this call performed the teardown.
    pub fn dispose(&mut self) -> bool {
        if self.state == LifecycleState::Disposed {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            handle.unregister();
        }
        match self.receiver.try_borrow_mut() {
            Ok(mut receiver) => receiver.release(),
            Err(_) => log::warn!("engine '{}' disposed while borrowed; release skipped", self.key),
        }
        self.state = LifecycleState::Disposed;
        log::debug!("engine '{}' disposed", self.key);
        true
    }
}

impl<R: MotionReceiver + 'static> Drop for EngineLifecycle<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<R: MotionReceiver + 'static> std::fmt::Debug for EngineLifecycle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLifecycle")
            .field("key", &self.key)
            .field("section", &self.section)
            .field("state", &self.state)
            .finish()
    }
}

/// Uniform block shared by every motif shader. Mirrors `EngineUniforms` in
/// `motif.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EngineUniforms {
    pub model: [[f32; 4]; 4],
    pub time: f32,
    pub intensity: f32,
    pub breath_phase: f32,
    pub breath_strength: f32,
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
    pub scroll: f32,
    pub blessing: f32,
    pub parallax_strength: f32,
    /// Eased pointer in \[-1, 1\]² (x right, y up).
    pub pointer: [f32; 2],
    pub rotation_sync: f32,
    pub camera_fov: f32,
    pub particle_size: f32,
    /// Bit `n` set when layer `n` is a billboard particle swarm.
    pub particle_mask: u32,
}

impl Default for EngineUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            time: 0.0,
            intensity: 1.0,
            breath_phase: 0.0,
            breath_strength: 0.0,
            bass: 0.0,
            mid: 0.0,
            high: 0.0,
            scroll: 0.0,
            blessing: 0.0,
            parallax_strength: 0.0,
            pointer: [0.0; 2],
            rotation_sync: 0.0,
            camera_fov: DEFAULT_CAMERA_FOV_DEG,
            particle_size: 0.0,
            particle_mask: 0,
        }
    }
}

/// One motif: its mesh, its uniform values and its transform.
#[derive(Debug)]
pub struct VisualEngine {
    config: EngineConfig,
    mesh: LayeredMesh,
    uniforms: EngineUniforms,
    position: Vec3,
    scale: Vec3,
    pointer_target: Vec2,
    pointer: Vec2,
    last_time: Option<f32>,
    released: bool,
}

impl VisualEngine {
    /// Build the mesh once. Malformed layers fail here, before anything is
    /// rendered.
    pub fn construct(config: EngineConfig) -> Result<Self> {
        if config.layers.len() > MAX_GPU_LAYERS {
            return Err(Error::TooManyLayers {
                count: config.layers.len(),
                max: MAX_GPU_LAYERS,
            });
        }
        let mesh = LayeredMesh::build(&config.layers)?;
        let particle_mask = config
            .layers
            .iter()
            .enumerate()
            .filter(|(_, l)| matches!(l.kind, LayerKind::Particles { .. }))
            .fold(0u32, |mask, (i, _)| mask | (1 << i));
        let uniforms = EngineUniforms {
            intensity: config.intensity,
            parallax_strength: config.parallax_strength,
            particle_size: config.particle_size,
            particle_mask,
            ..EngineUniforms::default()
        };
        log::info!(
            "engine '{}' constructed: {} layers, {} vertices ({:?})",
            config.key,
            mesh.layers().len(),
            mesh.vertex_count(),
            config.quality
        );
        Ok(Self {
            config,
            mesh,
            uniforms,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            pointer_target: Vec2::ZERO,
            pointer: Vec2::ZERO,
            last_time: None,
            released: false,
        })
    }

    /// Wrap in a lifecycle keyed and gated by the config.
    pub fn into_lifecycle(self) -> EngineLifecycle<Self> {
        let key = self.config.key.clone();
        let section = self.config.section.clone();
        EngineLifecycle::new(key, section, self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mesh(&self) -> &LayeredMesh {
        &self.mesh
    }

    pub fn uniforms(&self) -> &EngineUniforms {
        &self.uniforms
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn set_position(&mut self, position: Vec3) {
        if self.released {
            log::warn!("set_position on disposed engine '{}' ignored", self.config.key);
            return;
        }
        self.position = position;
        self.update_model();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        if self.released {
            log::warn!("set_scale on disposed engine '{}' ignored", self.config.key);
            return;
        }
        self.scale = scale;
        self.update_model();
    }

    /// Pointer in normalized viewport coordinates, origin top-left.
    pub fn set_pointer(&mut self, uv: [f32; 2]) {
        let uv = Vec2::from_array(uv).clamp(Vec2::ZERO, Vec2::ONE);
        self.pointer_target = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    }

    /// Current parallax offset applied by the shader.
    pub fn parallax_offset(&self) -> Vec2 {
        self.pointer * self.config.parallax_strength
    }

    fn update_model(&mut self) {
        self.uniforms.model =
            Mat4::from_scale_rotation_translation(self.scale, Quat::IDENTITY, self.position)
                .to_cols_array_2d();
    }
}

impl MotionReceiver for VisualEngine {
    fn on_motion_update(&mut self, state: &MotionState) -> anyhow::Result<()> {
        if self.released {
            return Ok(());
        }
        let dt = self.last_time.map_or(0.0, |t| (state.time - t).max(0.0));
        self.last_time = Some(state.time);
        let alpha = ema_alpha(dt, POINTER_EASE_TAU_SEC);
        self.pointer += (self.pointer_target - self.pointer) * alpha;

        let u = &mut self.uniforms;
        u.time = state.time;
        u.breath_phase = state.breath_phase;
        u.breath_strength = state.breath_strength;
        u.bass = state.bass_motion;
        u.mid = state.mid_motion;
        u.high = state.high_motion;
        u.scroll = state.scroll_progress;
        u.blessing = state.blessing_wave_progress;
        u.rotation_sync = state.rotation_sync;
        u.camera_fov = state.camera_fov;
        u.pointer = self.pointer.to_array();
        Ok(())
    }

    fn release(&mut self) {
        self.mesh.release();
        self.released = true;
    }
}
