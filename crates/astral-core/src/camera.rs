//! Scene camera shared by every motif.
//!
//! The eye sits on +Z looking at the origin; only the vertical field of view
//! and the aspect ratio change at runtime.

use glam::{Mat4, Vec3};

use crate::constants::{CAMERA_Z, DEFAULT_CAMERA_FOV_DEG, MAX_CAMERA_FOV_DEG, MIN_CAMERA_FOV_DEG};
use crate::motion::MotionState;

/// Right-handed perspective camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, CAMERA_Z),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: 1.0,
            fovy_degrees: DEFAULT_CAMERA_FOV_DEG,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl Camera {
    /// Follow the frame's field of view.
    pub fn apply_motion(&mut self, state: &MotionState) {
        if state.camera_fov.is_finite() {
            self.fovy_degrees = state.camera_fov.clamp(MIN_CAMERA_FOV_DEG, MAX_CAMERA_FOV_DEG);
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_degrees.to_radians(), self.aspect, self.znear, self.zfar)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Uniform block for the camera bind group.
    pub fn uniforms(&self) -> CameraUniforms {
        CameraUniforms {
            view_proj: self.view_proj().to_cols_array_2d(),
            eye: self.eye.to_array(),
            aspect: self.aspect,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 3],
    pub aspect: f32,
}
