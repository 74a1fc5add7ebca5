//! Page camera
//!
//! Orthographic by default: `scale` pixels per world unit, centered on
//! the camera position, depth mapped to `0..1` between `near` and `far`.

use serde::{Deserialize, Serialize};

use super::transform::Transform;
use crate::math::{mat4_identity, mat4_translation, Mat4};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    Orthographic,
    Perspective,
}

impl CameraMode {
    pub fn as_u32(self) -> u32 {
        match self {
            CameraMode::Orthographic => 0,
            CameraMode::Perspective => 1,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(CameraMode::Orthographic),
            1 => Some(CameraMode::Perspective),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub mode: CameraMode,
    pub transform: Transform,
    pub near: f32,
    pub far: f32,
    /// Zoom for orthographic, vertical field of view (degrees) for perspective
    pub scale: f32,
}

impl Camera {
    pub fn orthographic(near: f32, far: f32, scale: f32) -> Self {
        Self {
            mode: CameraMode::Orthographic,
            transform: Transform::IDENTITY,
            near,
            far,
            scale,
        }
    }

    pub fn perspective(near: f32, far: f32, fov_degrees: f32) -> Self {
        Self {
            mode: CameraMode::Perspective,
            transform: Transform::IDENTITY,
            near,
            far,
            scale: fov_degrees,
        }
    }

    /// Projection matrix for a `width` x `height` framebuffer.
    pub fn projection(&self, width: f32, height: f32) -> Mat4 {
        if width <= 0.0 || height <= 0.0 || self.far == self.near {
            return mat4_identity();
        }
        let depth = 1.0 / (self.far - self.near);

        match self.mode {
            CameraMode::Orthographic => {
                let sx = 2.0 * self.scale / width;
                let sy = 2.0 * self.scale / height;
                [
                    [sx, 0.0, 0.0, 0.0],
                    [0.0, sy, 0.0, 0.0],
                    [0.0, 0.0, depth, -self.near * depth],
                    [0.0, 0.0, 0.0, 1.0],
                ]
            }
            CameraMode::Perspective => {
                let f = 1.0 / (self.scale.to_radians() * 0.5).tan();
                let aspect = width / height;
                [
                    [f / aspect, 0.0, 0.0, 0.0],
                    [0.0, f, 0.0, 0.0],
                    [0.0, 0.0, self.far * depth, -self.far * self.near * depth],
                    [0.0, 0.0, 1.0, 0.0],
                ]
            }
        }
    }

    /// World-to-camera matrix: translation by the negated camera position.
    pub fn view(&self) -> Mat4 {
        mat4_translation(-self.transform.position)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::orthographic(-1.0, 1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{mat4_mul, mat4_transform_point, Vec3};

    #[test]
    fn test_ortho_maps_screen_edge() {
        let cam = Camera::orthographic(-1.0, 1.0, 1.0);
        let p = mat4_transform_point(&cam.projection(800.0, 600.0), Vec3::new(400.0, -300.0, 0.0));
        assert!((p.x - 1.0).abs() < 0.0001);
        assert!((p.y + 1.0).abs() < 0.0001);
        assert!((p.z - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_view_centers_camera() {
        let mut cam = Camera::default();
        cam.transform.position = Vec3::new(100.0, 50.0, 0.0);
        let vp = mat4_mul(&cam.projection(200.0, 100.0), &cam.view());
        let p = mat4_transform_point(&vp, Vec3::new(100.0, 50.0, 0.0));
        assert!(p.x.abs() < 0.0001);
        assert!(p.y.abs() < 0.0001);
    }

    #[test]
    fn test_degenerate_framebuffer() {
        assert_eq!(Camera::default().projection(0.0, 600.0), mat4_identity());
    }
}
