//! Actor Transform
//!
//! Position, scale and rotation are the source of truth. `matrix` is a
//! cache rebuilt by [`Transform::update_matrix`] before drawing; physics
//! only ever reads `position`.

use serde::{Deserialize, Serialize};

use crate::math::{mat4_from_trs, mat4_identity, Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
    /// Derived model matrix, never persisted
    #[serde(skip, default = "mat4_identity")]
    matrix: Mat4,
}

impl Transform {
    /// Origin, unit scale, no rotation
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        scale: Vec3::ONE,
        rotation: Quat::IDENTITY,
        matrix: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_position(position: Vec3) -> Self {
        let mut transform = Self { position, ..Self::IDENTITY };
        transform.update_matrix();
        transform
    }

    pub fn new(position: Vec3, scale: Vec3, rotation: Quat) -> Self {
        let mut transform = Self { position, scale, rotation, matrix: mat4_identity() };
        transform.update_matrix();
        transform
    }

    /// Translate by an offset
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Recompute the cached model matrix from position, rotation and scale.
    pub fn update_matrix(&mut self) -> &Mat4 {
        self.matrix = mat4_from_trs(self.position, self.rotation, self.scale);
        &self.matrix
    }

    /// Last computed model matrix (may lag behind `position`).
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_cache() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        t.translate(Vec3::new(4.0, 0.0, 0.0));

        // Stale until recomputed
        assert!((t.matrix()[0][3] - 1.0).abs() < 0.001);
        t.update_matrix();
        assert!((t.matrix()[0][3] - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_matrix_not_serialized() {
        let t = Transform::from_position(Vec3::new(7.0, 0.0, 0.0));
        let text = ron::to_string(&t).unwrap();
        assert!(!text.contains("matrix"));

        let back: Transform = ron::from_str(&text).unwrap();
        assert_eq!(back.position, t.position);
        assert_eq!(back.matrix(), &mat4_identity());
    }
}
