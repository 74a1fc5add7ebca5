//! CPU-side mesh data
//!
//! Vertices are interleaved `f32`: position first, then uv when the layout
//! has one. The GPU upload lives behind [`super::Renderer`]; the engine core
//! only needs to read positions back to derive collider bounds.

use serde::{Deserialize, Serialize};

/// Vertex attribute layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexLayout {
    /// position: vec2
    V2,
    /// position: vec3
    V3,
    /// position: vec2, uv: vec2
    V2Uv2,
    /// position: vec3, uv: vec2
    V3Uv2,
}

impl VertexLayout {
    pub fn position_components(self) -> usize {
        match self {
            VertexLayout::V2 | VertexLayout::V2Uv2 => 2,
            VertexLayout::V3 | VertexLayout::V3Uv2 => 3,
        }
    }

    /// Floats per vertex
    pub fn stride(self) -> usize {
        match self {
            VertexLayout::V2 => 2,
            VertexLayout::V3 => 3,
            VertexLayout::V2Uv2 => 4,
            VertexLayout::V3Uv2 => 5,
        }
    }

    pub fn is_2d(self) -> bool {
        self.position_components() == 2
    }
}

/// Flat view of a vertex buffer, as returned by a read-back.
#[derive(Debug, Clone, Copy)]
pub struct VertexReadback<'a> {
    pub data: &'a [f32],
    /// Floats per vertex
    pub stride: usize,
    /// Leading floats of each vertex that hold the position
    pub position_components: usize,
}

impl<'a> VertexReadback<'a> {
    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// Iterate over the position slice of each complete vertex.
    pub fn positions(&self) -> impl Iterator<Item = &'a [f32]> + '_ {
        let stride = self.stride.max(1);
        let components = self.position_components.min(stride);
        self.data.chunks_exact(stride).map(move |v| &v[..components])
    }
}

/// Anything that can hand back its vertex buffer for reading.
pub trait VertexSource {
    fn read_vertices(&self) -> VertexReadback<'_>;
}

/// Interleaved vertex data with triangle indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub layout: VertexLayout,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(layout: VertexLayout, vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self { layout, vertices, indices }
    }

    /// Screen-facing quad spanning `-half_width..half_width` by
    /// `-half_height..half_height`, with uvs.
    pub fn quad_2d(half_width: f32, half_height: f32) -> Self {
        #[rustfmt::skip]
        let vertices = vec![
            -half_width,  half_height, 0.0, 1.0,
            -half_width, -half_height, 0.0, 0.0,
             half_width, -half_height, 1.0, 0.0,
             half_width,  half_height, 1.0, 1.0,
        ];
        Self::new(VertexLayout::V2Uv2, vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// Ground quad lying in the XZ plane, with uvs.
    pub fn quad_3d(half_width: f32, half_depth: f32) -> Self {
        #[rustfmt::skip]
        let vertices = vec![
            -half_width, 0.0,  half_depth, 0.0, 1.0,
            -half_width, 0.0, -half_depth, 0.0, 0.0,
             half_width, 0.0, -half_depth, 1.0, 0.0,
             half_width, 0.0,  half_depth, 1.0, 1.0,
        ];
        Self::new(VertexLayout::V3Uv2, vertices, vec![0, 1, 2, 0, 2, 3])
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }
}

impl VertexSource for MeshData {
    fn read_vertices(&self) -> VertexReadback<'_> {
        VertexReadback {
            data: &self.vertices,
            stride: self.layout.stride(),
            position_components: self.layout.position_components(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_layouts() {
        let q2 = MeshData::quad_2d(5.0, 3.0);
        assert_eq!(q2.vertex_count(), 4);
        assert!(q2.layout.is_2d());

        let q3 = MeshData::quad_3d(5.0, 3.0);
        assert_eq!(q3.vertex_count(), 4);
        assert!(!q3.layout.is_2d());
    }

    #[test]
    fn test_readback_positions_skip_uvs() {
        let q = MeshData::quad_2d(2.0, 1.0);
        let rb = q.read_vertices();
        let first: Vec<&[f32]> = rb.positions().take(2).collect();
        assert_eq!(first[0], &[-2.0, 1.0]);
        assert_eq!(first[1], &[-2.0, -1.0]);
    }
}
