//! Collider & Geometry Model
//!
//! A collider is a body plus zero or more local AABBs. Geometry is derived
//! once, at actor construction, from either the actor's mesh vertices or a
//! collision mask. Colliders are never persisted.

use tracing::{debug, warn};

use super::body::{Body, BodyMode};
use super::bounds::Bounds;
use super::mask::CollisionMask;
use crate::render::mesh::VertexSource;
use crate::scene::actor::ActorId;
use crate::scene::transform::Transform;

/// How `geometry` is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColliderShape {
    /// Never collides
    #[default]
    Empty,
    /// Single box
    Box,
    /// One box per mask rectangle
    Boxes,
}

/// Where a collider takes its position from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Anchor {
    /// Not linked to a page yet
    #[default]
    Unbound,
    /// Follows the transform of an actor in the same page
    Actor(ActorId),
    /// Standalone collider carrying its own transform
    Owned(Transform),
}

#[derive(Debug, Clone, Default)]
pub struct Collider {
    pub body: Body,
    geometry: Vec<Bounds>,
    shape: ColliderShape,
    anchor: Anchor,
}

impl Collider {
    /// Empty collider, collision disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collider from explicit local boxes.
    pub fn from_bounds(bounds: Vec<Bounds>) -> Self {
        let mut collider = Self::new();
        collider.set_geometry(bounds);
        collider
    }

    /// Single box from the symmetric extent of a 2D vertex buffer.
    ///
    /// The box spans `-max|x|..max|x|` by `-max|y|..max|y|` around the
    /// transform, rounded up to whole units and centred. 3D layouts, empty
    /// buffers and malformed strides leave the collider empty.
    pub fn from_vertices<S: VertexSource + ?Sized>(source: &S) -> Self {
        let mut collider = Self::new();
        let readback = source.read_vertices();

        if readback.position_components != 2 {
            warn!(
                components = readback.position_components,
                "cannot derive collider bounds from a 3D mesh, collider left empty"
            );
            return collider;
        }
        if readback.stride < readback.position_components {
            warn!(
                stride = readback.stride,
                components = readback.position_components,
                "vertex stride shorter than position, collider left empty"
            );
            return collider;
        }
        if readback.vertex_count() == 0 {
            warn!("mesh has no vertices, collider left empty");
            return collider;
        }

        let (mut max_x, mut max_y) = (0.0f32, 0.0f32);
        for p in readback.positions() {
            max_x = max_x.max(p[0].abs());
            max_y = max_y.max(p[1].abs());
        }

        let width = (max_x * 2.0).ceil() as u32;
        let height = (max_y * 2.0).ceil() as u32;
        let bounds = Bounds::new(-(width as f32) / 2.0, -(height as f32) / 2.0, width, height);
        debug!(?bounds, "derived collider bounds from vertices");
        collider.set_geometry(vec![bounds]);
        collider
    }

    /// One box per rectangle of the mask decomposition.
    pub fn from_mask(mask: &CollisionMask, max_rects: usize, pixel_scale: u32) -> Self {
        let decomposition = mask.decompose(max_rects);
        let bounds = mask.rects_to_bounds(&decomposition.rects, pixel_scale);
        let mut collider = Self::new();
        collider.set_geometry(bounds);
        collider.shape = if collider.geometry.is_empty() {
            ColliderShape::Empty
        } else {
            ColliderShape::Boxes
        };
        collider
    }

    /// Builder-style mode setter
    pub fn with_mode(mut self, mode: BodyMode) -> Self {
        self.body.mode = mode;
        self
    }

    /// Replace the geometry, picking the shape from the box count.
    pub fn set_geometry(&mut self, bounds: Vec<Bounds>) {
        self.shape = match bounds.len() {
            0 => ColliderShape::Empty,
            1 => ColliderShape::Box,
            _ => ColliderShape::Boxes,
        };
        self.geometry = bounds;
    }

    /// Release the geometry. The collider becomes collision-transparent.
    pub fn clear(&mut self) {
        self.geometry = Vec::new();
        self.shape = ColliderShape::Empty;
    }

    pub fn geometry(&self) -> &[Bounds] {
        &self.geometry
    }

    pub fn shape(&self) -> ColliderShape {
        self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.shape == ColliderShape::Empty
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn anchor_mut(&mut self) -> &mut Anchor {
        &mut self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.anchor = anchor;
    }

    /// Split borrow for standalone colliders moving their own transform.
    pub fn body_and_anchor_mut(&mut self) -> (&mut Body, &mut Anchor) {
        (&mut self.body, &mut self.anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mesh::{MeshData, VertexLayout, VertexReadback};

    struct RawVertices {
        data: Vec<f32>,
        stride: usize,
        position_components: usize,
    }

    impl VertexSource for RawVertices {
        fn read_vertices(&self) -> VertexReadback<'_> {
            VertexReadback {
                data: &self.data,
                stride: self.stride,
                position_components: self.position_components,
            }
        }
    }

    #[test]
    fn test_bounds_from_2d_quad() {
        let c = Collider::from_vertices(&MeshData::quad_2d(5.0, 2.5));
        assert_eq!(c.shape(), ColliderShape::Box);
        assert_eq!(c.geometry(), &[Bounds::new(-5.0, -2.5, 10, 5)]);
    }

    #[test]
    fn test_bounds_use_max_absolute_extent() {
        let mesh = MeshData::new(VertexLayout::V2, vec![1.0, -7.0, -3.0, 2.0, 0.5, 0.5], vec![]);
        let c = Collider::from_vertices(&mesh);
        assert_eq!(c.geometry(), &[Bounds::new(-3.0, -7.0, 6, 14)]);
    }

    #[test]
    fn test_3d_mesh_rejected() {
        let c = Collider::from_vertices(&MeshData::quad_3d(5.0, 5.0));
        assert!(c.is_empty());
        assert!(c.geometry().is_empty());
    }

    #[test]
    fn test_empty_vertex_buffer() {
        let mesh = MeshData::new(VertexLayout::V2Uv2, Vec::new(), Vec::new());
        assert!(Collider::from_vertices(&mesh).is_empty());
    }

    #[test]
    fn test_stride_shorter_than_position() {
        let source = RawVertices { data: vec![1.0, 2.0, 3.0, 4.0], stride: 1, position_components: 2 };
        let c = Collider::from_vertices(&source);
        assert!(c.is_empty());
        assert!(c.geometry().is_empty());
    }

    #[test]
    fn test_fractional_extent_is_centred() {
        let mesh = MeshData::new(VertexLayout::V2, vec![0.75, 0.25, -0.75, -0.25], vec![]);
        let c = Collider::from_vertices(&mesh);
        // 1.5 x 0.5 rounds up to 2 x 1, centred on the origin
        assert_eq!(c.geometry(), &[Bounds::new(-1.0, -0.5, 2, 1)]);
    }

    #[test]
    fn test_shape_follows_box_count() {
        let mut c = Collider::from_bounds(vec![Bounds::new(0.0, 0.0, 1, 1)]);
        assert_eq!(c.shape(), ColliderShape::Box);
        c.set_geometry(vec![Bounds::new(0.0, 0.0, 1, 1), Bounds::new(2.0, 0.0, 1, 1)]);
        assert_eq!(c.shape(), ColliderShape::Boxes);
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn test_from_mask() {
        let mask = CollisionMask::from_raw(3, 2, vec![255, 0, 255, 255, 0, 255]).unwrap();
        let c = Collider::from_mask(&mask, 128, 1);
        assert_eq!(c.shape(), ColliderShape::Boxes);
        assert_eq!(c.geometry().len(), 2);
    }
}
