//! Rendering boundary
//!
//! The engine core never talks to a graphics API. Actors carry CPU mesh data
//! plus opaque shader/texture handles, and [`crate::scene::page::Page::draw`]
//! hands them to a [`Renderer`] in layer order.

pub mod mesh;

pub use mesh::{MeshData, VertexLayout, VertexReadback, VertexSource};

use serde::{Deserialize, Serialize};

use crate::math::Mat4;

/// Opaque shader program id, owned by the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderHandle(pub u32);

/// Opaque texture id, owned by the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

/// Draw backend.
pub trait Renderer {
    /// Draw `mesh` with the given model matrix.
    fn draw_mesh(
        &mut self,
        mesh: &MeshData,
        shader: ShaderHandle,
        texture: Option<TextureHandle>,
        model: &Mat4,
    );
}
