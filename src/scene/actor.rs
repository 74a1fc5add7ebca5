//! Actors
//!
//! Every actor shares a common header (name, id, flags, transform) and
//! carries a type-specific payload in [`ActorKind`]. Construction, teardown
//! and drawing all dispatch on the kind.
//!
//! | Type    | Mesh | Texture          | Collider                         |
//! |---------|------|------------------|----------------------------------|
//! | Empty   | -    | -                | -                                |
//! | Layer   | yes  | layered textures | -                                |
//! | Bitmap  | yes  | bitmap           | from mask (`BITMAP_CREATE_COLLIDER`) |
//! | Static  | yes  | -                | -                                |
//! | Dynamic | yes  | -                | from vertices (`DYNACTOR_CREATE_COLLIDER_FROM_VERTICES`) |

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::page::ColliderId;
use super::transform::Transform;
use crate::buffer::pool::Handle;
use crate::buffer::string::BvrString;
use crate::math::Vec3;
use crate::physics::body::BodyMode;
use crate::physics::collider::Collider;
use crate::physics::mask::{CollisionMask, DEFAULT_MAX_MASK_RECTS};
use crate::render::mesh::MeshData;
use crate::render::{Renderer, ShaderHandle, TextureHandle};

/// Stable reference to an actor linked into a page
pub type ActorId = Handle<Actor>;

/// Actor creation flags
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorFlags(u32);

impl ActorFlags {
    pub const NONE: ActorFlags = ActorFlags(0);
    /// Actor storage is owned elsewhere and must not be released by the page
    pub const NOT_FREE: ActorFlags = ActorFlags(0x00001);
    pub const DYNACTOR_PASSIVE: ActorFlags = ActorFlags(0x00100);
    pub const DYNACTOR_AGGRESSIVE: ActorFlags = ActorFlags(0x00200);
    pub const DYNACTOR_CREATE_COLLIDER_FROM_VERTICES: ActorFlags = ActorFlags(0x00400);
    pub const BITMAP_CREATE_COLLIDER: ActorFlags = ActorFlags(0x00800);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        ActorFlags(bits)
    }

    pub const fn contains(self, other: ActorFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ActorFlags {
    type Output = ActorFlags;
    fn bitor(self, rhs: ActorFlags) -> ActorFlags {
        ActorFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for ActorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorFlags({:#07x})", self.0)
    }
}

/// Actor type tag, stored as `u16` in book files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorType {
    #[default]
    Empty,
    Layer,
    Bitmap,
    Static,
    Dynamic,
}

impl ActorType {
    pub const ALL: [ActorType; 5] = [
        ActorType::Empty,
        ActorType::Layer,
        ActorType::Bitmap,
        ActorType::Static,
        ActorType::Dynamic,
    ];

    pub fn as_u16(self) -> u16 {
        match self {
            ActorType::Empty => 0,
            ActorType::Layer => 1,
            ActorType::Bitmap => 2,
            ActorType::Static => 3,
            ActorType::Dynamic => 4,
        }
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            ActorType::Empty => "Empty",
            ActorType::Layer => "Layer",
            ActorType::Bitmap => "Bitmap",
            ActorType::Static => "Static",
            ActorType::Dynamic => "Dynamic",
        }
    }
}

/// Mesh and shader pair shared by every drawable kind
#[derive(Debug, Clone)]
pub struct Visual {
    pub mesh: MeshData,
    pub shader: ShaderHandle,
}

/// Type-specific actor payload
#[derive(Debug, Clone)]
pub enum ActorKind {
    Empty,
    Layer {
        visual: Visual,
        textures: Vec<TextureHandle>,
    },
    Bitmap {
        visual: Visual,
        bitmap: Option<TextureHandle>,
        collider: Collider,
    },
    Static {
        visual: Visual,
    },
    Dynamic {
        visual: Visual,
        collider: Collider,
    },
}

/// Mask decomposition settings for bitmap actors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskSettings {
    pub max_rects: usize,
    pub pixel_scale: u32,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self { max_rects: DEFAULT_MAX_MASK_RECTS, pixel_scale: 1 }
    }
}

/// Everything the actor factory needs. Fields a type doesn't use are ignored.
#[derive(Debug, Clone)]
pub struct ActorDesc {
    pub name: String,
    pub actor_type: ActorType,
    pub flags: ActorFlags,
    pub position: Vec3,
    pub order_in_layer: u16,
    pub mesh: Option<MeshData>,
    pub shader: ShaderHandle,
    pub textures: Vec<TextureHandle>,
    pub mask: Option<CollisionMask>,
    pub mask_settings: MaskSettings,
}

impl ActorDesc {
    pub fn new(name: &str, actor_type: ActorType) -> Self {
        Self {
            name: name.to_string(),
            actor_type,
            flags: ActorFlags::NONE,
            position: Vec3::ZERO,
            order_in_layer: 0,
            mesh: None,
            shader: ShaderHandle::default(),
            textures: Vec::new(),
            mask: None,
            mask_settings: MaskSettings::default(),
        }
    }

    pub fn flags(mut self, flags: ActorFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn order(mut self, order_in_layer: u16) -> Self {
        self.order_in_layer = order_in_layer;
        self
    }

    pub fn mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = shader;
        self
    }

    pub fn texture(mut self, texture: TextureHandle) -> Self {
        self.textures.push(texture);
        self
    }

    pub fn mask(mut self, mask: CollisionMask, settings: MaskSettings) -> Self {
        self.mask = Some(mask);
        self.mask_settings = settings;
        self
    }
}

pub struct Actor {
    pub name: BvrString,
    pub id: Uuid,
    pub flags: ActorFlags,
    pub active: bool,
    pub order_in_layer: u16,
    pub transform: Transform,
    pub kind: ActorKind,
    /// Registry entry of this actor's collider while linked into a page
    pub(crate) collider_link: Option<ColliderId>,
}

impl Actor {
    /// Type-keyed factory.
    ///
    /// Dynamic actors get their body mode from the `DYNACTOR_*` flags and,
    /// with `DYNACTOR_CREATE_COLLIDER_FROM_VERTICES`, a box around their
    /// mesh. Bitmap actors with `BITMAP_CREATE_COLLIDER` decompose their
    /// mask into passive boxes.
    pub fn new(desc: ActorDesc) -> Self {
        let ActorDesc {
            name,
            actor_type,
            flags,
            position,
            order_in_layer,
            mesh,
            shader,
            textures,
            mask,
            mask_settings,
        } = desc;

        let visual = || Visual {
            mesh: mesh.clone().unwrap_or_else(|| MeshData::quad_2d(0.5, 0.5)),
            shader,
        };

        let kind = match actor_type {
            ActorType::Empty => ActorKind::Empty,
            ActorType::Layer => ActorKind::Layer { visual: visual(), textures },
            ActorType::Static => ActorKind::Static { visual: visual() },
            ActorType::Dynamic => {
                let visual = visual();
                let collider = if flags.contains(ActorFlags::DYNACTOR_CREATE_COLLIDER_FROM_VERTICES) {
                    Collider::from_vertices(&visual.mesh)
                } else {
                    Collider::new()
                };
                let collider = collider.with_mode(dynamic_body_mode(flags));
                ActorKind::Dynamic { visual, collider }
            }
            ActorType::Bitmap => {
                let collider = match (&mask, flags.contains(ActorFlags::BITMAP_CREATE_COLLIDER)) {
                    (Some(mask), true) => {
                        Collider::from_mask(mask, mask_settings.max_rects, mask_settings.pixel_scale)
                            .with_mode(BodyMode::ENABLED | BodyMode::AABB | BodyMode::PASSIVE)
                    }
                    (None, true) => {
                        warn!(actor = %name, "bitmap actor asks for a collider but has no mask");
                        Collider::new()
                    }
                    _ => Collider::new(),
                };
                let visual = match (&mesh, &mask) {
                    // Default quad matches the mask footprint
                    (None, Some(mask)) => {
                        let (width, height) = mask.world_size(mask_settings.pixel_scale);
                        Visual { mesh: MeshData::quad_2d(width * 0.5, height * 0.5), shader }
                    }
                    _ => visual(),
                };
                ActorKind::Bitmap { visual, bitmap: textures.first().copied(), collider }
            }
        };

        debug!(actor = %name, ?actor_type, ?flags, "created actor");

        Self {
            name: BvrString::new(&name),
            id: Uuid::new_v4(),
            flags,
            active: true,
            order_in_layer,
            transform: Transform::from_position(position),
            kind,
            collider_link: None,
        }
    }

    pub fn empty(name: &str) -> Self {
        Self::new(ActorDesc::new(name, ActorType::Empty))
    }

    /// Dynamic actor with an explicit collider, bypassing mesh derivation.
    pub fn dynamic_with_collider(name: &str, position: Vec3, collider: Collider) -> Self {
        let mut actor = Self::new(ActorDesc::new(name, ActorType::Dynamic).position(position));
        if let ActorKind::Dynamic { collider: slot, .. } = &mut actor.kind {
            *slot = collider;
        }
        actor
    }

    pub fn actor_type(&self) -> ActorType {
        match self.kind {
            ActorKind::Empty => ActorType::Empty,
            ActorKind::Layer { .. } => ActorType::Layer,
            ActorKind::Bitmap { .. } => ActorType::Bitmap,
            ActorKind::Static { .. } => ActorType::Static,
            ActorKind::Dynamic { .. } => ActorType::Dynamic,
        }
    }

    pub fn visual(&self) -> Option<&Visual> {
        match &self.kind {
            ActorKind::Empty => None,
            ActorKind::Layer { visual, .. }
            | ActorKind::Bitmap { visual, .. }
            | ActorKind::Static { visual }
            | ActorKind::Dynamic { visual, .. } => Some(visual),
        }
    }

    pub fn collider(&self) -> Option<&Collider> {
        match &self.kind {
            ActorKind::Bitmap { collider, .. } | ActorKind::Dynamic { collider, .. } => Some(collider),
            _ => None,
        }
    }

    pub fn collider_mut(&mut self) -> Option<&mut Collider> {
        match &mut self.kind {
            ActorKind::Bitmap { collider, .. } | ActorKind::Dynamic { collider, .. } => Some(collider),
            _ => None,
        }
    }

    /// Split borrow of the collider and the transform it follows.
    pub fn collider_and_transform_mut(&mut self) -> Option<(&mut Collider, &mut Transform)> {
        let transform = &mut self.transform;
        match &mut self.kind {
            ActorKind::Bitmap { collider, .. } | ActorKind::Dynamic { collider, .. } => {
                Some((collider, transform))
            }
            _ => None,
        }
    }

    /// Registry entry of the collider, if linked into a page
    pub fn collider_id(&self) -> Option<ColliderId> {
        self.collider_link
    }

    /// Queue motion on the actor's body. No-op for kinds without a collider.
    pub fn add_force(&mut self, x: f32, y: f32, z: f32) {
        if let Some(collider) = self.collider_mut() {
            collider.body.add_force(x, y, z);
        }
    }

    /// Rebuild the model matrix and hand the mesh to `renderer`.
    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        if !self.active {
            return;
        }
        let model = *self.transform.update_matrix();
        match &self.kind {
            ActorKind::Empty => {}
            ActorKind::Layer { visual, textures } => {
                // One pass per texture layer, bottom first
                if textures.is_empty() {
                    renderer.draw_mesh(&visual.mesh, visual.shader, None, &model);
                }
                for texture in textures {
                    renderer.draw_mesh(&visual.mesh, visual.shader, Some(*texture), &model);
                }
            }
            ActorKind::Bitmap { visual, bitmap, .. } => {
                renderer.draw_mesh(&visual.mesh, visual.shader, *bitmap, &model);
            }
            ActorKind::Static { visual } | ActorKind::Dynamic { visual, .. } => {
                renderer.draw_mesh(&visual.mesh, visual.shader, None, &model);
            }
        }
    }

    /// Type-keyed teardown. Releases collider geometry and GPU-side handles.
    pub fn destroy(mut self) {
        match &mut self.kind {
            ActorKind::Empty | ActorKind::Static { .. } => {}
            ActorKind::Layer { textures, .. } => textures.clear(),
            ActorKind::Bitmap { collider, bitmap, .. } => {
                collider.clear();
                *bitmap = None;
            }
            ActorKind::Dynamic { collider, .. } => collider.clear(),
        }
        trace!(actor = %self.name, id = %self.id, "destroyed actor");
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.name.as_str())
            .field("type", &self.actor_type())
            .field("id", &self.id)
            .field("active", &self.active)
            .field("position", &self.transform.position)
            .finish()
    }
}

fn dynamic_body_mode(flags: ActorFlags) -> BodyMode {
    if flags.contains(ActorFlags::DYNACTOR_AGGRESSIVE) {
        BodyMode::ENABLED | BodyMode::AABB | BodyMode::AGGRESSIVE
    } else if flags.contains(ActorFlags::DYNACTOR_PASSIVE) {
        BodyMode::ENABLED | BodyMode::AABB | BodyMode::PASSIVE
    } else {
        BodyMode::DISABLED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::physics::collider::ColliderShape;

    #[derive(Default)]
    struct CountingRenderer {
        draws: Vec<Option<TextureHandle>>,
    }

    impl Renderer for CountingRenderer {
        fn draw_mesh(&mut self, _: &MeshData, _: ShaderHandle, texture: Option<TextureHandle>, _: &Mat4) {
            self.draws.push(texture);
        }
    }

    #[test]
    fn test_dynamic_collider_from_vertices() {
        let actor = Actor::new(
            ActorDesc::new("player", ActorType::Dynamic)
                .flags(ActorFlags::DYNACTOR_AGGRESSIVE | ActorFlags::DYNACTOR_CREATE_COLLIDER_FROM_VERTICES)
                .mesh(MeshData::quad_2d(4.0, 4.0)),
        );
        let collider = actor.collider().unwrap();
        assert_eq!(collider.shape(), ColliderShape::Box);
        assert!(collider.body.mode.is_aggressive());
        assert_eq!(collider.geometry()[0].width, 8);
    }

    #[test]
    fn test_dynamic_without_flags_is_disabled() {
        let actor = Actor::new(ActorDesc::new("prop", ActorType::Dynamic));
        let collider = actor.collider().unwrap();
        assert!(!collider.body.mode.is_enabled());
        assert!(collider.is_empty());
    }

    #[test]
    fn test_bitmap_collider_from_mask() {
        let mask = CollisionMask::from_raw(4, 2, vec![255, 255, 0, 0, 255, 255, 0, 0]).unwrap();
        let actor = Actor::new(
            ActorDesc::new("tiles", ActorType::Bitmap)
                .flags(ActorFlags::BITMAP_CREATE_COLLIDER)
                .mask(mask, MaskSettings { max_rects: 16, pixel_scale: 8 }),
        );
        let collider = actor.collider().unwrap();
        assert_eq!(collider.shape(), ColliderShape::Boxes);
        assert_eq!(collider.geometry().len(), 1);
        assert_eq!(collider.geometry()[0].width, 16);
        assert!(collider.body.mode.is_passive());
    }

    #[test]
    fn test_kinds_without_collider() {
        assert!(Actor::empty("root").collider().is_none());
        assert!(Actor::new(ActorDesc::new("bg", ActorType::Layer)).collider().is_none());
        assert!(Actor::new(ActorDesc::new("rock", ActorType::Static)).collider().is_none());
    }

    #[test]
    fn test_draw_skips_inactive_and_empty() {
        let mut renderer = CountingRenderer::default();
        let mut empty = Actor::empty("root");
        empty.draw(&mut renderer);
        assert!(renderer.draws.is_empty());

        let mut layer = Actor::new(
            ActorDesc::new("bg", ActorType::Layer)
                .texture(TextureHandle(1))
                .texture(TextureHandle(2)),
        );
        layer.draw(&mut renderer);
        assert_eq!(renderer.draws, vec![Some(TextureHandle(1)), Some(TextureHandle(2))]);

        layer.active = false;
        layer.draw(&mut renderer);
        assert_eq!(renderer.draws.len(), 2);
    }

    #[test]
    fn test_type_tag_roundtrip() {
        for ty in ActorType::ALL {
            assert_eq!(ActorType::from_u16(ty.as_u16()), Some(ty));
        }
        assert_eq!(ActorType::from_u16(9), None);
    }
}
