//! 2D physics: per-tick motion and AABB collision
//!
//! No dynamics, no broad phase. Every aggressive collider is tested against
//! every other registered collider each tick; see
//! [`crate::scene::page::Page::update`].

pub mod body;
pub mod bounds;
pub mod collider;
pub mod collision;
pub mod mask;

pub use body::{Body, BodyMode};
pub use bounds::{Bounds, Rect};
pub use collider::{Anchor, Collider, ColliderShape};
pub use collision::{compare, ColliderRef, CollisionOutcome, CollisionResult};
pub use mask::{CollisionMask, Decomposition, MaskError, MaskRect, DEFAULT_MAX_MASK_RECTS};
