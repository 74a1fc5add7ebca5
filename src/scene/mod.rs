//! Scene graph
//!
//! Actors live in pages; the [`book::Book`] context owns the current page.

pub mod actor;
pub mod book;
pub mod camera;
pub mod layout;
pub mod page;
pub mod transform;

pub use actor::{Actor, ActorDesc, ActorFlags, ActorId, ActorKind, ActorType, MaskSettings, Visual};
pub use book::Book;
pub use camera::{Camera, CameraMode};
pub use layout::{ActorLayout, LayoutError, SceneLayout};
pub use page::{ColliderId, ColliderLink, Contact, LinkError, Page, PageError, UpdateReport};
pub use transform::Transform;
