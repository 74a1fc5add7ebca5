//! Beauvoir: a small 2D engine core
//!
//! Actor and collider registries on fixed-capacity pools, per-tick motion
//! and predictive AABB collision, plus the scene/page glue and a binary
//! save format for scene metadata. Rendering and windowing stay behind the
//! [`render::Renderer`] trait.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod asset;
pub mod buffer;
pub mod config;
pub mod logging;
pub mod math;
pub mod physics;
pub mod render;
pub mod scene;

pub use config::EngineConfig;
