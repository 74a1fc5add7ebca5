//! Scene layout files
//!
//! RON description of the actors a page starts with. Files may be plain RON
//! or brotli-compressed RON:
//! - Reading: auto-detects the format by checking for a valid RON start
//! - Writing: always brotli
//!
//! ```ron
//! (
//!     name: "collider_test",
//!     actors: [
//!         (name: "wall", actor_type: Dynamic, flags: 1280, position: (x: 0.0, y: 0.0, z: 0.0)),
//!         (name: "tiles", actor_type: Bitmap, flags: 2048, mask: Some("tiles_mask.png")),
//!     ],
//! )
//! ```

use std::fs;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::actor::{ActorDesc, ActorFlags, ActorType, MaskSettings};
use super::camera::Camera;
use super::page::PageError;
use crate::math::{Vec2, Vec3};
use crate::physics::mask::{CollisionMask, MaskError};
use crate::render::mesh::MeshData;

/// Validation limits for layout files
pub mod limits {
    pub const MAX_ACTORS: usize = 4096;
    pub const MAX_NAME_LEN: usize = 256;
    pub const MAX_COORD: f32 = 1_000_000.0;
}

/// Error type for layout loading
#[derive(Debug)]
pub enum LayoutError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ValidationError(String),
    Mask(MaskError),
    Page(PageError),
}

impl From<std::io::Error> for LayoutError {
    fn from(e: std::io::Error) -> Self {
        LayoutError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for LayoutError {
    fn from(e: ron::error::SpannedError) -> Self {
        LayoutError::ParseError(e)
    }
}

impl From<ron::Error> for LayoutError {
    fn from(e: ron::Error) -> Self {
        LayoutError::SerializeError(e)
    }
}

impl From<MaskError> for LayoutError {
    fn from(e: MaskError) -> Self {
        LayoutError::Mask(e)
    }
}

impl From<PageError> for LayoutError {
    fn from(e: PageError) -> Self {
        LayoutError::Page(e)
    }
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::IoError(e) => write!(f, "IO error: {}", e),
            LayoutError::ParseError(e) => write!(f, "Parse error: {}", e),
            LayoutError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            LayoutError::ValidationError(e) => write!(f, "Validation error: {}", e),
            LayoutError::Mask(e) => write!(f, "Mask error: {}", e),
            LayoutError::Page(e) => write!(f, "Page error: {}", e),
        }
    }
}

impl std::error::Error for LayoutError {}

fn default_true() -> bool {
    true
}

/// One actor in a layout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorLayout {
    pub name: String,
    pub actor_type: ActorType,
    #[serde(default)]
    pub flags: ActorFlags,
    #[serde(default)]
    pub position: Vec3,
    /// Half extents of the actor's quad; bitmap actors default to the mask size
    #[serde(default)]
    pub half_size: Option<Vec2>,
    #[serde(default)]
    pub order_in_layer: u16,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Collision mask image, relative to the layout file
    #[serde(default)]
    pub mask: Option<String>,
}

impl ActorLayout {
    pub fn new(name: &str, actor_type: ActorType) -> Self {
        Self {
            name: name.to_string(),
            actor_type,
            flags: ActorFlags::NONE,
            position: Vec3::ZERO,
            half_size: None,
            order_in_layer: 0,
            active: true,
            mask: None,
        }
    }

    /// Build the factory description, loading the mask if one is named.
    pub fn to_desc(&self, base_dir: Option<&Path>, settings: MaskSettings) -> Result<ActorDesc, LayoutError> {
        let mut desc = ActorDesc::new(&self.name, self.actor_type)
            .flags(self.flags)
            .position(self.position)
            .order(self.order_in_layer);

        if let Some(size) = self.half_size {
            desc = desc.mesh(MeshData::quad_2d(size.x, size.y));
        }

        if let Some(mask_path) = &self.mask {
            let path = match base_dir {
                Some(dir) => dir.join(mask_path),
                None => Path::new(mask_path).to_path_buf(),
            };
            desc = desc.mask(CollisionMask::load(&path)?, settings);
        }

        Ok(desc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLayout {
    pub name: String,
    #[serde(default)]
    pub camera: Option<Camera>,
    #[serde(default)]
    pub actors: Vec<ActorLayout>,
}

impl SceneLayout {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), camera: None, actors: Vec::new() }
    }
}

fn is_valid_coord(f: f32) -> bool {
    f.is_finite() && f.abs() <= limits::MAX_COORD
}

pub fn validate_layout(layout: &SceneLayout) -> Result<(), LayoutError> {
    if layout.actors.len() > limits::MAX_ACTORS {
        return Err(LayoutError::ValidationError(format!(
            "too many actors: {} (max {})",
            layout.actors.len(),
            limits::MAX_ACTORS
        )));
    }

    for (i, actor) in layout.actors.iter().enumerate() {
        if actor.name.len() > limits::MAX_NAME_LEN {
            return Err(LayoutError::ValidationError(format!("actor {}: name too long", i)));
        }
        let p = actor.position;
        if !(is_valid_coord(p.x) && is_valid_coord(p.y) && is_valid_coord(p.z)) {
            return Err(LayoutError::ValidationError(format!(
                "actor {} '{}': invalid position",
                i, actor.name
            )));
        }
        if let Some(size) = actor.half_size {
            if !(is_valid_coord(size.x) && is_valid_coord(size.y)) || size.x < 0.0 || size.y < 0.0 {
                return Err(LayoutError::ValidationError(format!(
                    "actor {} '{}': invalid half_size",
                    i, actor.name
                )));
            }
        }
    }
    Ok(())
}

/// Parse layout bytes, plain or brotli-compressed.
pub fn parse_layout_data(bytes: &[u8]) -> Result<SceneLayout, LayoutError> {
    // RON files start with '(' or whitespace, brotli is binary
    let is_plain_ron = bytes
        .first()
        .map(|&b| b == b'(' || b == b' ' || b == b'\n' || b == b'\r' || b == b'\t')
        .unwrap_or(false);

    let contents = if is_plain_ron {
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            LayoutError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid UTF-8: {}", e),
            ))
        })?
    } else {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(bytes), &mut decompressed).map_err(|e| {
            LayoutError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("brotli decompression failed: {}", e),
            ))
        })?;
        String::from_utf8(decompressed).map_err(|e| {
            LayoutError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid UTF-8 after decompression: {}", e),
            ))
        })?
    };

    load_layout_from_str(&contents)
}

pub fn load_layout_from_str(s: &str) -> Result<SceneLayout, LayoutError> {
    let layout: SceneLayout = ron::from_str(s)?;
    validate_layout(&layout)?;
    Ok(layout)
}

pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<SceneLayout, LayoutError> {
    let bytes = fs::read(path.as_ref())?;
    let layout = parse_layout_data(&bytes)?;
    debug!(path = %path.as_ref().display(), actors = layout.actors.len(), "loaded scene layout");
    Ok(layout)
}

/// Serialize to brotli-compressed RON.
pub fn serialize_layout(layout: &SceneLayout) -> Result<Vec<u8>, LayoutError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());
    let ron_string = ron::ser::to_string_pretty(layout, config)?;

    // Quality 6, window 22
    let mut compressed = Vec::new();
    brotli::BrotliCompress(
        &mut Cursor::new(ron_string.as_bytes()),
        &mut compressed,
        &brotli::enc::BrotliEncoderParams {
            quality: 6,
            lgwin: 22,
            ..Default::default()
        },
    )
    .map_err(|e| {
        LayoutError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("brotli compression failed: {}", e),
        ))
    })?;
    Ok(compressed)
}

pub fn save_layout<P: AsRef<Path>>(layout: &SceneLayout, path: P) -> Result<(), LayoutError> {
    fs::write(path, serialize_layout(layout)?)?;
    Ok(())
}
