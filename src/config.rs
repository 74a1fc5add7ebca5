//! Engine configuration
//!
//! Loaded from a RON file. Every field has a default, so a config file only
//! needs to name what it changes:
//!
//! ```ron
//! (max_actors: 256, target_framerate: 0)
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::physics::mask::{DEFAULT_MAX_MASK_RECTS, MAX_MASK_PIXEL_SCALE};
use crate::scene::page::{MAX_SCENE_ACTORS, MAX_SCENE_COLLIDERS};

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    ValidationError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Actor registry size per page
    pub max_actors: usize,
    /// Collider registry size per page
    pub max_colliders: usize,
    /// Rectangle cap for collision mask decomposition
    pub max_mask_rects: usize,
    /// Frames per second, 0 = uncapped
    pub target_framerate: u32,
    /// World units per collision mask pixel
    pub mask_pixel_scale: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_actors: MAX_SCENE_ACTORS,
            max_colliders: MAX_SCENE_COLLIDERS,
            max_mask_rects: DEFAULT_MAX_MASK_RECTS,
            target_framerate: 60,
            mask_pixel_scale: 1,
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("max_actors", self.max_actors),
            ("max_colliders", self.max_colliders),
            ("max_mask_rects", self.max_mask_rects),
            ("mask_pixel_scale", self.mask_pixel_scale as usize),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{} must be non-zero", name)));
            }
        }
        if self.mask_pixel_scale > MAX_MASK_PIXEL_SCALE {
            return Err(ConfigError::ValidationError(format!(
                "mask_pixel_scale {} exceeds maximum {}",
                self.mask_pixel_scale, MAX_MASK_PIXEL_SCALE
            )));
        }
        Ok(())
    }

    /// Milliseconds per frame at the target framerate, `None` if uncapped
    pub fn frame_budget_ms(&self) -> Option<f64> {
        if self.target_framerate == 0 {
            None
        } else {
            Some(1000.0 / self.target_framerate as f64)
        }
    }
}
