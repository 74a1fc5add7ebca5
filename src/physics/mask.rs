//! Collision masks
//!
//! A mask is a single-channel 8-bit image where any non-zero pixel is
//! solid. [`CollisionMask::decompose`] turns it into a list of rectangles
//! with a greedy row-major scan:
//!
//! 1. find the next solid pixel
//! 2. grow right while pixels stay solid
//! 3. grow down while the whole width stays solid on the next row
//! 4. clear the covered pixels and record the rectangle
//!
//! Every rectangle covers solid pixels only and, unless the rectangle cap
//! is hit, every solid pixel ends up in exactly one rectangle. Shapes that
//! are not unions of few rectangles (diagonals, circles) produce many small
//! rectangles, so the result is a cheap approximation for tile maps rather
//! than an optimal cover.

use std::fmt;
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

use super::bounds::Bounds;

/// Default cap on rectangles produced from a single mask
pub const DEFAULT_MAX_MASK_RECTS: usize = 128;

/// Largest accepted world units per mask pixel
pub const MAX_MASK_PIXEL_SCALE: u32 = 4096;

/// Error type for mask loading
#[derive(Debug)]
pub enum MaskError {
    /// Pixel buffer length doesn't match `width * height`
    SizeMismatch { expected: usize, actual: usize },
    /// Image could not be opened or decoded
    Image(image::ImageError),
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::SizeMismatch { expected, actual } => {
                write!(f, "mask has {} bytes, expected {}", actual, expected)
            }
            MaskError::Image(e) => write!(f, "mask image error: {}", e),
        }
    }
}

impl std::error::Error for MaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MaskError::Image(e) => Some(e),
            MaskError::SizeMismatch { .. } => None,
        }
    }
}

impl From<image::ImageError> for MaskError {
    fn from(e: image::ImageError) -> Self {
        MaskError::Image(e)
    }
}

/// Rectangle in mask pixel space (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MaskRect {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Result of a mask decomposition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    pub rects: Vec<MaskRect>,
    /// The rectangle cap was reached and solid pixels were left uncovered
    pub truncated: bool,
}

/// Single-channel collision mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionMask {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CollisionMask {
    /// Wrap a row-major `width * height` byte buffer.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, MaskError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(MaskError::SizeMismatch { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    /// Convert a decoded image to luminance.
    pub fn from_image(img: &DynamicImage) -> Self {
        let luma = img.to_luma8();
        Self {
            width: luma.width(),
            height: luma.height(),
            pixels: luma.into_raw(),
        }
    }

    /// Load a mask from an image file (PNG, BMP or JPEG).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MaskError> {
        let img = image::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), width = img.width(), height = img.height(), "loaded collision mask");
        Ok(Self::from_image(&img))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_solid(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[self.index(x, y)] != 0
    }

    pub fn solid_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != 0).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Greedy rectangle decomposition, stopping after `max_rects`.
    ///
    /// The mask itself is not modified.
    pub fn decompose(&self, max_rects: usize) -> Decomposition {
        let mut result = Decomposition::default();
        if self.width == 0 || self.height == 0 || self.solid_count() == 0 {
            warn!(width = self.width, height = self.height, "collision mask has no solid pixels");
            return result;
        }

        let mut work = self.clone();
        let (w, h) = (self.width, self.height);

        'scan: for y in 0..h {
            for x in 0..w {
                if !work.is_solid(x, y) {
                    continue;
                }
                if result.rects.len() >= max_rects {
                    result.truncated = true;
                    break 'scan;
                }

                let mut rw = 1;
                while x + rw < w && work.is_solid(x + rw, y) {
                    rw += 1;
                }

                let mut rh = 1;
                while y + rh < h && (x..x + rw).all(|px| work.is_solid(px, y + rh)) {
                    rh += 1;
                }

                for py in y..y + rh {
                    let row = work.index(x, py);
                    work.pixels[row..row + rw as usize].fill(0);
                }

                result.rects.push(MaskRect { x, y, width: rw, height: rh });
            }
        }

        if result.truncated {
            warn!(
                max_rects,
                uncovered = work.solid_count(),
                "collision mask exceeds rectangle cap, remaining pixels dropped"
            );
        }
        debug!(rects = result.rects.len(), "decomposed collision mask");
        result
    }

    /// Convert mask rectangles to collider bounds.
    ///
    /// Each pixel becomes `pixel_scale` world units. The mask is centered on
    /// the owning transform (like the quad it is drawn on) and flipped so
    /// world y points up. Positions are computed in `f32` and sizes
    /// saturate at `u32::MAX`, so oversized scales never wrap.
    pub fn rects_to_bounds(&self, rects: &[MaskRect], pixel_scale: u32) -> Vec<Bounds> {
        let scale = pixel_scale.max(1);
        let fscale = scale as f32;
        let half_w = self.width as f32 * fscale * 0.5;
        let half_h = self.height as f32 * fscale * 0.5;

        rects
            .iter()
            .map(|r| {
                let flipped_y = self.height.saturating_sub(r.y.saturating_add(r.height));
                Bounds::new(
                    r.x as f32 * fscale - half_w,
                    flipped_y as f32 * fscale - half_h,
                    r.width.saturating_mul(scale),
                    r.height.saturating_mul(scale),
                )
            })
            .collect()
    }

    /// World-space footprint of the whole mask at `pixel_scale`.
    pub fn world_size(&self, pixel_scale: u32) -> (f32, f32) {
        let scale = pixel_scale.max(1) as f32;
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}
