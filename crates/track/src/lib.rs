//! Image-backed scalar fields for the race track.
//!
//! A [`TerrainField`] is a 2D grid of normalized samples queried by
//! world-space (x, z). Two independent instances back a track: a collision
//! mask (on-track vs off-track) and an elevation map. The grid is centered
//! on the world origin; `pixel_ratio` is world units per pixel.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone)]
pub struct TerrainField {
    width: u32,
    height: u32,
    samples: Vec<f32>,
    pixel_ratio: f32,
}

impl TerrainField {
    /// Build a field from raw normalized samples, row-major, `width * height`
    /// entries.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>, pixel_ratio: f32) -> Self {
        assert!(width > 0 && height > 0);
        assert_eq!((width as usize) * (height as usize), samples.len());
        assert!(pixel_ratio > 0.0);
        Self {
            width,
            height,
            samples,
            pixel_ratio,
        }
    }

    /// Decode a PNG and normalize its luma channel to [0, 1].
    pub fn from_png_bytes(bytes: &[u8], pixel_ratio: f32) -> Result<Self, TrackError> {
        let img = image::load_from_memory(bytes)?.to_luma8();
        let (w, h) = img.dimensions();
        let samples = img.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Ok(Self::from_samples(w, h, samples, pixel_ratio))
    }

    pub fn from_png_file<P: AsRef<Path>>(path: P, pixel_ratio: f32) -> Result<Self, TrackError> {
        let bytes = std::fs::read(path)?;
        Self::from_png_bytes(&bytes, pixel_ratio)
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    #[inline]
    fn texel(&self, x: u32, z: u32) -> f32 {
        self.samples[(x as usize) + (z as usize) * (self.width as usize)]
    }

    /// Bilinear sample at world-space (x, z). Coordinates outside the grid
    /// clamp to the nearest edge texel.
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_z = (self.height - 1) as f32;
        let fx = (x / self.pixel_ratio + max_x * 0.5).clamp(0.0, max_x);
        let fz = (z / self.pixel_ratio + max_z * 0.5).clamp(0.0, max_z);

        let x0 = fx.floor() as u32;
        let z0 = fz.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let z1 = (z0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;

        let a = self.texel(x0, z0) * (1.0 - tx) + self.texel(x1, z0) * tx;
        let b = self.texel(x0, z1) * (1.0 - tx) + self.texel(x1, z1) * tx;
        a * (1.0 - tz) + b * tz
    }
}
