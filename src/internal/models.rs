use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{SnapError, SnapResult};

/// Decoded bitmap: RGBA8, non-premultiplied, row-major.
///
/// Transforms never mutate a `RasterImage`; they return a new one. Cloning
/// copies the pixel buffer, so two clones are fully independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Create an image filled with a single color.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(color)),
        }
    }

    /// Wrap a raw RGBA buffer. Fails for zero area or a buffer of the wrong size.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> SnapResult<Self> {
        if width == 0 || height == 0 {
            return Err(SnapError::InvalidImage { width, height });
        }
        RgbaImage::from_raw(width, height, rgba)
            .map(|pixels| Self { pixels })
            .ok_or(SnapError::InvalidImage { width, height })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// blake3 digest over dimensions and pixel bytes, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width().to_le_bytes());
        hasher.update(&self.height().to_le_bytes());
        hasher.update(self.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Write the image as PNG, creating parent directories as needed.
    pub fn save_png(&self, path: &Path) -> SnapResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        self.pixels
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| SnapError::Encode {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

/// A read-only test input resolved from its logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub path: PathBuf,
}

/// Sidecar written next to every baseline PNG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotManifest {
    /// File stem of the baseline.
    pub name: String,
    /// Snapshot name as passed to the store, before sanitizing.
    #[serde(default)]
    pub source_name: String,
    pub width: u32,
    pub height: u32,
    pub digest: String,
    pub recorded_at: jiff::Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_rejects_zero_area() {
        let err = RasterImage::from_rgba(0, 10, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SnapError::InvalidImage {
                width: 0,
                height: 10
            }
        ));
    }

    #[test]
    fn test_from_rgba_rejects_short_buffer() {
        let err = RasterImage::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, SnapError::InvalidImage { .. }));
    }

    #[test]
    fn test_clones_are_independent() {
        let original = RasterImage::filled(4, 4, [10, 20, 30, 255]);
        let mut rgba = original.clone().into_rgba();
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));

        assert_eq!(original.pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(RasterImage::from(rgba).pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_digest_depends_on_dimensions() {
        let wide = RasterImage::filled(4, 2, [1, 2, 3, 4]);
        let tall = RasterImage::filled(2, 4, [1, 2, 3, 4]);
        assert_eq!(wide.as_bytes(), tall.as_bytes());
        assert_ne!(wide.digest(), tall.digest());
        assert_eq!(wide.digest(), wide.clone().digest());
    }

    #[test]
    fn test_pixel_out_of_bounds() {
        let image = RasterImage::filled(3, 3, [0, 0, 0, 255]);
        assert_eq!(image.pixel(3, 0), None);
        assert_eq!(image.pixel(2, 2), Some([0, 0, 0, 255]));
    }
}
