//! Circular mask transform.
//!
//! The mask is the largest circle inscribed in the image bounds: radius
//! `min(width, height) / 2`, centered at `(width / 2, height / 2)`. Distances are
//! measured from integer pixel coordinates, so the output for a given input is
//! fully determined and bit-for-bit reproducible.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::error::{SnapError, SnapResult};
use super::models::RasterImage;

/// How pixels at the circle boundary are treated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EdgeMode {
    /// Pixels inside the circle are copied, everything else is cleared.
    #[default]
    Hard,
    /// Alpha fades over the last pixel inside the radius.
    Smooth,
}

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Mask `input` to its inscribed circle with hard edges.
pub fn round_mask(input: &RasterImage) -> SnapResult<RasterImage> {
    round_mask_with(input, EdgeMode::Hard)
}

/// Mask `input` to its inscribed circle using the given edge mode.
///
/// Returns [`SnapError::InvalidImage`] for images with zero area. Non-square
/// inputs keep their dimensions; the circle spans the shorter side.
///
/// Distances are taken from pixel `(x, y)` itself, not from its center
/// `(x + 0.5, y + 0.5)`. The circle therefore sits half a pixel up and left:
/// an 8x8 image clears column 0 of row 3 but keeps column 7, and a
/// 1x1 image comes back fully transparent. Baselines depend on this.
pub fn round_mask_with(input: &RasterImage, mode: EdgeMode) -> SnapResult<RasterImage> {
    let (width, height) = input.dimensions();
    if input.is_empty() {
        return Err(SnapError::InvalidImage { width, height });
    }

    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    let radius = f64::from(width.min(height)) / 2.0;
    let radius_sq = radius * radius;

    let source = input.as_rgba();
    let output = RgbaImage::from_fn(width, height, |x, y| {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq > radius_sq {
            return TRANSPARENT;
        }

        let pixel = *source.get_pixel(x, y);
        match mode {
            EdgeMode::Hard => pixel,
            EdgeMode::Smooth => {
                let coverage = (radius - dist_sq.sqrt()).clamp(0.0, 1.0);
                if coverage >= 1.0 {
                    pixel
                } else if coverage <= 0.0 {
                    TRANSPARENT
                } else {
                    let Rgba([r, g, b, a]) = pixel;
                    let alpha = (f64::from(a) * coverage).round() as u8;
                    Rgba([r, g, b, alpha])
                }
            }
        }
    });

    Ok(RasterImage::from(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn test_square_corners_cleared_center_kept() {
        let input = RasterImage::filled(200, 200, RED);
        let output = round_mask(&input).unwrap();

        assert_eq!(output.dimensions(), (200, 200));
        assert_eq!(output.pixel(0, 0).unwrap()[3], 0);
        assert_eq!(output.pixel(199, 199).unwrap()[3], 0);
        assert_eq!(output.pixel(100, 100), Some(RED));
    }

    #[test]
    fn test_rectangular_input_keeps_dimensions() {
        let input = RasterImage::filled(300, 150, RED);
        let output = round_mask(&input).unwrap();

        assert_eq!(output.dimensions(), (300, 150));
        // r = 75 around (150, 75)
        assert_eq!(output.pixel(150, 0), Some(RED));
        assert_eq!(output.pixel(75, 75), Some(RED));
        assert_eq!(output.pixel(74, 75).unwrap()[3], 0);
        assert_eq!(output.pixel(0, 75).unwrap()[3], 0);
        assert_eq!(output.pixel(299, 75).unwrap()[3], 0);
    }

    #[test]
    fn test_input_is_not_modified() {
        let input = RasterImage::filled(20, 10, RED);
        let before = input.clone();
        let _ = round_mask(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_zero_area_is_rejected() {
        let empty = RasterImage::from(RgbaImage::new(0, 5));
        let err = round_mask(&empty).unwrap_err();
        assert!(matches!(
            err,
            SnapError::InvalidImage {
                width: 0,
                height: 5
            }
        ));
    }

    #[test]
    fn test_source_alpha_is_preserved_inside() {
        let input = RasterImage::filled(10, 10, [1, 2, 3, 128]);
        let output = round_mask(&input).unwrap();
        assert_eq!(output.pixel(5, 5), Some([1, 2, 3, 128]));
    }

    #[test]
    fn test_smooth_edge_fades_boundary_only() {
        let input = RasterImage::filled(200, 200, RED);
        let output = round_mask_with(&input, EdgeMode::Smooth).unwrap();

        assert_eq!(output.pixel(100, 100), Some(RED));
        assert_eq!(output.pixel(0, 0).unwrap()[3], 0);
        // (100, 0) sits exactly on the radius
        assert_eq!(output.pixel(100, 0).unwrap()[3], 0);
        // (100, 1) is one pixel inside
        assert_eq!(output.pixel(100, 1), Some(RED));

        // (114, 199): dx = 14, dy = 99, d ~ 99.985
        let edge = output.pixel(114, 199).unwrap();
        assert!(edge[3] > 0 && edge[3] < 255, "got {edge:?}");
        assert_eq!(&edge[..3], &RED[..3]);
    }

    #[test]
    fn test_reapplication_keeps_opaque_region() {
        let input = RasterImage::filled(64, 40, RED);
        let once = round_mask(&input).unwrap();
        let twice = round_mask(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_edge_mode_parsing() {
        assert_eq!("smooth".parse::<EdgeMode>().unwrap(), EdgeMode::Smooth);
        assert_eq!("HARD".parse::<EdgeMode>().unwrap(), EdgeMode::Hard);
        assert_eq!(EdgeMode::Smooth.to_string(), "smooth");
        assert!("round".parse::<EdgeMode>().is_err());
    }

    #[test]
    fn test_circle_is_measured_from_pixel_corners() {
        let masked = round_mask(&RasterImage::filled(8, 8, [255, 0, 0, 255])).unwrap();
        assert_eq!(masked.pixel(0, 3).map(|p| p[3]), Some(0));
        assert_eq!(masked.pixel(7, 3), Some([255, 0, 0, 255]));
        assert_eq!(masked.pixel(4, 0), Some([255, 0, 0, 255]));
        assert_eq!(masked.pixel(3, 0).map(|p| p[3]), Some(0));
    }
}
