use bitmap_snap::config::AppConfig;
use bitmap_snap::internal::snapshot::sanitize_name;
use bitmap_snap::{EdgeMode, RasterImage, round_mask, round_mask_with};
use image::{Rgba, RgbaImage};
use proptest::prelude::*;

fn noise(width: u32, height: u32, seed: u32) -> RasterImage {
    RasterImage::from(RgbaImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ seed;
        Rgba([v as u8, (v >> 3) as u8, (v >> 5) as u8, 128 | (v >> 1) as u8])
    }))
}

fn outside(x: u32, y: u32, width: u32, height: u32) -> bool {
    let dx = f64::from(x) - f64::from(width) / 2.0;
    let dy = f64::from(y) - f64::from(height) / 2.0;
    let r = f64::from(width.min(height)) / 2.0;
    dx * dx + dy * dy > r * r
}

proptest! {
    #[test]
    fn test_round_mask_keeps_dimensions(w in 1u32..64, h in 1u32..64, seed in any::<u32>()) {
        let masked = round_mask(&noise(w, h, seed)).unwrap();
        prop_assert_eq!(masked.dimensions(), (w, h));
    }

    #[test]
    fn test_round_mask_clears_outside_circle(w in 1u32..48, h in 1u32..48, seed in any::<u32>()) {
        let input = noise(w, h, seed);
        for mode in [EdgeMode::Hard, EdgeMode::Smooth] {
            let masked = round_mask_with(&input, mode).unwrap();
            for y in 0..h {
                for x in 0..w {
                    if outside(x, y, w, h) {
                        prop_assert_eq!(masked.pixel(x, y).map(|p| p[3]), Some(0));
                    }
                }
            }
        }
    }

    #[test]
    fn test_hard_mask_keeps_inside_pixels(w in 1u32..48, h in 1u32..48, seed in any::<u32>()) {
        let input = noise(w, h, seed);
        let masked = round_mask(&input).unwrap();
        for y in 0..h {
            for x in 0..w {
                if !outside(x, y, w, h) {
                    prop_assert_eq!(masked.pixel(x, y), input.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn test_round_mask_is_deterministic(w in 1u32..64, h in 1u32..64, seed in any::<u32>()) {
        let input = noise(w, h, seed);
        let first = round_mask_with(&input, EdgeMode::Smooth).unwrap();
        let second = round_mask_with(&input, EdgeMode::Smooth).unwrap();
        prop_assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn test_round_mask_reapplied_keeps_opaque_region(w in 1u32..48, h in 1u32..48) {
        let input = RasterImage::filled(w, h, [10, 20, 30, 255]);
        for mode in [EdgeMode::Hard, EdgeMode::Smooth] {
            let once = round_mask_with(&input, mode).unwrap();
            let twice = round_mask_with(&once, mode).unwrap();
            for y in 0..h {
                for x in 0..w {
                    if once.pixel(x, y).map(|p| p[3]) == Some(255) {
                        prop_assert_eq!(twice.pixel(x, y).map(|p| p[3]), Some(255));
                    }
                }
            }
        }
    }

    #[test]
    fn test_sanitize_name_is_path_safe(s in "\\PC*") {
        let name = sanitize_name(&s);
        prop_assert!(!name.is_empty());
        prop_assert!(!name.contains('/'));
        prop_assert!(!name.contains('\\'));
        prop_assert!(name.chars().any(|c| c != '.'));
    }

    #[test]
    fn test_config_parsing_resilience(s in "\\PC*") {
        // Fuzz the config loader with random strings
        // It should return an Err, but not panic
        let _ = ron::from_str::<AppConfig>(&s);
    }
}
