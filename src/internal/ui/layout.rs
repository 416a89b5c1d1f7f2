//! Minimal view tree: image leaves inside a linear container.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::surface::MAX_SURFACE_EDGE;
use crate::internal::error::{SnapError, SnapResult};
use crate::internal::models::RasterImage;
use crate::utils::color::{premultiply, unpremultiply};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleType {
    /// Scale uniformly until the image fits, then center it.
    #[default]
    FitCenter,
    /// Stretch to fill the cell.
    FitXy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Placement of drawn content inside a cell, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A leaf view that owns the image bound to it.
#[derive(Debug, Clone)]
pub struct ImageView {
    image: RasterImage,
    scale: ScaleType,
}

impl ImageView {
    pub fn new(image: RasterImage) -> Self {
        Self {
            image,
            scale: ScaleType::default(),
        }
    }

    pub fn with_scale(mut self, scale: ScaleType) -> Self {
        self.scale = scale;
        self
    }

    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    /// Where the image lands inside a `width` x `height` cell.
    pub fn placement(&self, width: u32, height: u32) -> Placement {
        let (iw, ih) = self.image.dimensions();
        if iw == 0 || ih == 0 || width == 0 || height == 0 {
            return Placement {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        }

        match self.scale {
            ScaleType::FitXy => Placement {
                x: 0,
                y: 0,
                width,
                height,
            },
            ScaleType::FitCenter => {
                let scale =
                    (f64::from(width) / f64::from(iw)).min(f64::from(height) / f64::from(ih));
                let dw = ((f64::from(iw) * scale).round() as u32).clamp(1, width);
                let dh = ((f64::from(ih) * scale).round() as u32).clamp(1, height);
                Placement {
                    x: (width - dw) / 2,
                    y: (height - dh) / 2,
                    width: dw,
                    height: dh,
                }
            }
        }
    }

    /// Render the view into a transparent `width` x `height` cell.
    pub fn render(&self, width: u32, height: u32) -> RgbaImage {
        self.render_visible(width, height, (width, height))
    }

    /// Render only the top-left `visible` part of a `width` x `height` cell.
    ///
    /// Scaling runs on premultiplied pixels so transparent areas do not bleed
    /// their color into the edges of opaque ones.
    pub fn render_visible(&self, width: u32, height: u32, visible: (u32, u32)) -> RgbaImage {
        let (vw, vh) = (visible.0.min(width), visible.1.min(height));
        let mut cell = RgbaImage::new(vw, vh);
        let placement = self.placement(width, height);
        if placement.width == 0
            || placement.height == 0
            || placement.x >= vw
            || placement.y >= vh
        {
            return cell;
        }

        let source = self.image.as_rgba();
        if source.dimensions() == (placement.width, placement.height) {
            imageops::replace(
                &mut cell,
                source,
                i64::from(placement.x),
                i64::from(placement.y),
            );
        } else {
            let mut premultiplied = source.clone();
            premultiplied.pixels_mut().for_each(|p| *p = premultiply(*p));
            let mut scaled = imageops::resize(
                &premultiplied,
                placement.width,
                placement.height,
                FilterType::Triangle,
            );
            scaled.pixels_mut().for_each(|p| *p = unpremultiply(*p));
            imageops::replace(
                &mut cell,
                &scaled,
                i64::from(placement.x),
                i64::from(placement.y),
            );
        }
        cell
    }
}

/// Reject cells a surface could never show or allocate.
pub fn check_cell(width: u32, height: u32) -> SnapResult<()> {
    if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
        return Err(SnapError::InvalidCell { width, height });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LayoutChild {
    pub view: ImageView,
    pub width: u32,
    pub height: u32,
}

/// Stacks image views along one axis on a solid background.
#[derive(Debug, Clone)]
pub struct LinearLayout {
    orientation: Orientation,
    background: Rgba<u8>,
    children: Vec<LayoutChild>,
}

impl LinearLayout {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            background: Rgba([0, 0, 0, 0]),
            children: Vec::new(),
        }
    }

    pub fn vertical() -> Self {
        Self::new(Orientation::Vertical)
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn add_view(&mut self, view: ImageView, width: u32, height: u32) {
        self.children.push(LayoutChild {
            view,
            width,
            height,
        });
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    pub fn children(&self) -> &[LayoutChild] {
        &self.children
    }

    /// Sum along the orientation axis, max across it. Saturates at `u32::MAX`.
    pub fn measure(&self) -> (u32, u32) {
        let along = |c: &LayoutChild| match self.orientation {
            Orientation::Vertical => c.height,
            Orientation::Horizontal => c.width,
        };
        let across = |c: &LayoutChild| match self.orientation {
            Orientation::Vertical => c.width,
            Orientation::Horizontal => c.height,
        };
        let main = self
            .children
            .iter()
            .map(along)
            .fold(0u32, u32::saturating_add);
        let cross = self.children.iter().map(across).max().unwrap_or(0);
        match self.orientation {
            Orientation::Vertical => (cross, main),
            Orientation::Horizontal => (main, cross),
        }
    }

    /// Top-left corner of every child, in layout coordinates.
    pub fn offsets(&self) -> Vec<(u32, u32)> {
        let mut cursor = 0u32;
        self.children
            .iter()
            .map(|c| {
                let offset = match self.orientation {
                    Orientation::Vertical => (0, cursor),
                    Orientation::Horizontal => (cursor, 0),
                };
                cursor = cursor.saturating_add(match self.orientation {
                    Orientation::Vertical => c.height,
                    Orientation::Horizontal => c.width,
                });
                offset
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(w: u32, h: u32) -> ImageView {
        ImageView::new(RasterImage::filled(w, h, [255, 0, 0, 255]))
    }

    #[test]
    fn test_fit_center_wide_image() {
        let placement = view(300, 150).placement(200, 200);
        assert_eq!(
            placement,
            Placement {
                x: 0,
                y: 50,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn test_fit_center_tall_image() {
        let placement = view(100, 400).placement(200, 200);
        assert_eq!((placement.width, placement.height), (50, 200));
        assert_eq!((placement.x, placement.y), (75, 0));
    }

    #[test]
    fn test_fit_xy_fills_cell() {
        let placement = view(300, 150)
            .with_scale(ScaleType::FitXy)
            .placement(200, 200);
        assert_eq!((placement.width, placement.height), (200, 200));
    }

    #[test]
    fn test_render_same_size_is_exact_copy() {
        let image = RasterImage::filled(4, 4, [1, 2, 3, 4]);
        let cell = ImageView::new(image.clone()).render(4, 4);
        assert_eq!(cell.as_raw(), image.as_bytes());
    }

    #[test]
    fn test_render_leaves_letterbox_transparent() {
        let cell = view(300, 150).render(200, 200);
        assert_eq!(cell.get_pixel(100, 10).0[3], 0);
        assert!(cell.get_pixel(100, 100).0[0] >= 250);
    }

    #[test]
    fn test_vertical_measure_and_offsets() {
        let mut layout = LinearLayout::vertical();
        layout.add_view(view(10, 10), 200, 200);
        layout.add_view(view(10, 10), 150, 200);

        assert_eq!(layout.measure(), (200, 400));
        assert_eq!(layout.offsets(), vec![(0, 0), (0, 200)]);
    }

    #[test]
    fn test_horizontal_measure_and_offsets() {
        let mut layout = LinearLayout::new(Orientation::Horizontal);
        layout.add_view(view(10, 10), 50, 20);
        layout.add_view(view(10, 10), 30, 40);

        assert_eq!(layout.measure(), (80, 40));
        assert_eq!(layout.offsets(), vec![(0, 0), (50, 0)]);
    }

    #[test]
    fn test_empty_layout_measures_zero() {
        assert_eq!(LinearLayout::vertical().measure(), (0, 0));
    }

    #[test]
    fn test_scaled_mask_keeps_rim_color() {
        let red = RasterImage::filled(300, 150, [255, 0, 0, 255]);
        let masked = crate::internal::transform::round_mask(&red).unwrap();
        let cell = ImageView::new(masked).render(200, 200);

        let mut rim = 0;
        for (x, y, p) in cell.enumerate_pixels() {
            if p[3] > 0 {
                assert!(p[0] >= 250, "({x}, {y}) darkened to {p:?}");
                if p[3] < 255 {
                    rim += 1;
                }
            }
        }
        assert!(rim > 0);
    }

    #[test]
    fn test_render_visible_clips_cell() {
        let cell = view(300, 150).render_visible(200, 200, (40, 60));
        assert_eq!(cell.dimensions(), (40, 60));
        // image starts at y = 50
        assert_eq!(cell.get_pixel(10, 40)[3], 0);
        assert_eq!(cell.get_pixel(10, 55)[0], 255);

        let hidden = view(300, 150).render_visible(200, 200, (200, 20));
        assert!(hidden.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_huge_cells_do_not_overflow() {
        let mut layout = LinearLayout::vertical();
        layout.add_view(view(10, 10), 200, 3_000_000_000);
        layout.add_view(view(10, 10), 200, 3_000_000_000);

        assert_eq!(layout.measure(), (200, u32::MAX));
        assert_eq!(layout.offsets(), vec![(0, 0), (0, 3_000_000_000)]);
    }

    #[test]
    fn test_check_cell_bounds() {
        assert!(check_cell(200, 200).is_ok());
        assert!(check_cell(MAX_SURFACE_EDGE, 1).is_ok());
        assert!(matches!(
            check_cell(0, 200),
            Err(SnapError::InvalidCell { width: 0, height: 200 })
        ));
        assert!(check_cell(200, MAX_SURFACE_EDGE + 1).is_err());
    }
}
