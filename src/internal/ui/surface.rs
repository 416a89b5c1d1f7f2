//! Renderable surfaces that a view tree can be attached to and captured from.

use image::{Rgba, RgbaImage};

use super::layout::{LinearLayout, check_cell};
use crate::internal::error::{SnapError, SnapResult};
use crate::internal::models::RasterImage;
use crate::utils::color::{Palette, blend_over};

/// Largest surface edge a host will create.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

/// A window-like target that owns one root layout at a time.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Attach `root`, replacing whatever was attached before.
    fn attach(&mut self, root: LinearLayout) -> SnapResult<()>;

    /// Composite the current contents into a new image.
    fn capture(&self) -> SnapResult<RasterImage>;
}

/// Creates surfaces. One surface per run; it is dropped when the run ends.
pub trait SurfaceHost {
    type Surface: Surface;

    fn launch(&self) -> SnapResult<Self::Surface>;
}

/// Headless software host.
#[derive(Debug, Clone)]
pub struct RasterHost {
    width: u32,
    height: u32,
    window_background: Rgba<u8>,
}

impl RasterHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            window_background: Palette::White.rgba(),
        }
    }

    pub fn with_window_background(mut self, color: Rgba<u8>) -> Self {
        self.window_background = color;
        self
    }
}

impl SurfaceHost for RasterHost {
    type Surface = RasterSurface;

    fn launch(&self) -> SnapResult<RasterSurface> {
        if self.width == 0 || self.height == 0 {
            return Err(SnapError::HostLaunch(format!(
                "surface must not be empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_SURFACE_EDGE || self.height > MAX_SURFACE_EDGE {
            return Err(SnapError::HostLaunch(format!(
                "surface {}x{} exceeds {MAX_SURFACE_EDGE}px",
                self.width, self.height
            )));
        }

        tracing::debug!(width = self.width, height = self.height, "surface launched");
        Ok(RasterSurface {
            width: self.width,
            height: self.height,
            window_background: self.window_background,
            root: None,
        })
    }
}

#[derive(Debug)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    window_background: Rgba<u8>,
    root: Option<LinearLayout>,
}

impl RasterSurface {
    fn blend_region(
        canvas: &mut RgbaImage,
        origin: (u32, u32),
        size: (u32, u32),
        mut sample: impl FnMut(u32, u32) -> Rgba<u8>,
    ) {
        let (cw, ch) = canvas.dimensions();
        let x_end = origin.0.saturating_add(size.0).min(cw);
        let y_end = origin.1.saturating_add(size.1).min(ch);
        for y in origin.1..y_end {
            for x in origin.0..x_end {
                let src = sample(x - origin.0, y - origin.1);
                let dst = canvas.get_pixel_mut(x, y);
                *dst = blend_over(src, *dst);
            }
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn attach(&mut self, root: LinearLayout) -> SnapResult<()> {
        for child in root.children() {
            check_cell(child.width, child.height)?;
        }

        let (w, h) = root.measure();
        if w > self.width || h > self.height {
            tracing::warn!(
                layout = ?(w, h),
                surface = ?(self.width, self.height),
                "layout exceeds surface and will be clipped"
            );
        }
        self.root = Some(root);
        Ok(())
    }

    fn capture(&self) -> SnapResult<RasterImage> {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, self.window_background);

        if let Some(root) = &self.root {
            let background = root.background();
            Self::blend_region(&mut canvas, (0, 0), root.measure(), |_, _| background);

            for (child, (ox, oy)) in root.children().iter().zip(root.offsets()) {
                if ox >= self.width || oy >= self.height {
                    continue;
                }
                let visible = (self.width - ox, self.height - oy);
                let cell = child
                    .view
                    .render_visible(child.width, child.height, visible);
                Self::blend_region(&mut canvas, (ox, oy), cell.dimensions(), |x, y| {
                    *cell.get_pixel(x, y)
                });
            }
        }

        Ok(RasterImage::from(canvas))
    }
}
