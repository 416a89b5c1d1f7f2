use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Widget};

use crate::internal::models::RasterImage;
use crate::utils::color::blend_over;

const UPPER_HALF_BLOCK: &str = "▀";

/// Draws a raster image with half-block cells: every terminal cell shows two
/// stacked pixels, the upper one as foreground and the lower one as background.
pub struct SnapshotPreview<'a> {
    image: &'a RasterImage,
    title: Option<&'a str>,
    backdrop: [u8; 3],
    bordered: bool,
}

impl<'a> SnapshotPreview<'a> {
    pub fn new(image: &'a RasterImage) -> Self {
        Self {
            image,
            title: None,
            backdrop: [0x30, 0x30, 0x30],
            bordered: true,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn backdrop(mut self, rgb: [u8; 3]) -> Self {
        self.backdrop = rgb;
        self
    }

    pub fn borderless(mut self) -> Self {
        self.bordered = false;
        self
    }

    /// Color of virtual pixel `(px, py)` once the image is fitted into a
    /// `grid_w` x `grid_h` pixel grid.
    fn sample(&self, px: u32, py: u32, fit: &Fit) -> Color {
        let [br, bg, bb] = self.backdrop;
        let backdrop = image::Rgba([br, bg, bb, 255]);

        let inside = px >= fit.x && py >= fit.y && px < fit.x + fit.w && py < fit.y + fit.h;
        let pixel = if inside {
            let (iw, ih) = self.image.dimensions();
            let sx = (u64::from(px - fit.x) * u64::from(iw) / u64::from(fit.w)) as u32;
            let sy = (u64::from(py - fit.y) * u64::from(ih) / u64::from(fit.h)) as u32;
            self.image
                .pixel(sx.min(iw - 1), sy.min(ih - 1))
                .map(|p| blend_over(image::Rgba(p), backdrop))
                .unwrap_or(backdrop)
        } else {
            backdrop
        };
        Color::Rgb(pixel[0], pixel[1], pixel[2])
    }
}

struct Fit {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

fn fit_into(image: (u32, u32), grid: (u32, u32)) -> Option<Fit> {
    let (iw, ih) = image;
    let (gw, gh) = grid;
    if iw == 0 || ih == 0 || gw == 0 || gh == 0 {
        return None;
    }
    let scale = (f64::from(gw) / f64::from(iw)).min(f64::from(gh) / f64::from(ih));
    let w = ((f64::from(iw) * scale).round() as u32).clamp(1, gw);
    let h = ((f64::from(ih) * scale).round() as u32).clamp(1, gh);
    Some(Fit {
        x: (gw - w) / 2,
        y: (gh - h) / 2,
        w,
        h,
    })
}

impl Widget for SnapshotPreview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if self.bordered {
            let mut block = Block::default().borders(Borders::ALL);
            if let Some(title) = self.title {
                block = block.title(title);
            }
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let grid = (u32::from(inner.width), u32::from(inner.height) * 2);
        let Some(fit) = fit_into(self.image.dimensions(), grid) else {
            return;
        };

        for row in 0..inner.height {
            for col in 0..inner.width {
                let px = u32::from(col);
                let top = self.sample(px, u32::from(row) * 2, &fit);
                let bottom = self.sample(px, u32::from(row) * 2 + 1, &fit);
                if let Some(cell) = buf.cell_mut((inner.x + col, inner.y + row)) {
                    cell.set_symbol(UPPER_HALF_BLOCK)
                        .set_style(Style::default().fg(top).bg(bottom));
                }
            }
        }
    }
}
