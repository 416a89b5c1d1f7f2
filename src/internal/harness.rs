use image::Rgba;
use std::path::PathBuf;

use super::error::SnapResult;
use super::fixtures::FixtureResolver;
use super::models::RasterImage;
use super::snapshot::{SnapshotOutcome, SnapshotStore};
use super::transform::{EdgeMode, round_mask_with};
use super::ui::layout::{ImageView, LinearLayout, check_cell};
use super::ui::surface::{Surface, SurfaceHost};
use crate::config::AppConfig;
use crate::utils::color::{Palette, parse_color};

/// Fixture used by the default round-bitmap check.
pub const DEFAULT_FIXTURE: &str = "christine.jpg";
/// Snapshot identity of the default round-bitmap check.
pub const DEFAULT_SNAPSHOT: &str = "round_bitmap";

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub fixture: PathBuf,
    pub baseline: PathBuf,
    pub width: u32,
    pub height: u32,
    pub digest: String,
    pub outcome: SnapshotOutcome,
}

/// Original next to masked: decodes a fixture twice, masks the second copy,
/// stacks both in image views and checks the captured surface.
#[derive(Debug, Clone)]
pub struct VisualRegression {
    resolver: FixtureResolver,
    store: SnapshotStore,
    edge_mode: EdgeMode,
    background: Rgba<u8>,
    cell: (u32, u32),
    enable_performance_metrics: bool,
}

impl VisualRegression {
    pub fn new(resolver: FixtureResolver, store: SnapshotStore) -> Self {
        Self {
            resolver,
            store,
            edge_mode: EdgeMode::Hard,
            background: Palette::Grey200.rgba(),
            cell: (200, 200),
            enable_performance_metrics: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let background = parse_color(&config.background)?;
        let store = SnapshotStore::new(&config.snapshot_dir)
            .with_tolerance(config.tolerance)
            .with_update(config.update_baselines)
            .with_metrics(config.logging.enable_performance_metrics);
        check_cell(config.cell_width, config.cell_height)?;
        let mut harness = Self::new(FixtureResolver::new(&config.fixture_dir), store)
            .with_edge_mode(config.edge_mode)
            .with_background(background)
            .with_cell_size(config.cell_width, config.cell_height);
        harness.enable_performance_metrics = config.logging.enable_performance_metrics;
        Ok(harness)
    }

    pub fn with_edge_mode(mut self, edge_mode: EdgeMode) -> Self {
        self.edge_mode = edge_mode;
        self
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn with_cell_size(mut self, width: u32, height: u32) -> Self {
        self.cell = (width, height);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Resolve, decode twice, mount both views and capture the surface.
    #[tracing::instrument(skip(self, host), fields(edge = %self.edge_mode))]
    pub fn compose<H: SurfaceHost>(&self, host: &H, fixture: &str) -> SnapResult<Composed> {
        let start = std::time::Instant::now();
        let (cw, ch) = self.cell;
        check_cell(cw, ch)?;

        let fixture = self.resolver.resolve(fixture)?;
        let original = self.resolver.decode(&fixture)?;
        let second = self.resolver.decode(&fixture)?;

        let mut surface = host.launch()?;

        let masked = round_mask_with(&second, self.edge_mode)?;
        let mut layout = LinearLayout::vertical().with_background(self.background);
        layout.add_view(ImageView::new(original), cw, ch);
        layout.add_view(ImageView::new(masked), cw, ch);
        surface.attach(layout)?;

        let capture = surface.capture()?;
        if self.enable_performance_metrics {
            tracing::debug!(elapsed = ?start.elapsed(), "harness.compose");
        }

        Ok(Composed {
            fixture: fixture.path,
            capture,
        })
    }

    /// Compose and check the capture against the baseline named `test_name`.
    #[tracing::instrument(skip(self, host))]
    pub fn run<H: SurfaceHost>(
        &self,
        host: &H,
        fixture: &str,
        test_name: &str,
    ) -> SnapResult<RunReport> {
        let composed = self.compose(host, fixture)?;
        let outcome = self.store.check(test_name, &composed.capture)?;
        tracing::info!(?outcome, "visual check finished");

        Ok(RunReport {
            fixture: composed.fixture,
            baseline: self.store.baseline_path(test_name),
            width: composed.capture.width(),
            height: composed.capture.height(),
            digest: composed.capture.digest(),
            outcome,
        })
    }
}

/// A captured surface and the fixture it was built from.
#[derive(Debug, Clone)]
pub struct Composed {
    pub fixture: PathBuf,
    pub capture: RasterImage,
}
