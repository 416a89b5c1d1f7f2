//! Baseline storage and comparison for captured surfaces.
//!
//! Layout on disk, relative to the store directory:
//! - `<name>.png`  baseline image
//! - `<name>.json` manifest (dimensions, digest, recording time)
//! - `failures/<name>.png` and `failures/<name>.diff.png` after a mismatch

use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{SnapError, SnapResult};
use super::fixtures::decode_file;
use super::models::{RasterImage, SnapshotManifest};

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("regex compiles"));

/// How far a capture may drift from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// A pixel counts as different when any channel moves by more than this.
    pub color_threshold: u8,
    /// Fraction of differing pixels still accepted (0.0 - 1.0).
    pub max_diff_ratio: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            color_threshold: 8,
            max_diff_ratio: 0.001,
        }
    }
}

impl Tolerance {
    pub fn exact() -> Self {
        Self {
            color_threshold: 0,
            max_diff_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    pub width: u32,
    pub height: u32,
    pub diff_pixels: u64,
    pub max_channel_delta: u8,
    pub mean_channel_delta: f64,
    pub actual_digest: String,
    pub baseline_digest: String,
}

impl DiffReport {
    pub fn total_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn diff_ratio(&self) -> f64 {
        match self.total_pixels() {
            0 => 0.0,
            total => self.diff_pixels as f64 / total as f64,
        }
    }

    pub fn is_identical(&self) -> bool {
        self.actual_digest == self.baseline_digest
    }

    pub fn within(&self, tolerance: &Tolerance) -> bool {
        self.diff_ratio() <= tolerance.max_diff_ratio
    }

    fn summary(&self) -> String {
        format!(
            "{} of {} pixels differ ({:.3}%), max channel delta {}, mean {:.3}",
            self.diff_pixels,
            self.total_pixels(),
            self.diff_ratio() * 100.0,
            self.max_channel_delta,
            self.mean_channel_delta
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// No baseline existed; the capture became the baseline.
    Seeded,
    Matched(DiffReport),
    /// The capture differed and replaced the baseline.
    Updated(DiffReport),
}

/// Compare two images of equal size pixel by pixel.
///
/// Returns `None` when the dimensions differ.
pub fn compare(actual: &RasterImage, baseline: &RasterImage, threshold: u8) -> Option<DiffReport> {
    if actual.dimensions() != baseline.dimensions() {
        return None;
    }
    let (width, height) = actual.dimensions();
    let actual_digest = actual.digest();
    let baseline_digest = baseline.digest();

    if actual_digest == baseline_digest {
        return Some(DiffReport {
            width,
            height,
            diff_pixels: 0,
            max_channel_delta: 0,
            mean_channel_delta: 0.0,
            actual_digest,
            baseline_digest,
        });
    }

    let mut diff_pixels = 0u64;
    let mut max_channel_delta = 0u8;
    let mut delta_sum = 0u64;
    for (a, b) in actual
        .as_bytes()
        .chunks_exact(4)
        .zip(baseline.as_bytes().chunks_exact(4))
    {
        let worst = a
            .iter()
            .zip(b)
            .map(|(x, y)| {
                let d = x.abs_diff(*y);
                delta_sum += u64::from(d);
                d
            })
            .max()
            .unwrap_or(0);
        max_channel_delta = max_channel_delta.max(worst);
        if worst > threshold {
            diff_pixels += 1;
        }
    }

    let channels = actual.as_bytes().len().max(1) as f64;
    Some(DiffReport {
        width,
        height,
        diff_pixels,
        max_channel_delta,
        mean_channel_delta: delta_sum as f64 / channels,
        actual_digest,
        baseline_digest,
    })
}

/// Differing pixels in red over a dimmed copy of the capture.
pub fn diff_image(actual: &RasterImage, baseline: &RasterImage, threshold: u8) -> RasterImage {
    let (width, height) = actual.dimensions();
    let out = RgbaImage::from_fn(width, height, |x, y| {
        let a = actual.pixel(x, y).unwrap_or([0; 4]);
        let differs = match baseline.pixel(x, y) {
            Some(b) => a.iter().zip(b).any(|(p, q)| p.abs_diff(q) > threshold),
            None => true,
        };
        if differs {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([a[0] / 2, a[1] / 2, a[2] / 2, 128])
        }
    });
    RasterImage::from(out)
}

/// Filesystem-safe snapshot name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned = UNSAFE_NAME_CHARS.replace_all(name.trim(), "_");
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "snapshot".to_string()
    } else {
        cleaned.into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    tolerance: Tolerance,
    update: bool,
    enable_performance_metrics: bool,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tolerance: Tolerance::default(),
            update: false,
            enable_performance_metrics: false,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Overwrite baselines that no longer match instead of failing.
    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn with_metrics(mut self, enable_performance_metrics: bool) -> Self {
        self.enable_performance_metrics = enable_performance_metrics;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", sanitize_name(name)))
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(name)))
    }

    pub fn failure_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        let name = sanitize_name(name);
        let failures = self.dir.join("failures");
        (
            failures.join(format!("{name}.png")),
            failures.join(format!("{name}.diff.png")),
        )
    }

    pub fn load_manifest(&self, name: &str) -> SnapResult<SnapshotManifest> {
        let content = fs::read_to_string(self.manifest_path(name))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check `capture` against the baseline stored under `name`.
    pub fn check(&self, name: &str, capture: &RasterImage) -> SnapResult<SnapshotOutcome> {
        let start = std::time::Instant::now();
        let baseline_path = self.baseline_path(name);

        if !baseline_path.is_file() {
            self.write_baseline(name, capture)?;
            tracing::info!(snapshot = name, path = %baseline_path.display(), "baseline seeded");
            return Ok(SnapshotOutcome::Seeded);
        }

        if let Ok(manifest) = self.load_manifest(name)
            && !manifest.source_name.is_empty()
            && manifest.source_name != name
        {
            return Err(SnapError::SnapshotMismatch {
                name: name.to_string(),
                detail: format!(
                    "baseline {} belongs to snapshot `{}`",
                    baseline_path.display(),
                    manifest.source_name
                ),
            });
        }

        let baseline = decode_file(&baseline_path)?;
        let report = compare(capture, &baseline, self.tolerance.color_threshold);
        if self.enable_performance_metrics {
            tracing::debug!(elapsed = ?start.elapsed(), snapshot = name, "snapshot.compare");
        }

        let detail = match &report {
            Some(report) if report.within(&self.tolerance) => {
                tracing::info!(snapshot = name, diff_pixels = report.diff_pixels, "snapshot matched");
                return Ok(SnapshotOutcome::Matched(report.clone()));
            }
            Some(report) => report.summary(),
            None => format!(
                "dimensions differ: capture {}x{}, baseline {}x{}",
                capture.width(),
                capture.height(),
                baseline.width(),
                baseline.height()
            ),
        };

        if self.update {
            self.write_baseline(name, capture)?;
            tracing::warn!(snapshot = name, %detail, "baseline updated");
            let report = report.unwrap_or_else(|| DiffReport {
                width: capture.width(),
                height: capture.height(),
                diff_pixels: u64::from(capture.width()) * u64::from(capture.height()),
                max_channel_delta: u8::MAX,
                mean_channel_delta: f64::from(u8::MAX),
                actual_digest: capture.digest(),
                baseline_digest: baseline.digest(),
            });
            return Ok(SnapshotOutcome::Updated(report));
        }

        let (actual_path, diff_path) = self.failure_paths(name);
        capture.save_png(&actual_path)?;
        diff_image(capture, &baseline, self.tolerance.color_threshold).save_png(&diff_path)?;
        tracing::error!(
            snapshot = name,
            %detail,
            actual = %actual_path.display(),
            diff = %diff_path.display(),
            "snapshot mismatch"
        );

        Err(SnapError::SnapshotMismatch {
            name: name.to_string(),
            detail,
        })
    }

    fn write_baseline(&self, name: &str, capture: &RasterImage) -> SnapResult<()> {
        capture.save_png(&self.baseline_path(name))?;
        let manifest = SnapshotManifest {
            name: sanitize_name(name),
            source_name: name.to_string(),
            width: capture.width(),
            height: capture.height(),
            digest: capture.digest(),
            recorded_at: jiff::Timestamp::now(),
        };
        fs::write(
            self.manifest_path(name),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        Ok(())
    }
}
