//! Visual regression checks for bitmap transforms.
//!
//! A fixture image is decoded twice, one copy goes through [`round_mask`], both
//! are mounted in a vertical layout on a headless surface and the capture is
//! compared against a stored baseline.

pub mod config;
pub mod internal;
pub mod utils;

pub use internal::error::{SnapError, SnapResult};
pub use internal::harness::{RunReport, VisualRegression};
pub use internal::models::RasterImage;
pub use internal::snapshot::{DiffReport, SnapshotOutcome, SnapshotStore, Tolerance};
pub use internal::transform::{EdgeMode, round_mask, round_mask_with};
