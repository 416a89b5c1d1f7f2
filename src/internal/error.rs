use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single visual regression run. None of them are retried.
#[derive(Debug, Error)]
pub enum SnapError {
    #[error("fixture not found: {name} (searched {searched})")]
    FixtureNotFound { name: String, searched: String },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid image: {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error("cell {width}x{height} must be between 1 and 16384 px on each edge")]
    InvalidCell { width: u32, height: u32 },

    #[error("host surface could not be launched: {0}")]
    HostLaunch(String),

    #[error("snapshot `{name}` differs from baseline: {detail}")]
    SnapshotMismatch { name: String, detail: String },

    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type SnapResult<T> = Result<T, SnapError>;
