use image::ImageReader;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use super::error::{SnapError, SnapResult};
use super::models::{Fixture, RasterImage};

static FIXTURE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9_.-]*$").expect("regex compiles"));

/// Resolves fixture names against a list of root directories, first hit wins.
#[derive(Debug, Clone)]
pub struct FixtureResolver {
    roots: Vec<PathBuf>,
}

impl FixtureResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    /// Add a fallback root searched after the existing ones.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn resolve(&self, name: &str) -> SnapResult<Fixture> {
        if FIXTURE_NAME.is_match(name) {
            for root in &self.roots {
                let candidate = root.join(name);
                if candidate.is_file() {
                    let path = std::path::absolute(&candidate)?;
                    tracing::debug!(fixture = name, path = %path.display(), "fixture resolved");
                    return Ok(Fixture {
                        name: name.to_string(),
                        path,
                    });
                }
            }
        }

        let searched = self
            .roots
            .iter()
            .map(|r| r.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(SnapError::FixtureNotFound {
            name: name.to_string(),
            searched,
        })
    }

    /// Decode a fresh, independent copy of the fixture.
    pub fn decode(&self, fixture: &Fixture) -> SnapResult<RasterImage> {
        decode_file(&fixture.path)
    }
}

/// Decode a PNG or JPEG file into RGBA8. The format is sniffed from the content
/// and falls back to the file extension.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn decode_file(path: &Path) -> SnapResult<RasterImage> {
    let start = std::time::Instant::now();
    let decode_err = |source| SnapError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let decoded = reader.decode().map_err(decode_err)?;
    let image = RasterImage::from(decoded.to_rgba8());

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        elapsed = ?start.elapsed(),
        "decoded"
    );
    Ok(image)
}
