use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::Display;

use crate::internal::snapshot::Tolerance;
use crate::internal::transform::EdgeMode;

const CONFIG_FILE: &str = "config.ron";
const APP_DIR: &str = "bitmap-snap";
const UPDATE_ENV: &str = "BITMAP_SNAP_UPDATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Per-module overrides, e.g. `{"bitmap_snap::internal::snapshot": Debug}`
    pub module_levels: HashMap<String, LogLevel>,
    /// Directory for the rolling log file used while the terminal preview is open.
    pub log_directory: Option<String>,
    /// Emit elapsed-time debug events for decode, compose and compare.
    pub enable_performance_metrics: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            module_levels: HashMap::new(),
            log_directory: None,
            enable_performance_metrics: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Directory fixtures are resolved against
    #[serde(default = "default_fixture_dir")]
    pub fixture_dir: String,
    /// Directory holding baselines, manifests and failure artifacts
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
    /// Canvas color behind the image views: `#RRGGBB`, `#RRGGBBAA` or a palette name
    #[serde(default = "default_background")]
    pub background: String,
    pub cell_width: u32,
    pub cell_height: u32,
    pub surface_width: u32,
    pub surface_height: u32,
    pub edge_mode: EdgeMode,
    pub tolerance: Tolerance,
    /// Replace mismatching baselines instead of failing
    pub update_baselines: bool,
    pub logging: LoggingConfig,
}

fn default_fixture_dir() -> String {
    "tests/fixtures".to_string()
}

fn default_snapshot_dir() -> String {
    "tests/snapshots".to_string()
}

fn default_background() -> String {
    "grey_200".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fixture_dir: default_fixture_dir(),
            snapshot_dir: default_snapshot_dir(),
            background: default_background(),
            cell_width: 200,
            cell_height: 200,
            surface_width: 200,
            surface_height: 400,
            edge_mode: EdgeMode::Hard,
            tolerance: Tolerance::default(),
            update_baselines: false,
            logging: LoggingConfig::default(),
        }
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1" | "true" | "TRUE" | "True")
    )
}

/// Rewrite the value matched by `value_re` after `key:`. `value` is inserted
/// literally, `$` included.
fn replace_key(content: &mut String, key: &str, value_re: &str, value: &str) -> Result<()> {
    let re = RegexBuilder::new(&format!(
        r#"(\b{}\s*:\s*){}"#,
        regex::escape(key),
        value_re
    ))
    .build()?;
    *content = re
        .replace_all(content, |caps: &regex::Captures| {
            format!("{}{}", &caps[1], value)
        })
        .to_string();
    Ok(())
}

impl AppConfig {
    /// Load the first readable `config.ron` from the working directory, the user
    /// config directory or next to the executable, falling back to defaults.
    pub fn load() -> Self {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE)];

        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
        }

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join(CONFIG_FILE));
        }

        let mut config = candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from(path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::error!("{e:#}");
                    None
                }
            })
            .unwrap_or_else(|| {
                tracing::info!("No config file found, using defaults");
                Self::default()
            });

        config.apply_env();
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        ron::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// `BITMAP_SNAP_UPDATE=1` forces baseline updates.
    pub fn apply_env(&mut self) {
        if env_flag(UPDATE_ENV) {
            self.update_baselines = true;
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    /// Write the config. An existing file keeps its comments: known keys are
    /// rewritten in place and everything else is left untouched. Keys missing
    /// from an existing file are not added.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let existing_content = fs::read_to_string(path).unwrap_or_default();

        if existing_content.is_empty() {
            let pretty = ron::ser::PrettyConfig::default()
                .depth_limit(3)
                .separate_tuple_members(true)
                .enumerate_arrays(true);
            let content =
                ron::ser::to_string_pretty(self, pretty).context("Failed to serialize config")?;
            fs::write(path, content)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            tracing::info!("Saved config to {}", path.display());
            return Ok(());
        }

        let mut new_content = existing_content;

        let replace_str = |content: &mut String, key: &str, value: &str| -> Result<()> {
            replace_key(content, key, r#""[^"]*""#, &ron::to_string(value)?)
        };
        let replace_val = |content: &mut String, key: &str, value: String| -> Result<()> {
            replace_key(content, key, r#"[^,\s)]+"#, &value)
        };

        replace_str(&mut new_content, "fixture_dir", &self.fixture_dir)?;
        replace_str(&mut new_content, "snapshot_dir", &self.snapshot_dir)?;
        replace_str(&mut new_content, "background", &self.background)?;
        replace_val(&mut new_content, "cell_width", self.cell_width.to_string())?;
        replace_val(&mut new_content, "cell_height", self.cell_height.to_string())?;
        replace_val(&mut new_content, "surface_width", self.surface_width.to_string())?;
        replace_val(
            &mut new_content,
            "surface_height",
            self.surface_height.to_string(),
        )?;
        replace_val(&mut new_content, "edge_mode", format!("{:?}", self.edge_mode))?;
        replace_val(
            &mut new_content,
            "update_baselines",
            self.update_baselines.to_string(),
        )?;
        replace_val(
            &mut new_content,
            "color_threshold",
            self.tolerance.color_threshold.to_string(),
        )?;
        replace_val(
            &mut new_content,
            "max_diff_ratio",
            format!("{:?}", self.tolerance.max_diff_ratio),
        )?;
        replace_val(&mut new_content, "level", format!("{:?}", self.logging.level))?;
        replace_val(
            &mut new_content,
            "enable_performance_metrics",
            self.logging.enable_performance_metrics.to_string(),
        )?;
        replace_key(
            &mut new_content,
            "log_directory",
            r#"(None|Some\s*\(\s*"[^"]*"\s*\))"#,
            &ron::to_string(&self.logging.log_directory)?,
        )?;
        replace_key(
            &mut new_content,
            "module_levels",
            r#"\{[^}]*\}"#,
            &ron::to_string(&self.logging.module_levels)?,
        )?;

        fs::write(path, new_content)
            .with_context(|| format!("Failed to update config at {}", path.display()))?;
        tracing::info!("Updated config at {} (preserving comments)", path.display());
        Ok(())
    }
}
