mod tui;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use tracing_appender::non_blocking::WorkerGuard;

use bitmap_snap::config::AppConfig;
use bitmap_snap::internal::fixtures::decode_file;
use bitmap_snap::internal::harness::{DEFAULT_FIXTURE, DEFAULT_SNAPSHOT, VisualRegression};
use bitmap_snap::internal::snapshot::SnapshotOutcome;
use bitmap_snap::internal::ui::preview::SnapshotPreview;
use bitmap_snap::internal::ui::surface::RasterHost;
use bitmap_snap::{EdgeMode, round_mask_with};

#[derive(Debug, Parser)]
#[command(name = "bitmap-snap", version, about = "Round-mask visual regression checks")]
struct Cli {
    /// Config file to use instead of the default lookup
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compose original and masked fixture and compare against the baseline
    Check {
        #[arg(long, default_value = DEFAULT_FIXTURE)]
        fixture: String,
        /// Snapshot identity
        #[arg(long, default_value = DEFAULT_SNAPSHOT)]
        name: String,
        /// Replace a mismatching baseline
        #[arg(long)]
        update: bool,
        #[arg(long)]
        edge: Option<EdgeMode>,
    },
    /// Apply the round mask to an image file and write a PNG
    Mask {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = EdgeMode::Hard)]
        edge: EdgeMode,
    },
    /// Show the composed surface in the terminal
    Preview {
        #[arg(long, default_value = DEFAULT_FIXTURE)]
        fixture: String,
        #[arg(long)]
        edge: Option<EdgeMode>,
    },
    /// Write the default configuration
    InitConfig {
        #[arg(long, default_value = "config.ron")]
        path: PathBuf,
    },
}

fn env_filter(config: &AppConfig) -> tracing_subscriber::EnvFilter {
    // RUST_LOG wins over the configured levels
    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
        Err(_) => {
            let mut filter_str = config.logging.level.to_string();
            for (module, level) in &config.logging.module_levels {
                filter_str.push_str(&format!(",{}={}", module, level));
            }
            tracing_subscriber::EnvFilter::new(filter_str)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env();
            Ok(config)
        }
        None => Ok(AppConfig::load()),
    }
}

fn init_logging(config: &AppConfig, to_file: bool) -> Option<WorkerGuard> {
    if to_file {
        // The preview owns the terminal, so logs go to a daily rolling file.
        let log_dir = config.logging.log_directory.as_deref().unwrap_or("logs");
        let file_appender = tracing_appender::rolling::daily(log_dir, "bitmap-snap.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(config))
            .with_writer(non_blocking)
            .with_ansi(false)
            .compact()
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(config))
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let _guard = init_logging(&config, matches!(cli.command, Command::Preview { .. }));

    match cli.command {
        Command::Check {
            fixture,
            name,
            update,
            edge,
        } => run_check(config, &fixture, &name, update, edge),
        Command::Mask {
            input,
            output,
            edge,
        } => run_mask(&input, &output, edge),
        Command::Preview { fixture, edge } => run_preview(&config, &fixture, edge),
        Command::InitConfig { path } => AppConfig::default().save_to(&path),
    }
}

fn harness_for(
    config: &AppConfig,
    edge: Option<EdgeMode>,
) -> Result<(VisualRegression, RasterHost)> {
    let mut harness = VisualRegression::from_config(config)?;
    if let Some(edge) = edge {
        harness = harness.with_edge_mode(edge);
    }
    let host = RasterHost::new(config.surface_width, config.surface_height);
    Ok((harness, host))
}

fn run_check(
    mut config: AppConfig,
    fixture: &str,
    name: &str,
    update: bool,
    edge: Option<EdgeMode>,
) -> Result<()> {
    config.update_baselines |= update;
    let (harness, host) = harness_for(&config, edge)?;

    let report = harness
        .run(&host, fixture, name)
        .with_context(|| format!("visual check `{name}` failed"))?;

    let verdict = match &report.outcome {
        SnapshotOutcome::Seeded => "seeded".to_string(),
        SnapshotOutcome::Matched(diff) => {
            format!("matched ({} pixels differ)", diff.diff_pixels)
        }
        SnapshotOutcome::Updated(diff) => {
            format!("updated ({} pixels differed)", diff.diff_pixels)
        }
    };
    println!(
        "{name}: {verdict} {}x{} baseline={}",
        report.width,
        report.height,
        report.baseline.display()
    );
    Ok(())
}

fn run_mask(input: &Path, output: &Path, edge: EdgeMode) -> Result<()> {
    let image = decode_file(input).with_context(|| format!("cannot read {}", input.display()))?;
    let masked = round_mask_with(&image, edge)?;
    masked.save_png(output)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        %edge,
        "mask written"
    );
    Ok(())
}

fn run_preview(config: &AppConfig, fixture: &str, edge: Option<EdgeMode>) -> Result<()> {
    let (harness, host) = harness_for(config, edge)?;
    let composed = harness.compose(&host, fixture)?;
    let title = format!(" {} (any key to close) ", composed.fixture.display());

    let mut terminal = tui::init().context("Failed to initialize terminal")?;
    let drawn = terminal.draw(|f| {
        let preview = SnapshotPreview::new(&composed.capture).title(&title);
        f.render_widget(preview, f.area());
    });

    let waited = drawn.and_then(|_| loop {
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            break Ok(());
        }
    });

    // Restore the terminal before reporting anything.
    tui::restore()?;
    waited.context("preview failed")?;
    Ok(())
}
