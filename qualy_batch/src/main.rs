mod config;
mod output;

use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use minisector::{
    compare, render_png, render_svg, Attributor, BoundaryPolicy, Event, FileTraceSource,
    RenderOptions, TraceCache,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fastest driver per minisector: VER vs HAM in qualifying", long_about = None)]
struct Cli {
    /// Directory holding `<event-slug>/<CODE>.json` lap dumps
    #[arg(long, value_hint = ValueHint::DirPath)]
    data_dir: PathBuf,

    /// Trace cache directory
    #[arg(long, default_value = "cache", value_hint = ValueHint::DirPath)]
    cache_dir: PathBuf,

    /// Do not read or write the trace cache
    #[arg(long, action = ArgAction::SetTrue)]
    no_cache: bool,

    /// Clear the trace cache before loading
    #[arg(long, action = ArgAction::SetTrue)]
    clear_cache: bool,

    /// Event name or slug (e.g. "Abu Dhabi", monza)
    #[arg(long, conflicts_with = "all")]
    event: Option<String>,

    /// Process every event
    #[arg(long, action = ArgAction::SetTrue)]
    all: bool,

    /// Number of minisectors (defaults to the configured default)
    #[arg(long, allow_negative_numbers = true)]
    segments: Option<i64>,

    /// Where the furthest sample of the lap is placed
    #[arg(long, value_enum)]
    boundary: Option<BoundaryOpt>,

    /// Output PNG path
    #[arg(short, long, default_value = "Comparison.png", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Also write an SVG figure
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Write the labelled samples as CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    samples_csv: Option<PathBuf>,

    /// Disable plot generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Comparison config JSON (defaults to ./qualy.json when present)
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BoundaryOpt {
    Clamp,
    Overflow,
}

impl From<BoundaryOpt> for BoundaryPolicy {
    fn from(value: BoundaryOpt) -> Self {
        match value {
            BoundaryOpt::Clamp => BoundaryPolicy::Clamp,
            BoundaryOpt::Overflow => BoundaryPolicy::Overflow,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let boundary = cli.boundary.map(Into::into).unwrap_or(config.boundary);
    let attributor = Attributor::new(boundary);
    let segments = cli.segments.unwrap_or(config.segments.default as i64);
    if let Err(err) = config.segments.check(segments) {
        warn!("{}; continuing anyway", err);
    }

    let events: Vec<Event> = if cli.all {
        Event::ALL.to_vec()
    } else {
        let name = cli
            .event
            .as_deref()
            .ok_or_else(|| anyhow!("pass --event <NAME> or --all"))?;
        vec![name.parse::<Event>()?]
    };

    let cache = if cli.no_cache {
        TraceCache::disabled()
    } else {
        TraceCache::init(&cli.cache_dir)
            .with_context(|| format!("failed to create cache {}", cli.cache_dir.display()))?
    };
    if cli.clear_cache {
        cache.invalidate().context("failed to clear trace cache")?;
    }
    let source = FileTraceSource::new(&cli.data_dir, cache);
    info!(
        "{} {} {}: {} event(s), {} minisectors, {:?} boundary",
        config.season,
        config.session,
        cli.data_dir.display(),
        events.len(),
        segments,
        boundary
    );

    let mut failed = 0usize;
    for &event in &events {
        if let Err(err) = process_event(&cli, &source, &attributor, event, segments) {
            error!("{}: {:#}", event, err);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} event(s) failed", failed, events.len());
    }
    Ok(())
}

fn process_event(
    cli: &Cli,
    source: &FileTraceSource,
    attributor: &Attributor,
    event: Event,
    segments: i64,
) -> Result<()> {
    let comparison = compare(source, event, segments, attributor)?;
    let attribution = &comparison.attribution;
    let title = comparison.title();
    let target = |path: &PathBuf| {
        if cli.all {
            output::with_event_suffix(path, event)
        } else {
            path.clone()
        }
    };

    if let Some(path) = cli.samples_csv.as_ref() {
        let path = target(path);
        output::write_samples_csv(&attribution.samples, &path)?;
        info!("Wrote samples CSV: {}", path.display());
    }

    if cli.no_plot {
        return Ok(());
    }
    let opts = RenderOptions::default();

    let png = target(&cli.output);
    render_png(attribution, &title, &png, &opts)
        .with_context(|| format!("failed to render {}", png.display()))?;
    info!("Wrote plot: {}", png.display());

    if let Some(path) = cli.svg.as_ref() {
        let path = target(path);
        let svg = render_svg(attribution, &title, &opts)
            .with_context(|| format!("failed to render {}", path.display()))?;
        std::fs::write(&path, svg).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote plot: {}", path.display());
    }
    Ok(())
}
