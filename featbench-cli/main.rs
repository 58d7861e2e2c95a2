use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use featbench_cli::{BenchConfig, CapabilityRegistry, CsvReport, FileSequence, MatchImageWriter, Sweep};
use featbench_core::{init_thread_pool, DescriptorFamily, DetectorFamily, MatcherKind, SelectorKind};
use log::{info, warn};

/// Benchmark keypoint detector and descriptor combinations on an image sequence
#[derive(Parser, Debug)]
#[command(name = "featbench", version, about)]
struct Args {
    /// Configuration file (TOML, or JSON when the extension is .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// CSV report destination
    #[arg(short, long, default_value = "results_task8.csv")]
    output: PathBuf,
    /// Detector families to sweep, comma separated
    #[arg(long, value_delimiter = ',')]
    detectors: Vec<DetectorFamily>,
    /// Descriptor families to sweep, comma separated
    #[arg(long, value_delimiter = ',')]
    descriptors: Vec<DescriptorFamily>,
    /// Search backend: bf or flann
    #[arg(long)]
    matcher: Option<MatcherKind>,
    /// Match selection: nn or knn
    #[arg(long)]
    selector: Option<SelectorKind>,
    /// Directory of the image sequence
    #[arg(long)]
    images: Option<PathBuf>,
    /// Keep only the N strongest keypoints per frame
    #[arg(long)]
    limit: Option<usize>,
    /// Keep keypoints outside the region of interest
    #[arg(long)]
    no_roi: bool,
    /// Write match images into this directory
    #[arg(long)]
    draw: Option<PathBuf>,
    /// Run pairs in parallel
    #[arg(long)]
    parallel: bool,
    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<BenchConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) if path.extension().is_some_and(|ext| ext == "json") => BenchConfig::load_json(path)?,
        Some(path) => BenchConfig::load_toml(path)?,
        None => BenchConfig::default(),
    };

    if !args.detectors.is_empty() {
        config.detectors = args.detectors.clone();
    }
    if !args.descriptors.is_empty() {
        config.descriptors = args.descriptors.clone();
    }
    if let Some(matcher) = args.matcher {
        config.matcher = matcher;
    }
    if let Some(selector) = args.selector {
        config.selector = selector;
    }
    if let Some(base) = &args.images {
        config.images.base_path = base.clone();
    }
    if args.limit.is_some() {
        config.limit_keypoints = args.limit;
    }
    if args.no_roi {
        config.roi = None;
    }
    config.parallel |= args.parallel;
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init_timed();
    let args = Args::parse();
    let config = load_config(&args)?;

    if let Some(path) = &args.save_config {
        if path.extension().is_some_and(|ext| ext == "json") {
            config.save_json(path)?;
        } else {
            config.save_toml(path)?;
        }
        info!("configuration written to {}", path.display());
        return Ok(());
    }

    if let Err(e) = init_thread_pool(config.threads) {
        warn!("thread pool already initialized: {}", e);
    }

    let source = FileSequence::new(config.images.clone());
    let writer = args.draw.as_ref().map(|dir| MatchImageWriter::new(dir.clone())).transpose()?;
    let mut sweep = Sweep::new(config, CapabilityRegistry::builtin(), &source);
    if let Some(writer) = &writer {
        sweep = sweep.with_visualizer(writer);
    }

    let mut report = CsvReport::create(&args.output)?;
    let summary = sweep.run(&mut report)?;
    info!(
        "wrote {}: {} pairs completed, {} skipped, {} failed",
        args.output.display(),
        summary.completed,
        summary.skipped,
        summary.failed
    );
    Ok(())
}
