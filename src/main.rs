use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use image::ImageReader;
use log::LevelFilter;

use gcp_locator::{
    ClassifierStore, ColorPairDetector, DebugConfig, Detection, DirectorySource, GcpConfig,
    GcpLocator, Strategy,
};

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    ColorPair,
    Cascade,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::ColorPair => Strategy::ColorPair,
            StrategyArg::Cascade => Strategy::Cascade,
        }
    }
}

#[derive(Parser)]
#[command(name = "gcp-locate")]
#[command(about = "Locate ground control point markers in a photograph")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Detection strategy (overrides the config file)
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the cascade models
    #[arg(long, value_name = "DIR")]
    models_dir: Option<PathBuf>,

    /// Cascade model name, in detection order (repeatable, replaces the configured list)
    #[arg(long = "model", value_name = "NAME")]
    models: Vec<String>,

    /// Save debug masks to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = match &args.config {
        Some(path) => GcpConfig::from_json_file(path)?,
        None => GcpConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(dir) = args.models_dir {
        config.models_dir = dir;
    }
    if !args.models.is_empty() {
        config.models = args.models;
    }

    log::debug!("Loading image: {:?}", args.image_path);
    let img = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    log::debug!("Image loaded: {}x{}", img.width(), img.height());

    let store = Arc::new(ClassifierStore::new(
        DirectorySource::new(&config.models_dir),
        config.models.clone(),
    ));
    let color = ColorPairDetector::with_params(config.color.clone());
    let mut locator = GcpLocator::new(config.strategy, color, store);
    if let Some(cascade) = locator.cascade_mut() {
        cascade.params = config.scan.clone();
    }
    if let Some(debug_dir) = args.debug_out {
        locator = locator.with_debug(DebugConfig::new(debug_dir)?);
    }

    match locator.locate(&img).await? {
        Detection::Found(points) => {
            println!("\n=== GCP Detection Results ===");
            println!("Markers found: {}", points.len());
            for (i, p) in points.iter().enumerate() {
                println!("  Marker {} at ({:.1}, {:.1})", i + 1, p.x, p.y);
            }
        }
        Detection::NotFound => {
            println!("No GCP marker detected in the image.");
        }
    }

    Ok(())
}
