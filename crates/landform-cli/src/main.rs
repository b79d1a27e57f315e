/// Command-line driver for multi-year landscape evolution runs.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use landform_core::{Evolution, Field, RasterEngine, SimulationConfig, StatsLedger, SyntheticTerrain};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "landform", version, about = "Soil erosion and deposition over gridded terrain")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evolve an elevation/bedrock pair for a number of years.
    Run(RunArgs),
    /// Write a seeded synthetic elevation/bedrock pair.
    Synth(SynthArgs),
}

#[derive(Args)]
struct RunArgs {
    /// JSON simulation config. Omitted keys take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    elevation: PathBuf,

    #[arg(long)]
    bedrock: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// Overrides `iterations` from the config.
    #[arg(short = 'n', long)]
    iterations: Option<u32>,

    #[arg(long)]
    keep_intermediates: bool,
}

#[derive(Args)]
struct SynthArgs {
    #[arg(long, default_value_t = 64)]
    width: usize,

    #[arg(long, default_value_t = 64)]
    height: usize,

    #[arg(long, default_value_t = 10.0)]
    cellsize: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 40.0)]
    relief: f64,

    #[arg(long, default_value_t = 1.0)]
    soil_depth: f64,

    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::Synth(args) => synth(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            SimulationConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };
    if let Some(n) = args.iterations {
        config.iterations = n;
    }
    config.keep_intermediates |= args.keep_intermediates;

    let elevation = read_field(&args.elevation)?;
    let bedrock = read_field(&args.bedrock)?;

    let mut evolution = Evolution::bootstrap(RasterEngine::new(), config, elevation, bedrock)
        .context("bootstrapping landscape")?;
    evolution.run().context("evolving landscape")?;
    let result = evolution.finish();

    fs::create_dir_all(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    let store = result.engine.into_store();
    for (name, field) in &store {
        write_json(&args.output.join(format!("{name}.json")), field)?;
    }
    write_json(&args.output.join("stats.json"), &result.ledger)?;
    write_csv(&args.output.join("stats.csv"), &result.ledger)?;

    info!(years = result.years, artifacts = store.len(), output = %args.output.display(), "run written");
    Ok(())
}

fn synth(args: SynthArgs) -> Result<()> {
    let terrain = SyntheticTerrain {
        width: args.width,
        height: args.height,
        cellsize: args.cellsize,
        seed: args.seed,
        relief: args.relief,
        soil_depth: args.soil_depth,
    };
    let (elevation, bedrock) = terrain.generate();

    fs::create_dir_all(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    write_json(&args.output.join("elevation.json"), &elevation)?;
    write_json(&args.output.join("bedrock.json"), &bedrock)?;
    info!(width = args.width, height = args.height, seed = args.seed, "synthetic terrain written");
    Ok(())
}

fn read_field(path: &Path) -> Result<Field> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let field: Field = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    anyhow::ensure!(
        field.data.len() == field.width * field.height,
        "{}: {} values for a {}x{} grid",
        path.display(),
        field.data.len(),
        field.width,
        field.height
    );
    Ok(field)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn write_csv(path: &Path, ledger: &StatsLedger) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("writing {}", path.display()))?;
    writer.write_record(ledger.csv_header())?;
    for row in ledger.csv_rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
