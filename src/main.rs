//! Grazing Features CLI
//!
//! Windowed feature extraction for dual-IMU grazing-activity recordings.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use grazing_features::{
    combine_datasets, config::Config, core::OutputFormat, extract_with_stats, FeatureSchema,
    RunReport, WindowParams, VERSION,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "grazing-features")]
#[command(version = VERSION)]
#[command(about = "Windowed feature extraction for grazing-activity IMU recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge recordings and write one feature vector per window
    Extract {
        /// Directory holding the recording CSV files
        #[arg(long, short)]
        data_dir: Option<PathBuf>,

        /// Rows per window
        #[arg(long)]
        window_size: Option<usize>,

        /// Rows between consecutive window starts
        #[arg(long)]
        step_size: Option<usize>,

        /// Destination of the feature table
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (csv, json or jsonl); guessed from the output
        /// extension when omitted
        #[arg(long)]
        format: Option<String>,

        /// Configuration file to use instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the feature column names
    Schema {
        /// Configuration file to use instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the report of the last run
    Status,

    /// Show configuration
    Config,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            data_dir,
            window_size,
            step_size,
            output,
            format,
            config,
        } => cmd_extract(
            config.as_deref(),
            data_dir,
            window_size,
            step_size,
            output,
            format.as_deref(),
        ),
        Commands::Schema { config } => cmd_schema(config.as_deref()),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Config::load().context("failed to load configuration"),
    }
}

fn cmd_extract(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
    window_size: Option<usize>,
    step_size: Option<usize>,
    output: Option<PathBuf>,
    format: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    if let Err(e) = config.ensure_directories() {
        warn!("Could not create directories: {e}");
    }

    let data_dir = data_dir.unwrap_or_else(|| config.data_path.clone());
    let output = output.unwrap_or_else(|| config.output_path.clone());
    let params = WindowParams::new(
        window_size.unwrap_or(config.window.window_size),
        step_size.unwrap_or(config.window.step_size),
    )?;
    let format = match format {
        Some(f) => f.parse::<OutputFormat>().map_err(anyhow::Error::msg)?,
        None => OutputFormat::from_path(&output).unwrap_or(OutputFormat::Csv),
    };

    println!("Grazing Features v{VERSION}");
    println!();
    println!("  Data directory: {}", data_dir.display());
    println!(
        "  Window: {} rows, step {} (overlap {})",
        params.window_size,
        params.step_size,
        params.overlap()
    );
    println!("  Output: {} ({})", output.display(), format.extension());
    println!();

    let mut report = RunReport::new(&data_dir, params);
    info!(run_id = %report.run_id(), "starting extraction");

    let dataset = combine_datasets(&data_dir, &config.columns)
        .with_context(|| format!("failed to assemble recordings from {}", data_dir.display()))?;
    report.record_dataset(&dataset);

    let (features, stats) = extract_with_stats(&dataset.table, &config.columns, params)
        .context("feature extraction failed")?;
    report.record_extraction(&stats, &features);

    if features.is_empty() {
        bail!(
            "no device has at least {} rows; nothing to write",
            params.window_size
        );
    }
    for device in &stats.devices_without_windows {
        warn!(device = %device, "device has fewer rows than one window");
    }

    features
        .write_to_path(&output, format)
        .with_context(|| format!("failed to write features to {}", output.display()))?;
    report.record_output(&output);
    report.finish();

    let report_path = config.report_path();
    if let Err(e) = report.save(&report_path) {
        warn!("Could not save run report to {}: {e}", report_path.display());
    }

    println!("{}", report.summary());
    Ok(())
}

fn cmd_schema(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let schema = FeatureSchema::for_config(&config.columns);

    for name in schema.names() {
        println!("{name}");
    }
    println!("{}", config.columns.id_column);
    println!("{}", config.columns.activity_column);
    println!("{}", config.columns.time_column);
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Grazing Features Status");
    println!("=======================");
    println!();
    println!("Configuration:");
    println!("  Data directory: {}", config.data_path.display());
    println!(
        "  Window: {} rows, step {}",
        config.window.window_size, config.window.step_size
    );
    println!();

    let report_path = config.report_path();
    if report_path.exists() {
        let stats = RunReport::load(&report_path)
            .with_context(|| format!("failed to read run report {}", report_path.display()))?;
        println!("Last run:");
        println!("{}", stats.summary());
    } else {
        println!("No previous run found.");
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("failed to serialize configuration")?
    );
    Ok(())
}
