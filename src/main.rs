//! CLI entry point for the coffeeshop zipcode maps.
//!
//! Provides subcommands for rendering the zipcode choropleth maps, writing
//! the per-zipcode aggregates, and comparing violation frequencies between
//! two groups of inspections.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use coffeeshop_maps::{
    aggregate::aggregate_by_zipcode,
    config::MapConfig,
    maps::render_maps,
    output::{FigureFormat, print_json, print_pretty, write_aggregates_csv, write_figures},
    proportions::compare_groups,
    records::load_records,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "coffeeshop_maps")]
#[command(about = "Zipcode maps and violation statistics for coffeeshop inspections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the rating, score, shop count and review count maps
    Maps {
        /// CSV of coffeeshop records
        #[arg(short, long)]
        records: PathBuf,

        /// JSON map configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Zipcode shapefile (overrides the config)
        #[arg(long)]
        shapefile: Option<PathBuf>,

        /// Directory to write the figures to (overrides the config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Figure file format
        #[arg(short, long, value_enum, default_value_t = FigureFormat::Html)]
        format: FigureFormat,
    },
    /// Write per-zipcode means and counts as CSV
    Aggregate {
        /// CSV of coffeeshop records
        #[arg(short, long)]
        records: PathBuf,

        /// CSV file to write
        #[arg(short, long, default_value = "zipcode_aggregates.csv")]
        output: PathBuf,
    },
    /// Compare violation frequencies between two groups of inspections
    Compare {
        /// CSV of the first group
        #[arg(long)]
        group_a: PathBuf,

        /// CSV of the second group
        #[arg(long)]
        group_b: PathBuf,

        /// Violation description to count; repeat to combine several
        #[arg(short, long = "violation", required = true)]
        violations: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/coffeeshop_maps.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("coffeeshop_maps.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Maps {
            records,
            config,
            shapefile,
            output_dir,
            format,
        } => {
            let mut map_config = MapConfig::load_or_default(config.as_deref())?;
            if let Some(shapefile) = shapefile {
                map_config.shapefile = shapefile;
            }
            if let Some(output_dir) = output_dir {
                map_config.output_dir = output_dir;
            }

            let records = load_records(&records)?;
            let figures = render_maps(&map_config, &records)?;
            let written = write_figures(&figures, &map_config.output_dir, format)?;

            for path in &written {
                info!(path = %path.display(), "Figure ready");
            }
        }
        Commands::Aggregate { records, output } => {
            let records = load_records(&records)?;
            let aggregates = aggregate_by_zipcode(&records);
            print_pretty(&aggregates);

            write_aggregates_csv(&output, &aggregates)?;
            info!(zipcodes = aggregates.len(), path = %output.display(), "Aggregates written");
        }
        Commands::Compare {
            group_a,
            group_b,
            violations,
        } => {
            let a = load_records(&group_a)?;
            let b = load_records(&group_b)?;
            if a.is_empty() || b.is_empty() {
                bail!("Both groups need at least one inspection record");
            }

            let comparison = compare_groups(&a, &b, &violations);
            if comparison.z.is_nan() {
                warn!("Pooled variance is zero; the z-test is undefined");
            }

            print_json(&comparison)?;
        }
    }

    Ok(())
}
