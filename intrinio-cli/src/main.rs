//! Intrinio bundle CLI: ingest, universe, and bundle status commands.
//!
//! Commands:
//! - `ingest`: download the universe from Intrinio and write a Parquet bundle
//! - `universe`: print the resolved symbol universe as TOML
//! - `status`: report the manifest and file sizes of an ingested bundle

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use intrinio_core::writer::parquet_store::{
    ASSETS_FILE, DAILY_BARS_FILE, DIVIDENDS_FILE, MANIFEST_FILE, SPLITS_FILE,
};
use intrinio_core::{
    ingest, IngestConfig, IngestContext, IngestSummary, ParquetBundleWriter, Universe,
    WeekdayCalendar,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str = "intrinio_core=info,intrinio_cli=info";

#[derive(Parser)]
#[command(
    name = "intrinio",
    about = "Intrinio bundle ingestion: daily equity bars, splits and dividends"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the universe and write a Parquet bundle.
    Ingest {
        /// First calendar session (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Last calendar session (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Bundle output directory.
        #[arg(long, default_value = "bundle")]
        output_dir: PathBuf,

        /// Universe TOML file. Defaults to the built-in S&P 500 list.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Holiday list, one YYYY-MM-DD per line.
        #[arg(long)]
        holidays: Option<PathBuf>,

        /// Log download and write progress.
        #[arg(long, default_value_t = false)]
        show_progress: bool,
    },
    /// Print the resolved universe as TOML.
    Universe {
        /// Universe TOML file. Defaults to the built-in S&P 500 list.
        #[arg(long)]
        universe: Option<PathBuf>,
    },
    /// Report the manifest and table sizes of an ingested bundle.
    Status {
        /// Bundle directory.
        #[arg(long, default_value = "bundle")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            start,
            end,
            output_dir,
            universe,
            holidays,
            show_progress,
        } => run_ingest(
            &start,
            &end,
            &output_dir,
            universe.as_deref(),
            holidays.as_deref(),
            show_progress,
        ),
        Commands::Universe { universe } => run_universe(universe.as_deref()),
        Commands::Status { output_dir } => run_status(&output_dir),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn parse_date(flag: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("--{flag} expects YYYY-MM-DD, got '{raw}'"))
}

fn load_universe(path: Option<&Path>) -> Result<Universe> {
    match path {
        Some(path) => Universe::from_file(path)
            .with_context(|| format!("loading universe from {}", path.display())),
        None => Ok(Universe::default_intrinio()),
    }
}

fn run_ingest(
    start: &str,
    end: &str,
    output_dir: &Path,
    universe_path: Option<&Path>,
    holidays: Option<&Path>,
    show_progress: bool,
) -> Result<()> {
    let start_session = parse_date("start", start)?;
    let end_session = parse_date("end", end)?;

    let config = IngestConfig::from_env()?;
    let universe = load_universe(universe_path)?;
    let calendar = match holidays {
        Some(path) => WeekdayCalendar::from_holiday_file(path)?,
        None => WeekdayCalendar::new(),
    };
    tracing::info!(
        api_version = %config.api_version,
        symbols = universe.len(),
        %start_session,
        %end_session,
        "starting Intrinio ingest"
    );

    let source = config.build_source()?;
    let mut writer = ParquetBundleWriter::new(output_dir)?;

    let summary = ingest(IngestContext {
        source: source.as_ref(),
        universe: &universe,
        policy: config.policy,
        calendar: &calendar,
        start_session,
        end_session,
        show_progress,
        writer: &mut writer,
    })?;
    writer.write_manifest(&summary.manifest(chrono::Local::now().naive_local()))?;

    print_summary(&summary, writer.out_dir());
    Ok(())
}

fn print_summary(summary: &IngestSummary, out_dir: &Path) {
    println!("Bundle written to: {}", out_dir.display());
    println!(
        "Sessions: {} to {} ({} sessions)",
        summary.start_session, summary.end_session, summary.sessions
    );
    println!("Assets:    {}", summary.assets);
    println!("Bar rows:  {}", summary.bar_rows);
    println!("Splits:    {}", summary.splits);
    println!("Dividends: {}", summary.dividends);
}

fn run_universe(path: Option<&Path>) -> Result<()> {
    let universe = load_universe(path)?;
    print!("{}", universe.to_toml()?);
    Ok(())
}

fn run_status(output_dir: &Path) -> Result<()> {
    if !output_dir.join(MANIFEST_FILE).exists() {
        println!("No bundle found in: {}", output_dir.display());
        return Ok(());
    }

    let writer = ParquetBundleWriter::new(output_dir)?;
    let manifest = writer.read_manifest()?;

    println!("Bundle:    {} ({})", manifest.bundle, output_dir.display());
    println!("Source:    {}", manifest.source);
    println!(
        "Sessions:  {} to {}",
        manifest.start_session, manifest.end_session
    );
    println!("Ingested:  {}", manifest.ingested_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Raw rows:  {}", manifest.raw_rows);
    println!("Assets:    {}", manifest.assets);
    println!("Bar rows:  {}", manifest.bar_rows);
    println!("Splits:    {}", manifest.splits);
    println!("Dividends: {}", manifest.dividends);
    println!("Data hash: {}", manifest.data_hash);
    println!();
    println!("{:<22} {:>10}", "File", "Size");
    println!("{}", "-".repeat(33));

    let mut total_size = 0;
    for name in [ASSETS_FILE, DAILY_BARS_FILE, SPLITS_FILE, DIVIDENDS_FILE, MANIFEST_FILE] {
        match std::fs::metadata(output_dir.join(name)) {
            Ok(meta) => {
                total_size += meta.len();
                println!("{:<22} {:>10}", name, format_size(meta.len()));
            }
            Err(_) => println!("{:<22} {:>10}", name, "(missing)"),
        }
    }
    println!("{:<22} {:>10}", "total", format_size(total_size));

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
