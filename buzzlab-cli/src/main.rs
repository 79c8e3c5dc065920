//! BuzzLab CLI — collect, plan, status and adjust commands.
//!
//! Commands:
//! - `collect` — plan the catalog, fetch search buzz and merge into the dataset
//! - `plan` — dry run: report buckets and batches without touching the network
//! - `status` — report rows, films, date range and digest of a dataset file
//! - `adjust` — fill reporting gaps in a daily performance table

use anyhow::{Context, Result};
use buzzlab_core::catalog::load_catalog;
use buzzlab_core::config::{CollectorConfig, Credentials};
use buzzlab_core::data::provider::TrendProvider;
use buzzlab_core::data::{
    batch, plan_buckets, run_collection, CommitOutcome, Collector, DataLabProvider, DatasetStats,
    DatasetStore, LogProgress, RunReport, ThreadSleeper,
};
use buzzlab_core::performance::adjust_file;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "buzzlab",
    about = "BuzzLab CLI — resumable search-buzz collector for a film catalog"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect daily search buzz for every catalog film and merge into the dataset.
    Collect {
        /// Film catalog CSV (movieCd, title, openDt).
        #[arg(long)]
        catalog: PathBuf,

        /// Dataset CSV to resume from and write to.
        #[arg(long)]
        output: PathBuf,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Planning date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<String>,
    },
    /// Show how the catalog would be bucketed and batched.
    Plan {
        /// Film catalog CSV (movieCd, title, openDt).
        #[arg(long)]
        catalog: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Planning date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<String>,
    },
    /// Report rows, films, date range and digest of a dataset file.
    Status {
        /// Dataset CSV.
        #[arg(long)]
        output: PathBuf,
    },
    /// Fill reporting gaps in a daily performance table.
    Adjust {
        /// Daily performance CSV.
        #[arg(long)]
        input: PathBuf,

        /// Where to write the adjusted table.
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            catalog,
            output,
            config,
            today,
        } => run_collect(&catalog, &output, config.as_deref(), today.as_deref()),
        Commands::Plan {
            catalog,
            config,
            today,
        } => run_plan(&catalog, config.as_deref(), today.as_deref()),
        Commands::Status { output } => run_status(&output),
        Commands::Adjust { input, output } => {
            let report = adjust_file(&input, &output)?;
            println!(
                "Adjusted {} rows across {} films ({} gap days filled) -> {}",
                report.rows,
                report.movies,
                report.filled_days,
                output.display()
            );
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CollectorConfig> {
    match path {
        Some(path) => Ok(CollectorConfig::from_file(path)?),
        None => Ok(CollectorConfig::default()),
    }
}

fn parse_today(today: Option<&str>) -> Result<NaiveDate> {
    today
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--today must be YYYY-MM-DD")
        .map(|d| d.unwrap_or_else(|| chrono::Local::now().date_naive()))
}

fn run_collect(
    catalog_path: &Path,
    output: &Path,
    config_path: Option<&Path>,
    today: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let today = parse_today(today)?;
    let credentials = Credentials::from_env()?;
    let policy = config.retry_policy()?;

    let catalog = load_catalog(catalog_path, config.collector.catalog_cutoff)?;
    let provider = DataLabProvider::new(credentials, &config.api.endpoint, config.request_timeout())?;
    let sleeper = ThreadSleeper;
    let progress = LogProgress;
    let collector = Collector::new(
        &provider,
        policy,
        &sleeper,
        config.collector.max_group_size,
        &progress,
    );
    let store = DatasetStore::new(output);
    info!(
        provider = provider.name(),
        films = catalog.entities.len(),
        output = %output.display(),
        %today,
        "starting collection"
    );

    let report = run_collection(
        &catalog.entities,
        &config.plan_options(today),
        &collector,
        &store,
    )?;
    print_summary(&report, &store);
    Ok(())
}

fn run_plan(catalog_path: &Path, config_path: Option<&Path>, today: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let today = parse_today(today)?;
    let catalog = load_catalog(catalog_path, config.collector.catalog_cutoff)?;
    let plan = plan_buckets(&catalog.entities, &config.plan_options(today));
    let group_size = batch::effective_group_size(config.collector.max_group_size);

    println!();
    println!("=== Collection Plan ({today}) ===");
    println!("Films:          {}", catalog.entities.len());
    println!("Bad dates:      {}", catalog.unparseable_dates);
    println!("Before cutoff:  {}", catalog.before_cutoff);
    println!("Not yet open:   {}", plan.skipped);
    println!("Buckets:        {}", plan.buckets.len());
    println!("Batches:        {} (up to {group_size} films each)", plan.batch_count(group_size));
    if !plan.is_empty() {
        println!();
        println!("{:<25} {:>8} {:>8}", "Window", "Films", "Batches");
        println!("{}", "-".repeat(43));
        for bucket in &plan.buckets {
            println!(
                "{:<25} {:>8} {:>8}",
                bucket.window.to_string(),
                bucket.entities.len(),
                batch::batch_count(bucket.entities.len(), group_size)
            );
        }
    }
    println!();
    Ok(())
}

fn run_status(output: &Path) -> Result<()> {
    let store = DatasetStore::new(output);
    if !store.exists() {
        println!("Dataset does not exist: {}", output.display());
        return Ok(());
    }

    let rows = store.read_rows()?;
    let stats = DatasetStats::from_rows(&rows);
    let digest = store.digest()?;

    println!("Dataset:        {}", output.display());
    println!("Rows:           {}", stats.rows);
    println!("Films:          {}", stats.entities);
    match (stats.first_date, stats.last_date) {
        (Some(first), Some(last)) => println!("Date range:     {first} to {last}"),
        _ => println!("Date range:     (empty)"),
    }
    println!("BLAKE3:         {digest}");
    Ok(())
}

fn print_summary(report: &RunReport, store: &DatasetStore) {
    let summary = &report.summary;
    println!();
    println!("=== Collection Result ===");
    println!("Films planned:  {}", report.planned_entities);
    println!("Not yet open:   {}", report.skipped_entities);
    println!("Known records:  {}", report.known_keys);
    println!(
        "Batches:        {}/{} succeeded",
        summary.batches_succeeded, summary.batches_total
    );
    println!("New records:    {}", summary.observations.len());
    println!("Already stored: {}", summary.skipped_existing);
    match &report.commit {
        CommitOutcome::Unchanged => println!("Dataset:        unchanged"),
        CommitOutcome::Written {
            total_rows,
            added_rows,
            quarantined,
        } => {
            println!(
                "Dataset:        {} ({total_rows} rows, +{added_rows})",
                store.path().display()
            );
            if let Some(path) = quarantined {
                println!("WARNING: unreadable prior dataset moved to {}", path.display());
            }
        }
    }
    for failure in &summary.failures {
        println!(
            "FAILED: {} [{}]: {}",
            failure.window,
            failure.entity_ids.join(", "),
            failure.error
        );
    }
    println!();
}
