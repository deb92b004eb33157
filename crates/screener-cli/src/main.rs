//! good-companies: screen a market snapshot for fundamentally sound companies.
//!
//! Usage:
//!   good-companies --snapshot universe.json
//!   good-companies --snapshot universe.json --industry banking --max-price 50
//!   good-companies --snapshot universe.json --filter filter.json --json
//!
//! `SCREENER_MAX_WORKERS` caps concurrent screening tasks (default 64);
//! `--max-workers` overrides it.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use fundamental_rules::{CheckerOptions, FundamentalChecker};
use screener_core::{CancellationToken, StockFilter};
use screener_orchestrator::{ScreenReport, Screener, ScreenerConfig};
use serde::de::DeserializeOwned;
use snapshot_provider::SnapshotProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "good-companies", version, about = "Screen a market snapshot for good companies")]
struct Args {
    /// JSON snapshot of the candidate universe
    #[arg(long)]
    snapshot: PathBuf,

    /// Date used for listing-age checks instead of the snapshot's (YYYY-MM-DD)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// JSON file with stock filter fields
    #[arg(long)]
    filter: Option<PathBuf>,

    /// JSON file with rule thresholds
    #[arg(long)]
    options: Option<PathBuf>,

    /// Maximum concurrently screened candidates
    #[arg(long)]
    max_workers: Option<usize>,

    #[arg(long)]
    min_roe: Option<f64>,

    #[arg(long)]
    industry: Option<String>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Keep ChiNext (300/301) companies
    #[arg(long)]
    include_growth_board: bool,

    /// Keep STAR market (688/689) companies
    #[arg(long)]
    include_star_board: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Apply flag overrides on top of a base filter.
    fn apply_to(&self, mut filter: StockFilter) -> StockFilter {
        if let Some(min_roe) = self.min_roe {
            filter.min_roe = min_roe;
        }
        if let Some(industry) = &self.industry {
            filter.industry = industry.clone();
        }
        if let Some(min_price) = self.min_price {
            filter.min_price = min_price;
        }
        if let Some(max_price) = self.max_price {
            filter.max_price = max_price;
        }
        if self.include_growth_board {
            filter.exclude_growth_board = false;
        }
        if self.include_star_board {
            filter.exclude_star_board = false;
        }
        filter
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "screener_cli=info,screener_orchestrator=info,snapshot_provider=warn".into()
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ScreenerConfig::from_env().context("Invalid screener configuration")?;
    if let Some(max_workers) = args.max_workers {
        config = config.with_max_workers(max_workers);
    }

    let base_filter = match &args.filter {
        Some(path) => load_json::<StockFilter>(path).await?,
        None => StockFilter::default(),
    };
    let filter = args.apply_to(base_filter);

    let options = match &args.options {
        Some(path) => load_json::<CheckerOptions>(path).await?,
        None => CheckerOptions::default(),
    };

    let mut provider = SnapshotProvider::load(&args.snapshot)
        .await
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot.display()))?;
    if let Some(as_of) = args.as_of {
        provider = provider.with_as_of(as_of);
    }
    let provider = Arc::new(provider);

    let checker = FundamentalChecker::with_options(options);
    let rules = checker.options();
    tracing::info!(
        min_roe = rules.min_roe,
        trend_years = rules.trend_years,
        max_debt_ratio = rules.max_debt_ratio,
        "Fundamental rules loaded"
    );

    let screener = Screener::new(provider.clone(), provider.clone(), Arc::new(checker))
        .with_config(config);
    tracing::info!(
        "Screening {} companies with up to {} workers",
        provider.len(),
        screener.config().max_workers
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling screen");
            signal_token.cancel();
        }
    });

    let report = screener
        .screen_with_report(&cancel, filter)
        .await
        .context("Screening failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }

    Ok(())
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_table(report: &ScreenReport) {
    println!(
        "{:>4}  {:<10}  {:<20}  {:<16}  {:>8}  {:>10}",
        "#", "Code", "Name", "Industry", "ROE %", "Price"
    );
    println!("{}", "-".repeat(78));
    for (rank, stock) in report.stocks.iter().enumerate() {
        println!(
            "{:>4}  {:<10}  {:<20}  {:<16}  {:>8.2}  {:>10.2}",
            rank + 1,
            stock.symbol(),
            truncate(&stock.info.name, 20),
            truncate(&stock.info.industry, 16),
            stock.roe(),
            stock.info.price
        );
    }
    println!("{}", "-".repeat(78));

    let stats = &report.stats;
    println!(
        "Selected {} of {} candidates ({} rejected, {} failed, {} faulted) at {}",
        stats.passed,
        stats.candidates,
        stats.rejected,
        stats.failed,
        stats.faulted,
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
