//! BarMemo CLI: replay bars through cached indicators.
//!
//! Commands:
//! - `replay`: stream bars from a CSV file or a seeded random walk into a
//!   bounded series, querying indicators at the last closed bar and the open
//!   bar after every append, then print a summary
//! - `config`: print the effective configuration as TOML
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (e.g. `RUST_LOG=barmemo_core=debug`).

use anyhow::{bail, Context, Result};
use barmemo_core::cache::CacheStrategy;
use barmemo_core::indicator::{CachedIndicator, Indicator};
use barmemo_core::indicators::{ClosePrice, Ema, Sma, Volume};
use barmemo_core::series::BarSeries;
use barmemo_core::{Bar, BarMemoConfig};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "barmemo",
    about = "BarMemo CLI: cached indicators over bounded bar series"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep at most this many bars (overrides the config file).
    #[arg(long, global = true)]
    maximum_bar_count: Option<usize>,

    /// Cache strategy: native, map or disabled (overrides the config file).
    #[arg(long, global = true)]
    strategy: Option<CacheStrategy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream bars through a series and query cached indicators.
    Replay {
        /// CSV file with columns end_time,open,high,low,close,volume.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Number of synthetic bars when no CSV is given.
        #[arg(long, default_value_t = 1000)]
        bars: usize,

        /// Seed for the synthetic random walk.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print the summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Replay {
            csv,
            bars,
            seed,
            json,
        } => run_replay(&config, csv.as_deref(), bars, seed, json),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<BarMemoConfig> {
    let mut config = match &cli.config {
        Some(path) => BarMemoConfig::from_file(path)?,
        None => BarMemoConfig::default(),
    };
    if let Some(maximum) = cli.maximum_bar_count {
        config.series.maximum_bar_count = Some(maximum);
    }
    if let Some(strategy) = cli.strategy {
        config.cache.strategy = strategy;
    }
    config.validate()?;
    Ok(config)
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct IndicatorSummary {
    name: String,
    last_closed: Option<f64>,
    open: Option<f64>,
    cached_entries: usize,
    highest_stored_index: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    series: String,
    strategy: CacheStrategy,
    bars_appended: usize,
    bars_retained: usize,
    removed_bars: usize,
    begin_index: Option<usize>,
    end_index: Option<usize>,
    queries: usize,
    indicators: Vec<IndicatorSummary>,
}

fn run_replay(
    config: &BarMemoConfig,
    csv: Option<&Path>,
    synthetic_count: usize,
    seed: u64,
    json: bool,
) -> Result<()> {
    let bars = match csv {
        Some(path) => load_csv_bars(path)?,
        None => generate_synthetic_bars(synthetic_count, seed),
    };
    info!(bars = bars.len(), "replaying");

    let series = Arc::new(config.build_series()?);
    let close = Arc::new(ClosePrice::new(series.clone()));
    let volume = Arc::new(Volume::new(series.clone()));
    let sma = Sma::new(close.clone(), config.indicators.sma_period);
    let ema = Ema::new(close.clone(), config.indicators.ema_period);
    let volume_sma = Sma::new(volume, config.indicators.sma_period);

    let mut queries = 0;
    let bars_appended = bars.len();
    for bar in bars {
        series
            .add_bar(bar)
            .context("bars must be in strictly increasing end-time order")?;
        let Some(end) = series.end_index() else {
            continue;
        };
        // The bar that just closed, then the new open bar.
        for index in end.saturating_sub(1)..=end {
            close.value(index)?;
            sma.value(index)?;
            ema.value(index)?;
            volume_sma.value(index)?;
            queries += 4;
        }
    }

    let end = series.end_index();
    let last_closed = end.and_then(|e| e.checked_sub(1));
    let summary = ReplaySummary {
        series: series.name().to_string(),
        strategy: config.cache.strategy,
        bars_appended,
        bars_retained: series.bar_count(),
        removed_bars: series.removed_bars_count(),
        begin_index: series.begin_index(),
        end_index: end,
        queries,
        indicators: vec![
            summarize(close.as_ref(), last_closed, end)?,
            summarize(&sma, last_closed, end)?,
            summarize(&ema, last_closed, end)?,
            summarize(&volume_sma, last_closed, end)?,
        ],
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn summarize<I>(
    indicator: &I,
    last_closed: Option<usize>,
    open: Option<usize>,
) -> Result<IndicatorSummary>
where
    I: CachedIndicator<Output = f64>,
{
    let cache = indicator.base().cache();
    Ok(IndicatorSummary {
        name: indicator.name().to_string(),
        last_closed: last_closed.map(|i| indicator.value(i)).transpose()?,
        open: open.map(|i| indicator.value(i)).transpose()?,
        cached_entries: cache.snapshot().len(),
        highest_stored_index: cache.highest_stored_index(),
    })
}

fn print_summary(summary: &ReplaySummary) {
    println!();
    println!("=== Replay Summary ===");
    println!("Series:         {}", summary.series);
    println!("Strategy:       {:?}", summary.strategy);
    println!(
        "Bars:           {} appended, {} retained, {} removed",
        summary.bars_appended, summary.bars_retained, summary.removed_bars
    );
    println!(
        "Index range:    {} to {}",
        format_index(summary.begin_index),
        format_index(summary.end_index)
    );
    println!("Queries:        {}", summary.queries);
    println!();
    println!("--- Indicators ---");
    println!(
        "{:<12} {:>14} {:>14} {:>8} {:>10}",
        "name", "last closed", "open", "cached", "highest"
    );
    for ind in &summary.indicators {
        println!(
            "{:<12} {:>14} {:>14} {:>8} {:>10}",
            ind.name,
            format_value(ind.last_closed),
            format_value(ind.open),
            ind.cached_entries,
            format_index(ind.highest_stored_index)
        );
    }
}

fn format_index(index: Option<usize>) -> String {
    index.map_or_else(|| "-".to_string(), |i| i.to_string())
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

// ── Bar sources ──────────────────────────────────────────────────────

/// Read bars from a CSV file with a header row. Void or inconsistent OHLC
/// rows are rejected.
fn load_csv_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open bar file {}", path.display()))?;
    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<Bar>().enumerate() {
        let bar = record.with_context(|| format!("parse row {} of {}", row + 1, path.display()))?;
        if !bar.is_sane() {
            bail!(
                "row {} of {}: invalid OHLC (open {}, high {}, low {}, close {})",
                row + 1,
                path.display(),
                bar.open,
                bar.high,
                bar.low,
                bar.close
            );
        }
        bars.push(bar);
    }
    debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Simple random walk from a starting price of 100.0, one bar per minute.
fn generate_synthetic_bars(count: usize, seed: u64) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    for i in 0..count {
        let step: f64 = rng.gen_range(-0.003..0.003);
        let open = price;
        let close = price * (1.0 + step);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.001));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.001));
        let volume = rng.gen_range(100..10_000u64);

        bars.push(Bar {
            end_time: start + Duration::minutes(i as i64 + 1),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn default_config() -> BarMemoConfig {
        let mut config = BarMemoConfig::default();
        config.series.maximum_bar_count = Some(100);
        config
    }

    #[test]
    fn synthetic_bars_are_deterministic_and_ordered() {
        let a = generate_synthetic_bars(50, 7);
        let b = generate_synthetic_bars(50, 7);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].end_time < w[1].end_time));
        assert!(a.iter().all(|bar| bar.is_sane()));
    }

    #[test]
    fn replay_synthetic_runs() {
        run_replay(&default_config(), None, 300, 1, true).unwrap();
    }

    #[test]
    fn summarize_reports_cache_state() {
        let config = default_config();
        let series = Arc::new(config.build_series().unwrap());
        for bar in generate_synthetic_bars(20, 3) {
            series.add_bar(bar).unwrap();
        }
        let close = ClosePrice::new(series.clone());
        for i in 0..19 {
            close.value(i).unwrap();
        }
        let summary = summarize(&close, Some(18), Some(19)).unwrap();
        assert_eq!(summary.name, "close");
        assert_eq!(summary.cached_entries, 19);
        assert_eq!(summary.highest_stored_index, Some(18));
        assert_eq!(summary.open, series.last_bar().map(|b| b.close));
    }

    #[test]
    fn csv_bars_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "end_time,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-02T09:31:00,100.0,101.0,99.5,100.5,1200").unwrap();
        writeln!(file, "2024-01-02T09:32:00,100.5,100.9,100.1,100.2,800").unwrap();
        let bars = load_csv_bars(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 100.2);
        assert_eq!(bars[0].volume, 1200);
    }

    #[test]
    fn insane_csv_row_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "end_time,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-02T09:31:00,100.0,101.0,99.5,100.5,1200").unwrap();
        writeln!(file, "2024-01-02T09:32:00,100.5,99.0,100.1,100.2,800").unwrap();
        let err = load_csv_bars(file.path()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
        assert!(err.to_string().contains("invalid OHLC"), "{err}");
    }

    #[test]
    fn out_of_order_csv_fails_replay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "end_time,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-02T09:32:00,100.0,101.0,99.5,100.5,1200").unwrap();
        writeln!(file, "2024-01-02T09:31:00,100.5,100.9,100.1,100.2,800").unwrap();
        let err = run_replay(&default_config(), Some(file.path()), 0, 0, false).unwrap_err();
        assert!(err.to_string().contains("increasing end-time order"));
    }
}
