//! SynthLab CLI — realized and VAR-simulated market series.
//!
//! Commands:
//! - `prices` — fetch or load a price table
//! - `returns` — realized period-over-period returns
//! - `simulate` — fit a VAR model and emit a simulated series

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use synthlab_core::data::{CsvCache, QuandlSource, StderrWarnings};
use synthlab_core::frame::{Frame, Frequency};
use synthlab_core::market::{MarketData, SeriesRequest};
use synthlab_core::synthetic::SyntheticReturns;
use synthlab_core::var::ParamsTable;

mod config;
use config::RunConfig;

const API_KEY_ENV: &str = "SYNTHLAB_API_KEY";

#[derive(Parser)]
#[command(
    name = "synthlab",
    about = "SynthLab CLI — realized and VAR-simulated market series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch or load a price table.
    Prices {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Fetch or load realized returns.
    Returns {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Fit a VAR model to realized returns and emit a simulated series.
    Simulate {
        #[command(flatten)]
        data: DataArgs,

        /// VAR model order.
        #[arg(long)]
        order: Option<usize>,

        /// Simulation seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Also print the fitted coefficient table.
        #[arg(long, default_value_t = false)]
        params: bool,

        /// Reconstruct a simulated price path (base 1.0) instead of returns.
        #[arg(long, default_value_t = false)]
        as_prices: bool,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Tickers, comma-separated (e.g. AAPL,MSFT).
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,

    /// Resampling frequency: business, weekly, or monthly.
    #[arg(long)]
    freq: Option<String>,

    /// CSV cache file; when set, data is served from it instead of the live API.
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Live API key. Falls back to the SYNTHLAB_API_KEY environment variable.
    #[arg(long)]
    api_key: Option<String>,

    /// TOML run config; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the table as CSV to this path instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Everything a command needs after merging flags over the config file.
struct Resolved {
    market: MarketData,
    request: SeriesRequest,
    order: usize,
    seed: u64,
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Prices { data } => {
            let resolved = resolve(&data, None, None)?;
            let frame = resolved
                .market
                .prices(&resolved.request, &StderrWarnings)?;
            emit_frame(&frame, resolved.output.as_deref())
        }
        Commands::Returns { data } => {
            let resolved = resolve(&data, None, None)?;
            let frame = resolved
                .market
                .returns(&resolved.request, &StderrWarnings)?;
            emit_frame(&frame, resolved.output.as_deref())
        }
        Commands::Simulate {
            data,
            order,
            seed,
            params,
            as_prices,
        } => {
            let resolved = resolve(&data, order, seed)?;
            let synth = SyntheticReturns::new(resolved.order, resolved.seed);

            let simulated = if as_prices {
                synth.prices(&resolved.market, &resolved.request, &StderrWarnings)?
            } else {
                synth.returns(&resolved.market, &resolved.request, &StderrWarnings)?
            };

            emit_frame(&simulated.series, resolved.output.as_deref())?;
            if params {
                print_params(&simulated.params);
            }
            Ok(())
        }
    }
}

/// Merge command-line flags over an optional config file.
fn resolve(data: &DataArgs, order: Option<usize>, seed: Option<u64>) -> Result<Resolved> {
    let file = data
        .config
        .as_deref()
        .map(RunConfig::from_file)
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let tickers = if !data.tickers.is_empty() {
        data.tickers.clone()
    } else {
        file.as_ref()
            .map(|c| c.data.tickers.clone())
            .unwrap_or_default()
    };
    if tickers.is_empty() {
        bail!("no tickers given (use --tickers or a config file)");
    }

    let start = parse_date(
        data.start
            .as_deref()
            .or(file.as_ref().and_then(|c| c.data.start.as_deref())),
    )?;
    let end = parse_date(
        data.end
            .as_deref()
            .or(file.as_ref().and_then(|c| c.data.end.as_deref())),
    )?;

    let freq = match data
        .freq
        .as_deref()
        .or(file.as_ref().and_then(|c| c.data.freq.as_deref()))
    {
        Some(s) => s.parse::<Frequency>().map_err(|e| anyhow!(e))?,
        None => Frequency::default(),
    };

    let cache = data
        .cache
        .clone()
        .or(file.as_ref().and_then(|c| c.data.cache.clone()));

    let market = match cache {
        Some(path) => MarketData::cached(CsvCache::new(path)),
        None => {
            let api_key = data
                .api_key
                .clone()
                .or_else(|| std::env::var(API_KEY_ENV).ok());
            let Some(api_key) = api_key else {
                bail!("a live request needs --api-key or {API_KEY_ENV} (or use --cache)");
            };
            MarketData::live(Box::new(QuandlSource::new(api_key)))
        }
    };

    let model = file.map(|c| c.model).unwrap_or_default();

    Ok(Resolved {
        market,
        request: SeriesRequest {
            tickers,
            start,
            end,
            freq,
        },
        order: order.unwrap_or(model.order),
        seed: seed.unwrap_or(model.seed),
        output: data.output.clone(),
    })
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| anyhow!("bad date '{s}': {e}"))
        })
        .transpose()
}

/// Print the frame to stdout, or write it as CSV when `output` is set.
fn emit_frame(frame: &Frame, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_frame_csv(frame, path)?;
            println!("Wrote {} rows to {}", frame.height(), path.display());
            Ok(())
        }
        None => {
            print_frame(frame);
            Ok(())
        }
    }
}

fn print_frame(frame: &Frame) {
    if frame.height() == 0 {
        println!("(empty table: {} columns, 0 rows)", frame.width());
        return;
    }

    print!("{:<12}", "Date");
    for ticker in frame.tickers() {
        print!(" {ticker:>14}");
    }
    println!();
    println!("{}", "-".repeat(12 + 15 * frame.width()));

    for (i, date) in frame.dates().iter().enumerate() {
        print!("{:<12}", date.to_string());
        for value in frame.row(i) {
            print!(" {value:>14.6}");
        }
        println!();
    }
}

fn write_frame_csv(frame: &Frame, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["Date".to_string()];
    header.extend(frame.tickers().iter().cloned());
    wtr.write_record(&header)?;

    for (i, date) in frame.dates().iter().enumerate() {
        let mut record = vec![date.to_string()];
        record.extend(frame.row(i).iter().map(|v| format!("{v:.6}")));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn print_params(params: &ParamsTable) {
    println!();
    println!("=== Fitted VAR coefficients ===");
    print!("{:<12}", "");
    for ticker in &params.tickers {
        print!(" {ticker:>14}");
    }
    println!();

    for (label, row) in params.index.iter().zip(&params.values) {
        print!("{label:<12}");
        for value in row {
            print!(" {value:>14.6}");
        }
        println!();
    }
}
