/// main.rs — Volatility Forecast CLI
///
/// Loads daily OHLC/close CSVs and runs the ensemble volatility engine:
///   1. Load config from .env (VOL_* keys), then apply CLI overrides
///   2. Read the CSV(s) with polars
///   3. Historical / GARCH / EWMA / Parkinson → weighted ensemble + bands
///   4. Print the report and/or save it as JSON
///
/// Usage:
///   vol_report forecast --input data/SPY.csv --horizon 10 --output out/spy.json
///   vol_report batch --pattern "data/*.csv" --output-dir reports
///   vol_report validate --input data/SPY.csv
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vol_engine::EngineConfig;
use vol_engine::models::garch::MIN_OBSERVATIONS;
use vol_report::data::load_csv;
use vol_report::reporting::{ForecastDocument, output_path};

#[derive(Parser)]
#[command(name = "vol_report")]
#[command(about = "Ensemble volatility forecasts from daily price CSVs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast volatility for a single instrument
    Forecast {
        /// CSV with date, close and optional high/low columns
        #[arg(short, long)]
        input: PathBuf,

        /// Symbol label (defaults to the file stem)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Rolling window in days (overrides VOL_HISTORICAL_WINDOW)
        #[arg(short, long)]
        window: Option<usize>,

        /// Business days to forecast (overrides VOL_FORECAST_HORIZON)
        #[arg(long)]
        horizon: Option<usize>,

        /// Confidence level for the band (overrides VOL_CONFIDENCE)
        #[arg(short, long)]
        confidence: Option<f64>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Forecast every CSV matching a glob pattern, one JSON report per file
    Batch {
        /// Glob pattern, e.g. "data/*.csv"
        #[arg(short, long)]
        pattern: String,

        /// Output directory for reports
        #[arg(short, long, default_value = "./reports")]
        output_dir: PathBuf,

        /// Rolling window in days (overrides VOL_HISTORICAL_WINDOW)
        #[arg(short, long)]
        window: Option<usize>,

        /// Business days to forecast (overrides VOL_FORECAST_HORIZON)
        #[arg(long)]
        horizon: Option<usize>,
    },

    /// Check that a CSV loads and has enough history
    Validate {
        /// CSV with date, close and optional high/low columns
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// CLI flags applied on top of the environment config.
#[derive(Debug, Default, Clone, Copy)]
struct Overrides {
    window: Option<usize>,
    horizon: Option<usize>,
    confidence: Option<f64>,
}

impl Overrides {
    fn apply(self, mut cfg: EngineConfig) -> Result<EngineConfig> {
        if let Some(w) = self.window {
            cfg.historical_window = w;
        }
        if let Some(h) = self.horizon {
            cfg.forecast_horizon = h;
        }
        if let Some(c) = self.confidence {
            cfg.confidence = c;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

pub struct VolReportApp {
    cli: Cli,
}

impl VolReportApp {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Forecast { input, symbol, window, horizon, confidence, output, .. } => {
                let overrides = Overrides { window: *window, horizon: *horizon, confidence: *confidence };
                self.forecast(input, symbol.as_deref(), overrides, output.as_deref())
            }
            Commands::Batch { pattern, output_dir, window, horizon } => {
                let overrides = Overrides { window: *window, horizon: *horizon, confidence: None };
                self.batch(pattern, output_dir, overrides)
            }
            Commands::Validate { input } => self.validate(input),
        }
    }

    fn forecast(
        &self,
        input: &Path,
        symbol: Option<&str>,
        overrides: Overrides,
        output: Option<&Path>,
    ) -> Result<()> {
        let cfg = overrides.apply(EngineConfig::from_env()?)?;
        info!(
            "Config: window={}d horizon={}d λ={:.2} confidence={:.2}",
            cfg.historical_window, cfg.forecast_horizon, cfg.ewma_lambda, cfg.confidence
        );

        let mut data = load_csv(input)?;
        if let Some(s) = symbol {
            data.symbol = s.to_string();
        }
        info!("Loaded {} closes for {}", data.prices.len(), data.symbol);

        let doc = ForecastDocument::generate(&data, &cfg)?;
        doc.print_summary();

        if let Some(path) = output {
            doc.write_json(path)?;
        }
        Ok(())
    }

    fn batch(&self, pattern: &str, output_dir: &Path, overrides: Overrides) -> Result<()> {
        let cfg = overrides.apply(EngineConfig::from_env()?)?;

        let files: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable path: {e}");
                    None
                }
            })
            .collect();
        if files.is_empty() {
            return Err(anyhow!("No files match pattern: {pattern}"));
        }
        info!("Batch: {} files → {}", files.len(), output_dir.display());

        // Each file gets its own ensemble; nothing is shared between workers.
        let results: Vec<(PathBuf, Result<PathBuf>)> = files
            .par_iter()
            .map(|file| (file.clone(), forecast_to_file(file, &cfg, output_dir)))
            .collect();

        let mut failed = 0usize;
        for (file, result) in &results {
            match result {
                Ok(out) => info!("  ✓ {} → {}", file.display(), out.display()),
                Err(e) => {
                    failed += 1;
                    error!("  ✗ {}: {e:#}", file.display());
                }
            }
        }

        info!("Batch complete: {} ok, {} failed", results.len() - failed, failed);
        if failed > 0 {
            return Err(anyhow!("{failed} of {} files failed", results.len()));
        }
        Ok(())
    }

    fn validate(&self, input: &Path) -> Result<()> {
        let cfg = EngineConfig::from_env()?;
        cfg.validate()?;
        let data = load_csv(input)?;

        println!("File         : {}", input.display());
        println!("Symbol       : {}", data.symbol);
        println!("Observations : {}", data.prices.len());
        println!("Date span    : {} → {}", data.prices.first_date(), data.prices.last_date());
        println!("High/low     : {}", if data.has_ranges() { "yes (Parkinson enabled)" } else { "no" });

        if let Err(e) = check_history(data.prices.len(), &cfg) {
            warn!("{e}");
            return Err(e);
        }
        println!("Status       : OK for window {}d", cfg.historical_window);
        Ok(())
    }
}

/// Enough closes for the rolling window and for a GARCH fit.
fn check_history(closes: usize, cfg: &EngineConfig) -> Result<()> {
    let required = cfg.historical_window.max(MIN_OBSERVATIONS + 1);
    if closes < required {
        return Err(anyhow!(
            "only {closes} closes; need at least {required} (window {}d, GARCH {} returns)",
            cfg.historical_window,
            MIN_OBSERVATIONS
        ));
    }
    Ok(())
}

fn forecast_to_file(file: &Path, cfg: &EngineConfig, output_dir: &Path) -> Result<PathBuf> {
    let data = load_csv(file)?;
    let doc = ForecastDocument::generate(&data, cfg)?;
    let out = output_path(output_dir, &doc.metadata.symbol);
    doc.write_json(&out)?;
    Ok(out)
}

fn main() {
    let cli = Cli::parse();

    // ── Logging ──────────────────────────────────────────────────────────
    let default_level = match &cli.command {
        Commands::Forecast { verbose: true, .. } => "debug",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let app = VolReportApp::new(cli);
    if let Err(e) = app.run() {
        error!("Application error: {e:#}");
        std::process::exit(1);
    }
}
