/// reporting.rs — Forecast documents and file export
///
/// Wraps an engine `ForecastReport` with run metadata (symbol, input span,
/// generation time) and writes it as pretty JSON.  One document per input
/// file; batch runs name them `<SYMBOL>_forecast.json`.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use vol_engine::{EngineConfig, ForecastReport};

use crate::data::MarketData;

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub symbol: String,
    pub observations: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub has_ranges: bool,
}

impl ReportMetadata {
    pub fn describe(data: &MarketData) -> Self {
        Self {
            generated_at: Utc::now(),
            symbol: data.symbol.clone(),
            observations: data.prices.len(),
            first_date: data.prices.first_date(),
            last_date: data.prices.last_date(),
            has_ranges: data.has_ranges(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastDocument {
    pub metadata: ReportMetadata,
    pub report: ForecastReport,
}

impl ForecastDocument {
    /// Run the full pipeline on one instrument.
    pub fn generate(data: &MarketData, cfg: &EngineConfig) -> Result<Self> {
        let report = ForecastReport::build(&data.prices, data.ranges.as_ref(), cfg)
            .with_context(|| format!("forecasting {}", data.symbol))?;
        Ok(Self { metadata: ReportMetadata::describe(data), report })
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("Report saved → {}", path.display());
        Ok(())
    }

    pub fn print_summary(&self) {
        let m = &self.metadata;
        println!();
        println!("  {}  {} → {}  ({} closes{})",
            m.symbol,
            m.first_date,
            m.last_date,
            m.observations,
            if m.has_ranges { ", high/low" } else { "" }
        );
        print!("{}", self.report);
    }
}

/// `<dir>/<SYMBOL>_forecast.json`
pub fn output_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{symbol}_forecast.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vol_engine::PriceSeries;
    use vol_engine::series::is_business_day;

    fn market(n: usize) -> MarketData {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut dates = Vec::with_capacity(n);
        let mut d = start;
        while dates.len() < n {
            if is_business_day(d) {
                dates.push(d);
            }
            d += Duration::days(1);
        }
        let mut price = 100.0;
        let closes: Vec<f64> = (0..n)
            .map(|i| {
                let amp = if (i / 25) % 2 == 0 { 0.006 } else { 0.018 };
                price *= (amp * ((i as f64) * 1.7).sin() + 0.4 * amp * ((i as f64) * 0.31).cos()).exp();
                price
            })
            .collect();
        MarketData {
            symbol: "TEST".into(),
            prices: PriceSeries::from_columns(&dates, &closes).unwrap(),
            ranges: None,
        }
    }

    #[test]
    fn document_roundtrips_to_disk() {
        let data = market(90);
        let doc = ForecastDocument::generate(&data, &EngineConfig::default()).unwrap();
        assert_eq!(doc.metadata.observations, 90);
        assert!(!doc.metadata.has_ranges);

        let dir = std::env::temp_dir().join(format!("vol_report_docs_{}", std::process::id()));
        let path = output_path(&dir, &doc.metadata.symbol);
        doc.write_json(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::remove_dir_all(&dir).ok();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["metadata"]["symbol"], "TEST");
        assert_eq!(v["report"]["forecast_horizon"], 5);
        assert!(v["report"]["model_weights"]["garch"].is_number());
    }

    #[test]
    fn too_short_input_reports_symbol() {
        let data = market(10);
        let err = ForecastDocument::generate(&data, &EngineConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("TEST"));
    }

    #[test]
    fn output_path_naming() {
        assert_eq!(
            output_path(Path::new("out"), "SPY"),
            PathBuf::from("out/SPY_forecast.json")
        );
    }
}
