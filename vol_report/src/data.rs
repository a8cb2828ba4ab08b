/// data.rs — CSV market data loading
///
/// Expected columns (case-insensitive): `date` (YYYY-MM-DD, anything after
/// the first ten characters is ignored), `close`, and optionally `high` and
/// `low`.  Either both range columns are present or neither; a file with only
/// one of them is rejected rather than silently dropping Parkinson.
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;
use vol_engine::{PriceSeries, RangeSeries};

/// One instrument's validated input series.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub symbol: String,
    pub prices: PriceSeries,
    pub ranges: Option<RangeSeries>,
}

impl MarketData {
    pub fn has_ranges(&self) -> bool {
        self.ranges.is_some()
    }
}

/// Load a CSV file; the symbol is the upper-cased file stem.
pub fn load_csv(path: &Path) -> Result<MarketData> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("reading {}", path.display()))?;

    debug!("Loaded {} rows from {}", df.height(), path.display());
    frame_to_market_data(&df, symbol_from_path(path))
        .with_context(|| format!("parsing {}", path.display()))
}

pub fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".into())
}

/// Convert a polars DataFrame to validated engine series.
pub fn frame_to_market_data(df: &DataFrame, symbol: String) -> Result<MarketData> {
    let date_col = find_column(df, "date").ok_or_else(|| anyhow!("missing 'date' column"))?;
    let close_col = find_column(df, "close").ok_or_else(|| anyhow!("missing 'close' column"))?;

    let dates = date_values(date_col)?;
    let closes = f64_values(close_col)?;
    let prices = PriceSeries::from_columns(&dates, &closes)?;

    let highs = find_column(df, "high").map(f64_values).transpose()?;
    let lows = find_column(df, "low").map(f64_values).transpose()?;
    let ranges = match (highs, lows) {
        (None, None) => None,
        (highs, lows) => Some(RangeSeries::from_columns(
            &dates,
            highs.as_deref(),
            lows.as_deref(),
        )?),
    };

    Ok(MarketData { symbol, prices, ranges })
}

fn find_column<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Column> {
    df.get_columns()
        .iter()
        .find(|c| c.name().as_str().eq_ignore_ascii_case(name))
}

fn f64_values(col: &Column) -> Result<Vec<f64>> {
    let cast = col.cast(&DataType::Float64)?;
    let ca = cast.f64()?;
    ca.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| anyhow!("null in column '{}' at row {i}", col.name())))
        .collect()
}

fn date_values(col: &Column) -> Result<Vec<NaiveDate>> {
    let cast = col.cast(&DataType::String)?;
    let ca = cast.str()?;
    ca.into_iter()
        .enumerate()
        .map(|(i, v)| {
            let raw = v.ok_or_else(|| anyhow!("null date at row {i}"))?;
            let day = raw.get(..10).unwrap_or(raw);
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .with_context(|| format!("bad date '{raw}' at row {i}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vol_report_{}_{name}.csv", std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_close_and_ranges() {
        let path = write_temp(
            "spy",
            "Date,Open,High,Low,Close\n\
             2024-01-02,100,101.5,99.0,100.5\n\
             2024-01-03,100.5,102.0,100.0,101.0\n\
             2024-01-04,101,101.8,99.5,100.0\n",
        );
        let data = load_csv(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(data.prices.len(), 3);
        assert!(data.has_ranges());
        assert_eq!(data.prices.closes(), vec![100.5, 101.0, 100.0]);
        assert_eq!(
            data.prices.last_date(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()
        );
    }

    #[test]
    fn close_only_has_no_ranges() {
        let path = write_temp(
            "close_only",
            "date,close\n2024-01-02,100\n2024-01-03,101\n",
        );
        let data = load_csv(&path).unwrap();
        fs::remove_file(&path).ok();
        assert!(!data.has_ranges());
        // integer column is cast to f64
        assert_eq!(data.prices.closes(), vec![100.0, 101.0]);
    }

    #[test]
    fn timestamps_truncated_to_day() {
        let path = write_temp(
            "tz",
            "date,close\n2024-01-02 00:00:00-05:00,100\n2024-01-03 00:00:00-05:00,101\n",
        );
        let data = load_csv(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(data.prices.len(), 2);
    }

    #[test]
    fn single_range_column_rejected() {
        let path = write_temp(
            "half_range",
            "date,close,high\n2024-01-02,100,101\n2024-01-03,101,102\n",
        );
        let err = load_csv(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(format!("{err:#}").contains("low"), "{err:#}");
    }

    #[test]
    fn missing_close_rejected() {
        let path = write_temp("no_close", "date,open\n2024-01-02,100\n2024-01-03,101\n");
        let err = load_csv(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(format!("{err:#}").contains("close"));
    }

    #[test]
    fn symbol_is_upper_stem() {
        assert_eq!(symbol_from_path(Path::new("/data/aapl.csv")), "AAPL");
    }
}
