/// series.rs — Date-indexed input and output series
///
/// Inputs (`PriceSeries`, `RangeSeries`) are validated once at construction
/// and immutable afterwards, so estimators can borrow them without
/// re-checking.  Outputs (`VolatilitySeries`, `ForecastSeries`) carry
/// annualised volatility in percent.
///
/// ─────────────────────────────────────────────────────────────────────────
/// CONVENTIONS
/// ─────────────────────────────────────────────────────────────────────────
///
///   Log return:        r_t = ln(P_t / P_{t−1}),   aligned to date t
///   Annualisation:     σ_annual(%) = σ_daily · √252 · 100
///   Forecast dates:    business days (Mon–Fri) strictly after the last
///                      historical date, starting the next calendar day
/// ─────────────────────────────────────────────────────────────────────────
use std::ops::Deref;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{VolError, VolResult};

/// Trading days per year used to annualise daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Daily σ (as a fraction) → annualised volatility in percent.
pub fn annualise(daily_sigma: f64) -> f64 {
    daily_sigma * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
}

// ── Inputs ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes, at least two points, strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> VolResult<Self> {
        if points.len() < 2 {
            return Err(VolError::invalid_input(format!(
                "need at least 2 price points, got {}",
                points.len()
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(VolError::invalid_input(format!(
                "non-positive or non-finite close {} on {}",
                p.close, p.date
            )));
        }
        check_increasing(points.iter().map(|p| p.date))?;
        Ok(Self { points })
    }

    pub fn from_columns(dates: &[NaiveDate], closes: &[f64]) -> VolResult<Self> {
        if dates.len() != closes.len() {
            return Err(VolError::invalid_input(format!(
                "date/close length mismatch: {} vs {}",
                dates.len(),
                closes.len()
            )));
        }
        let points = dates
            .iter()
            .zip(closes)
            .map(|(&date, &close)| PricePoint { date, close })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    /// `len − 1` log returns; element `i` belongs to `points[i + 1]`.
    pub fn log_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| (w[1].close / w[0].close).ln())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangePoint {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
}

/// Daily high/low ranges, `high ≥ low > 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSeries {
    points: Vec<RangePoint>,
}

impl RangeSeries {
    pub fn new(points: Vec<RangePoint>) -> VolResult<Self> {
        if points.is_empty() {
            return Err(VolError::invalid_input("range series is empty"));
        }
        for p in &points {
            if !p.low.is_finite() || !p.high.is_finite() || p.low <= 0.0 {
                return Err(VolError::invalid_input(format!(
                    "low must be positive and finite, got {} on {}",
                    p.low, p.date
                )));
            }
            if p.high < p.low {
                return Err(VolError::invalid_input(format!(
                    "high {} below low {} on {}",
                    p.high, p.low, p.date
                )));
            }
        }
        check_increasing(points.iter().map(|p| p.date))?;
        Ok(Self { points })
    }

    /// Build from optional columns, as they come out of a data frame.
    /// A missing column is an input error rather than "no ranges".
    pub fn from_columns(
        dates: &[NaiveDate],
        highs: Option<&[f64]>,
        lows: Option<&[f64]>,
    ) -> VolResult<Self> {
        let highs = highs.ok_or_else(|| VolError::invalid_input("missing 'high' column"))?;
        let lows = lows.ok_or_else(|| VolError::invalid_input("missing 'low' column"))?;
        if highs.len() != dates.len() || lows.len() != dates.len() {
            return Err(VolError::invalid_input(format!(
                "range column lengths differ: dates={} high={} low={}",
                dates.len(),
                highs.len(),
                lows.len()
            )));
        }
        let points = dates
            .iter()
            .zip(highs.iter().zip(lows))
            .map(|(&date, (&high, &low))| RangePoint { date, high, low })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[RangePoint] {
        &self.points
    }

    /// True when both series cover exactly the same dates.
    pub fn is_aligned_with(&self, prices: &PriceSeries) -> bool {
        self.points.len() == prices.len()
            && self
                .points
                .iter()
                .zip(prices.points())
                .all(|(r, p)| r.date == p.date)
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolPoint {
    pub date: NaiveDate,
    /// Annualised volatility in percent
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct VolatilitySeries {
    points: Vec<VolPoint>,
}

impl VolatilitySeries {
    pub fn new(points: Vec<VolPoint>) -> Self {
        Self { points }
    }

    pub(crate) fn from_parts(dates: &[NaiveDate], values: Vec<f64>) -> Self {
        let points = dates
            .iter()
            .zip(values)
            .map(|(&date, value)| VolPoint { date, value })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[VolPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VolPoint> {
        self.points.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last(&self) -> Option<VolPoint> {
        self.points.last().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        crate::stats::mean(&self.values())
    }

    /// Sample standard deviation of the values (dispersion for intervals).
    pub fn std_dev(&self) -> Option<f64> {
        crate::stats::std_dev(&self.values())
    }
}

/// A volatility path over the business days following `origin`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    origin: NaiveDate,
    #[serde(rename = "points")]
    series: VolatilitySeries,
}

impl ForecastSeries {
    /// Attach business-day dates after `origin` to a forecast path.
    pub(crate) fn from_values(origin: NaiveDate, values: Vec<f64>) -> Self {
        let dates = business_days_after(origin, values.len());
        Self {
            origin,
            series: VolatilitySeries::from_parts(&dates, values),
        }
    }

    /// Last historical date the forecast was made from.
    pub fn origin(&self) -> NaiveDate {
        self.origin
    }

    pub fn as_series(&self) -> &VolatilitySeries {
        &self.series
    }

    pub fn into_series(self) -> VolatilitySeries {
        self.series
    }
}

impl Deref for ForecastSeries {
    type Target = VolatilitySeries;

    fn deref(&self) -> &VolatilitySeries {
        &self.series
    }
}

// ── Calendar helpers ──────────────────────────────────────────────────────

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `n` business days starting the calendar day after `last`.
pub fn business_days_after(last: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut d = last;
    while dates.len() < n {
        d += Duration::days(1);
        if is_business_day(d) {
            dates.push(d);
        }
    }
    dates
}

fn check_increasing(dates: impl Iterator<Item = NaiveDate>) -> VolResult<()> {
    let mut prev: Option<NaiveDate> = None;
    for d in dates {
        if let Some(p) = prev {
            if d <= p {
                return Err(VolError::invalid_input(format!(
                    "dates must be strictly increasing: {d} follows {p}"
                )));
            }
        }
        prev = Some(d);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn price_series_rejects_short_and_non_positive() {
        let one = vec![PricePoint { date: ymd(2024, 1, 2), close: 100.0 }];
        assert_eq!(PriceSeries::new(one).unwrap_err().kind(), ErrorKind::InvalidInput);

        let bad = PriceSeries::from_columns(&[ymd(2024, 1, 2), ymd(2024, 1, 3)], &[100.0, 0.0]);
        assert_eq!(bad.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn price_series_rejects_unordered_dates() {
        let r = PriceSeries::from_columns(&[ymd(2024, 1, 3), ymd(2024, 1, 3)], &[100.0, 101.0]);
        assert!(matches!(r, Err(VolError::InvalidInput(_))));
    }

    #[test]
    fn log_returns_align_to_later_point() {
        let s = PriceSeries::from_columns(
            &[ymd(2024, 1, 2), ymd(2024, 1, 3), ymd(2024, 1, 4)],
            &[100.0, 110.0, 99.0],
        )
        .unwrap();
        let r = s.log_returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.1f64).ln()).abs() < 1e-15);
        assert!((r[1] - (0.9f64).ln()).abs() < 1e-15);
    }

    #[test]
    fn range_series_missing_column() {
        let dates = [ymd(2024, 1, 2)];
        let r = RangeSeries::from_columns(&dates, Some(&[101.0]), None);
        assert!(matches!(r, Err(VolError::InvalidInput(m)) if m.contains("low")));
    }

    #[test]
    fn range_series_rejects_inverted_or_zero_low() {
        let d = ymd(2024, 1, 2);
        assert!(RangeSeries::new(vec![RangePoint { date: d, high: 99.0, low: 100.0 }]).is_err());
        assert!(RangeSeries::new(vec![RangePoint { date: d, high: 1.0, low: 0.0 }]).is_err());
    }

    #[test]
    fn business_days_skip_weekend() {
        // Friday 2024-01-05 → Mon 8, Tue 9, Wed 10
        let days = business_days_after(ymd(2024, 1, 5), 3);
        assert_eq!(days, vec![ymd(2024, 1, 8), ymd(2024, 1, 9), ymd(2024, 1, 10)]);
    }

    #[test]
    fn business_days_from_saturday_origin() {
        let days = business_days_after(ymd(2024, 1, 6), 2);
        assert_eq!(days, vec![ymd(2024, 1, 8), ymd(2024, 1, 9)]);
    }

    #[test]
    fn forecast_series_dates() {
        let f = ForecastSeries::from_values(ymd(2024, 1, 4), vec![10.0, 11.0, 12.0]);
        assert_eq!(f.origin(), ymd(2024, 1, 4));
        assert_eq!(f.dates(), vec![ymd(2024, 1, 5), ymd(2024, 1, 8), ymd(2024, 1, 9)]);
        assert_eq!(f.values(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn annualise_one_percent_daily() {
        assert!((annualise(0.01) - 15.874507866387544).abs() < 1e-9);
    }
}
