//! Deterministic fixtures shared by the unit tests.
use chrono::NaiveDate;

use crate::series::{business_days_after, PriceSeries, RangePoint, RangeSeries};

/// `n` consecutive business days starting Monday 2023-01-02.
pub fn business_dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 12, 30).unwrap();
    business_days_after(start, n)
}

pub fn prices_from(closes: &[f64]) -> PriceSeries {
    PriceSeries::from_columns(&business_dates(closes.len()), closes).unwrap()
}

/// Oscillating random-walk-like path with slowly varying amplitude so the
/// returns show some volatility clustering.
pub fn synthetic_prices(n: usize) -> PriceSeries {
    let mut closes = Vec::with_capacity(n);
    let mut p = 100.0_f64;
    closes.push(p);
    for t in 1..n {
        let tf = t as f64;
        let shock = 0.011 * (tf * 1.3).sin()
            + 0.006 * (tf * 0.37).cos() * (((t % 7) as f64) - 3.0) / 3.0
            + 0.004 * (tf * 2.9).sin();
        let regime = 1.0 + 0.6 * (tf / 25.0).sin();
        p *= (shock * regime).exp();
        closes.push(p);
    }
    prices_from(&closes)
}

/// High/low bands around each close, width varying with the day.
pub fn synthetic_ranges(prices: &PriceSeries) -> RangeSeries {
    let points = prices
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let half = 0.004 + 0.003 * ((i as f64) * 0.9).sin().abs();
            RangePoint { date: p.date, high: p.close * (1.0 + half), low: p.close * (1.0 - half) }
        })
        .collect();
    RangeSeries::new(points).unwrap()
}
