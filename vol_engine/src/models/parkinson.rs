/// models/parkinson.rs — Parkinson (1980) high/low range estimator
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
///   Per-bar variance proxy:   p_t = (ln(H_t / L_t))² / (4 · ln 2)
///   Rolling estimate:         σ_t = √( mean(p_{t−w+1} … p_t) )
///   Annualised:               PV_t = σ_t · √252 · 100
///
/// Assumes no drift and no overnight gaps; uses intraday range so it reacts
/// to moves that close-to-close returns miss.
/// ─────────────────────────────────────────────────────────────────────────
use std::f64::consts::LN_2;

use crate::error::VolResult;
use crate::models::check_window;
use crate::series::{annualise, RangeSeries, VolatilitySeries};

/// Rolling Parkinson volatility, `len(ranges) − window + 1` points.
pub fn parkinson_volatility(ranges: &RangeSeries, window: usize) -> VolResult<VolatilitySeries> {
    check_window(window, ranges.len())?;

    let scale = 1.0 / (4.0 * LN_2);
    let per_bar: Vec<f64> = ranges
        .points()
        .iter()
        .map(|p| scale * (p.high / p.low).ln().powi(2))
        .collect();

    let values: Vec<f64> = per_bar
        .windows(window)
        .map(|w| annualise((w.iter().sum::<f64>() / window as f64).sqrt()))
        .collect();

    let dates: Vec<_> = ranges.points()[window - 1..].iter().map(|p| p.date).collect();
    Ok(VolatilitySeries::from_parts(&dates, values))
}
