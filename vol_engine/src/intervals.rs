/// intervals.rs — Symmetric normal confidence bands around a forecast
///
///   z      = Φ⁻¹((1 + c) / 2)
///   lower  = f_t − z · σ_hist
///   upper  = f_t + z · σ_hist
///
/// σ_hist is the dispersion of the historical volatility series.  Φ⁻¹ comes
/// from statrs, so the same inputs always give the same band.
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{VolError, VolResult};
use crate::series::{ForecastSeries, VolatilitySeries};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalBounds {
    pub confidence: f64,
    pub z_score: f64,
    pub lower: VolatilitySeries,
    pub upper: VolatilitySeries,
}

impl IntervalBounds {
    /// upper − lower at each step (constant for a fixed σ).
    pub fn widths(&self) -> Vec<f64> {
        self.upper
            .iter()
            .zip(self.lower.iter())
            .map(|(u, l)| u.value - l.value)
            .collect()
    }
}

/// Two-sided standard-normal quantile for a confidence level in (0, 1).
pub fn z_score(confidence: f64) -> VolResult<f64> {
    if !confidence.is_finite() || confidence <= 0.0 || confidence >= 1.0 {
        return Err(VolError::invalid_input(format!(
            "confidence must lie in (0, 1), got {confidence}"
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| VolError::numerical(format!("standard normal: {e}")))?;
    Ok(normal.inverse_cdf((1.0 + confidence) / 2.0))
}

pub fn confidence_intervals(
    forecast: &ForecastSeries,
    dispersion: f64,
    confidence: f64,
) -> VolResult<IntervalBounds> {
    if !dispersion.is_finite() || dispersion < 0.0 {
        return Err(VolError::invalid_input(format!(
            "dispersion must be finite and non-negative, got {dispersion}"
        )));
    }
    let z = z_score(confidence)?;
    let half = z * dispersion;
    let dates = forecast.dates();
    let values = forecast.values();

    let lower = values.iter().map(|f| f - half).collect();
    let upper = values.iter().map(|f| f + half).collect();

    Ok(IntervalBounds {
        confidence,
        z_score: z,
        lower: VolatilitySeries::from_parts(&dates, lower),
        upper: VolatilitySeries::from_parts(&dates, upper),
    })
}
