/// models/ewma.rs — Exponentially Weighted Moving Average variance (RiskMetrics)
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
///   Seed:       v_0 = r_0²
///   Recursion:  v_t = λ · v_{t−1} + (1 − λ) · r_t²,     0 < λ < 1
///
///   Variance-mode forecast (flat, no mean reversion):
///       f_i = √(v_T) · √252 · 100                for i = 0 … h−1
///
///   Current-level (decay-power) forecast:
///       f_i = σ_now · decay^i                    for i = 0 … h−1
///
/// λ = 0.94 is the RiskMetrics daily default.  v is floored at 1e-12 so a
/// perfectly flat price path still forecasts a strictly positive level.
/// ─────────────────────────────────────────────────────────────────────────
use chrono::NaiveDate;

use crate::error::{VolError, VolResult};
use crate::models::check_horizon;
use crate::series::{annualise, ForecastSeries, PriceSeries, VolatilitySeries};

pub const DEFAULT_LAMBDA: f64 = 0.94;
pub const MIN_VARIANCE: f64 = 1e-12;

/// Online EWMA variance of a return stream.
#[derive(Debug, Clone)]
pub struct EwmaVariance {
    lambda: f64,
    var: Option<f64>,
}

impl EwmaVariance {
    pub fn new(lambda: f64) -> VolResult<Self> {
        check_lambda(lambda)?;
        Ok(Self { lambda, var: None })
    }

    /// Feed one return, get the updated variance.
    pub fn update(&mut self, r: f64) -> f64 {
        let sq = r * r;
        let next = match self.var {
            Some(prev) => self.lambda * prev + (1.0 - self.lambda) * sq,
            None => sq,
        };
        self.var = Some(next);
        next
    }

    pub fn variance(&self) -> Option<f64> {
        self.var
    }
}

/// Full variance path v_0 … v_T for a return series.
pub fn ewma_variance(returns: &[f64], lambda: f64) -> VolResult<Vec<f64>> {
    let mut ewma = EwmaVariance::new(lambda)?;
    Ok(returns.iter().map(|&r| ewma.update(r)).collect())
}

#[derive(Debug, Clone)]
pub struct EwmaForecaster {
    lambda: f64,
}

impl Default for EwmaForecaster {
    fn default() -> Self {
        Self { lambda: DEFAULT_LAMBDA }
    }
}

impl EwmaForecaster {
    pub fn new(lambda: f64) -> VolResult<Self> {
        check_lambda(lambda)?;
        Ok(Self { lambda })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Annualised EWMA volatility for every return date.
    pub fn volatility_path(&self, prices: &PriceSeries) -> VolResult<VolatilitySeries> {
        let variances = ewma_variance(&prices.log_returns(), self.lambda)?;
        let values = variances.into_iter().map(|v| annualise(v.sqrt())).collect();
        Ok(VolatilitySeries::from_parts(&prices.dates()[1..], values))
    }

    /// Annualised √v_T from a raw return series.
    pub fn current_volatility(&self, returns: &[f64]) -> VolResult<f64> {
        let variances = ewma_variance(returns, self.lambda)?;
        let last = variances
            .last()
            .copied()
            .ok_or_else(|| VolError::invalid_input("EWMA needs at least one return"))?;
        Ok(annualise(last.max(MIN_VARIANCE).sqrt()))
    }

    /// Flat forecast: the last variance held constant over `horizon` days.
    pub fn forecast(&self, prices: &PriceSeries, horizon: usize) -> VolResult<ForecastSeries> {
        check_horizon(horizon)?;
        let level = self.current_volatility(&prices.log_returns())?;
        Ok(ForecastSeries::from_values(prices.last_date(), vec![level; horizon]))
    }
}

/// Current-level forecast `σ_now · decay^i`, dated after `origin`.
pub fn decay_forecast(
    current_volatility: f64,
    decay: f64,
    origin: NaiveDate,
    horizon: usize,
) -> VolResult<ForecastSeries> {
    check_horizon(horizon)?;
    if !current_volatility.is_finite() || current_volatility <= 0.0 {
        return Err(VolError::invalid_input(format!(
            "current volatility must be positive and finite, got {current_volatility}"
        )));
    }
    if !decay.is_finite() || decay <= 0.0 || decay > 1.0 {
        return Err(VolError::invalid_input(format!("decay must lie in (0, 1], got {decay}")));
    }
    let values = (0..horizon)
        .map(|i| current_volatility * decay.powi(i as i32))
        .collect();
    Ok(ForecastSeries::from_values(origin, values))
}

fn check_lambda(lambda: f64) -> VolResult<()> {
    if !lambda.is_finite() || lambda <= 0.0 || lambda >= 1.0 {
        return Err(VolError::invalid_input(format!(
            "EWMA lambda must lie in (0, 1), got {lambda}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{prices_from, synthetic_prices};

    #[test]
    fn single_seed_return() {
        let v = ewma_variance(&[0.01], 0.94).unwrap();
        assert_eq!(v.len(), 1);
        assert!((v[0] - 0.0001).abs() < 1e-15);

        let f = EwmaForecaster::new(0.94).unwrap();
        let level = f.current_volatility(&[0.01]).unwrap();
        let origin = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let fc = decay_forecast(level, 0.94, origin, 3).unwrap();
        let vals = fc.values();

        let v_ann = 0.01 * 252f64.sqrt() * 100.0;
        assert!((vals[0] - v_ann).abs() < 1e-9);
        assert!((vals[1] - v_ann * 0.94).abs() < 1e-9);
        assert!((vals[2] - v_ann * 0.94 * 0.94).abs() < 1e-9);
        assert!(vals[0] > vals[1] && vals[1] > vals[2]);
    }

    #[test]
    fn decay_mode_is_exact_power() {
        let origin = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let fc = decay_forecast(23.7, 0.97, origin, 10).unwrap();
        let vals = fc.values();
        for (i, v) in vals.iter().enumerate() {
            assert_eq!(*v, vals[0] * 0.97f64.powi(i as i32));
        }
    }

    #[test]
    fn recursion_matches_hand_computation() {
        let r = [0.01, -0.02, 0.005];
        let v = ewma_variance(&r, 0.9).unwrap();
        let v1 = 0.9 * 0.0001 + 0.1 * 0.0004;
        let v2 = 0.9 * v1 + 0.1 * 0.000025;
        assert!((v[1] - v1).abs() < 1e-15);
        assert!((v[2] - v2).abs() < 1e-15);
    }

    #[test]
    fn flat_forecast_is_constant_and_positive() {
        let prices = synthetic_prices(60);
        let fc = EwmaForecaster::default().forecast(&prices, 5).unwrap();
        let vals = fc.values();
        assert_eq!(vals.len(), 5);
        assert!(vals.iter().all(|v| *v > 0.0 && *v == vals[0]));
        assert!(fc.dates().iter().all(|d| *d > prices.last_date()));
    }

    #[test]
    fn flat_prices_still_positive() {
        let prices = prices_from(&[10.0; 6]);
        let fc = EwmaForecaster::default().forecast(&prices, 2).unwrap();
        assert!(fc.values().iter().all(|v| *v > 0.0));
    }

    #[test]
    fn volatility_path_aligned_to_returns() {
        let prices = synthetic_prices(20);
        let path = EwmaForecaster::default().volatility_path(&prices).unwrap();
        assert_eq!(path.len(), 19);
        assert_eq!(path.points()[0].date, prices.points()[1].date);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(EwmaForecaster::new(1.0).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(EwmaForecaster::new(0.0).unwrap_err().kind(), ErrorKind::InvalidInput);
        let origin = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(decay_forecast(0.0, 0.94, origin, 3).is_err());
        assert!(decay_forecast(10.0, 1.5, origin, 3).is_err());
        assert!(decay_forecast(10.0, 0.94, origin, 0).is_err());
    }
}
