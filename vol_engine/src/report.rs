/// report.rs — One-shot forecast report
///
/// Runs the complete pipeline for a single instrument:
///
///   prices (+ ranges) ─► historical HV ─┐
///                      ─► GARCH path   ─┼─► ensemble fit ─► blended path ─► bands
///                      ─► EWMA path    ─┘
///
/// and collects everything the serving layer needs into one serialisable
/// value.  Residuals compare each forecast path against the most recent
/// historical values of the same length.
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::ensemble::{EnsemblePrediction, ModelWeights, VolatilityEnsemble};
use crate::error::{VolError, VolResult};
use crate::intervals::{confidence_intervals, IntervalBounds};
use crate::models::ewma::decay_forecast;
use crate::models::historical::historical_volatility;
use crate::models::ModelKind;
use crate::series::{ForecastSeries, PriceSeries, RangeSeries, VolatilitySeries};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualSummary {
    pub count: usize,
    pub mean: f64,
    pub mean_abs: f64,
    pub max_abs: f64,
}

impl ResidualSummary {
    /// forecast − historical, pairing the forecast with the trailing
    /// `len(forecast)` historical values.
    ///
    /// Trailing, not leading: pairing with the oldest values would measure
    /// the forecast against history it was never meant to track.
    pub fn compare(forecast: &ForecastSeries, historical: &VolatilitySeries) -> Self {
        let hist = historical.values();
        let fc = forecast.values();
        let n = fc.len().min(hist.len());
        let residuals: Vec<f64> = fc[..n]
            .iter()
            .zip(&hist[hist.len() - n..])
            .map(|(f, h)| f - h)
            .collect();

        if residuals.is_empty() {
            return Self { count: 0, mean: 0.0, mean_abs: 0.0, max_abs: 0.0 };
        }
        let count = residuals.len();
        Self {
            count,
            mean: residuals.iter().sum::<f64>() / count as f64,
            mean_abs: residuals.iter().map(|r| r.abs()).sum::<f64>() / count as f64,
            max_abs: residuals.iter().fold(0.0, |m, r| r.abs().max(m)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub historical_window: usize,
    pub forecast_horizon: usize,
    pub historical: VolatilitySeries,
    pub garch_forecast: ForecastSeries,
    pub ewma_forecast: ForecastSeries,
    /// Last historical level decayed by `decay^i`; absent when that level
    /// is zero (flat closes across the last window)
    pub decay_forecast: Option<ForecastSeries>,
    pub ensemble_forecast: ForecastSeries,
    pub model_weights: ModelWeights,
    pub model_levels: BTreeMap<ModelKind, f64>,
    /// Sample std of the historical volatility series
    pub dispersion: f64,
    pub bounds: IntervalBounds,
    pub garch_residuals: ResidualSummary,
    pub ensemble_residuals: ResidualSummary,
}

impl ForecastReport {
    pub fn build(
        prices: &PriceSeries,
        ranges: Option<&RangeSeries>,
        cfg: &EngineConfig,
    ) -> VolResult<Self> {
        cfg.validate()?;
        let ensemble = VolatilityEnsemble::new(cfg.ensemble())?;
        let horizon = cfg.forecast_horizon;

        let fit = ensemble.fit(prices, ranges)?;
        let mut prediction = ensemble.predict_with_paths(&fit)?;
        let garch_forecast = take_path(&mut prediction, ModelKind::Garch)?;
        let ewma_forecast = take_path(&mut prediction, ModelKind::Ewma)?;
        let ensemble_forecast = prediction.blended;

        let historical = historical_volatility(prices, cfg.historical_window)?;

        let current = historical
            .last()
            .map(|p| p.value)
            .ok_or_else(|| VolError::numerical("historical estimator produced no values"))?;
        let decay_forecast = if current > 0.0 {
            Some(decay_forecast(current, cfg.decay, prices.last_date(), horizon)?)
        } else {
            warn!("Last historical volatility is zero; skipping decay forecast");
            None
        };

        // A single historical point has no spread
        let dispersion = historical.std_dev().unwrap_or(0.0);
        let bounds = confidence_intervals(&ensemble_forecast, dispersion, cfg.confidence)?;

        let garch_residuals = ResidualSummary::compare(&garch_forecast, &historical);
        let ensemble_residuals = ResidualSummary::compare(&ensemble_forecast, &historical);

        info!(
            "Report: {} historical points, ensemble day-1 {:.2}%, band ±{:.2}",
            historical.len(),
            ensemble_forecast.values()[0],
            bounds.z_score * dispersion
        );

        Ok(Self {
            historical_window: cfg.historical_window,
            forecast_horizon: horizon,
            historical,
            garch_forecast,
            ewma_forecast,
            decay_forecast,
            ensemble_forecast,
            model_weights: fit.weights().clone(),
            model_levels: fit.levels().clone(),
            dispersion,
            bounds,
            garch_residuals,
            ensemble_residuals,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn take_path(prediction: &mut EnsemblePrediction, kind: ModelKind) -> VolResult<ForecastSeries> {
    prediction
        .paths
        .remove(&kind)
        .ok_or_else(|| VolError::numerical(format!("{kind} produced no forecast path")))
}

impl std::fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "════════════════════════════════════════════════════════════")?;
        writeln!(f, "  VOLATILITY FORECAST  (window {}d, horizon {}d)", self.historical_window, self.forecast_horizon)?;
        writeln!(f, "════════════════════════════════════════════════════════════")?;
        if let Some(last) = self.historical.last() {
            writeln!(f, "  Historical vol   : {:.2}%  ({})", last.value, last.date)?;
        }
        writeln!(f, "  Dispersion (σ)   : {:.2}", self.dispersion)?;
        writeln!(f, "  Model weights    :")?;
        for (kind, w) in self.model_weights.iter() {
            let level = self.model_levels.get(&kind).copied().unwrap_or(f64::NAN);
            writeln!(f, "    {:<11} {:>6.2}%   level {:>7.2}%", kind.name(), w * 100.0, level)?;
        }
        writeln!(f, "────────────────────────────────────────────────────────────")?;
        writeln!(
            f,
            "  {:<11} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "DATE", "GARCH", "EWMA", "ENSEMBLE", "LOWER", "UPPER"
        )?;
        let garch = self.garch_forecast.values();
        let ewma = self.ewma_forecast.values();
        let lower = self.bounds.lower.values();
        let upper = self.bounds.upper.values();
        for (i, p) in self.ensemble_forecast.iter().enumerate() {
            writeln!(
                f,
                "  {:<11} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                p.date.to_string(),
                garch[i],
                ewma[i],
                p.value,
                lower[i],
                upper[i]
            )?;
        }
        writeln!(f, "────────────────────────────────────────────────────────────")?;
        writeln!(
            f,
            "  {:.0}% band (z = {:.3}); residual MAE garch {:.2} / ensemble {:.2}",
            self.bounds.confidence * 100.0,
            self.bounds.z_score,
            self.garch_residuals.mean_abs,
            self.ensemble_residuals.mean_abs
        )?;
        writeln!(f, "════════════════════════════════════════════════════════════")
    }
}
