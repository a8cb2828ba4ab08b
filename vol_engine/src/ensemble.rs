/// ensemble.rs — Inverse-variance ensemble of volatility estimators
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// Current level per model (annualised %):
///     garch      = mean of the h-step GARCH forecast
///     ewma       = mean of the flat EWMA forecast
///     historical = last rolling close-to-close value
///     parkinson  = last rolling range value        (only with high/low data)
///
/// Weights (ε = 1e-10 keeps a zero level finite):
///     w_i = (1 / (L_i + ε)) / Σ_j (1 / (L_j + ε))
///
/// Blended forecast over the forecasting models F = {garch, ewma}:
///     f_t = Σ_{i∈F} (w_i / Σ_{j∈F} w_j) · f_{i,t}
///
/// Historical and Parkinson only have a current level, so their weight
/// shapes the normalisation in `fit` but the blend is re-normalised over F.
/// The result is a convex combination of the GARCH and EWMA paths.
/// ─────────────────────────────────────────────────────────────────────────
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{VolError, VolResult};
use crate::models::ewma::{EwmaForecaster, DEFAULT_LAMBDA};
use crate::models::garch::GarchForecaster;
use crate::models::historical::historical_volatility;
use crate::models::parkinson::parkinson_volatility;
use crate::models::{check_horizon, check_window, ModelKind};
use crate::series::{ForecastSeries, PriceSeries, RangeSeries};

pub const WEIGHT_EPSILON: f64 = 1e-10;

/// Non-negative per-model weights summing to one.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ModelWeights(BTreeMap<ModelKind, f64>);

impl ModelWeights {
    /// Inverse-level weights over every model present in `levels`.
    pub fn inverse_variance(levels: &BTreeMap<ModelKind, f64>) -> VolResult<Self> {
        if levels.is_empty() {
            return Err(VolError::invalid_input("no model levels to weight"));
        }
        if let Some((kind, level)) = levels.iter().find(|(_, l)| !l.is_finite() || **l < 0.0) {
            return Err(VolError::numerical(format!("{kind} level is not a valid volatility: {level}")));
        }
        let inverse: BTreeMap<ModelKind, f64> = levels
            .iter()
            .map(|(&kind, &level)| (kind, 1.0 / (level + WEIGHT_EPSILON)))
            .collect();
        let total: f64 = inverse.values().sum();
        Ok(Self(inverse.into_iter().map(|(k, v)| (k, v / total)).collect()))
    }

    pub fn get(&self, kind: ModelKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelKind, f64)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    /// Rolling window for the historical and Parkinson estimators
    pub historical_window: usize,
    /// Number of business days to forecast
    pub forecast_horizon: usize,
    /// EWMA decay λ
    pub ewma_lambda: f64,
    pub garch: GarchForecaster,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            historical_window: 30,
            forecast_horizon: 5,
            ewma_lambda: DEFAULT_LAMBDA,
            garch: GarchForecaster::default(),
        }
    }
}

/// Output of `fit`: everything `predict` needs, as a plain value.
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleFit {
    weights: ModelWeights,
    levels: BTreeMap<ModelKind, f64>,
    #[serde(skip)]
    prices: PriceSeries,
}

impl EnsembleFit {
    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    /// Current volatility level each weight was derived from.
    pub fn levels(&self) -> &BTreeMap<ModelKind, f64> {
        &self.levels
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }
}

/// Blended forecast plus the per-model paths it was built from.
#[derive(Debug, Clone)]
pub struct EnsemblePrediction {
    pub blended: ForecastSeries,
    pub paths: BTreeMap<ModelKind, ForecastSeries>,
}

impl EnsemblePrediction {
    pub fn path(&self, kind: ModelKind) -> Option<&ForecastSeries> {
        self.paths.get(&kind)
    }
}

#[derive(Debug, Clone)]
pub struct VolatilityEnsemble {
    config: EnsembleConfig,
    ewma: EwmaForecaster,
}

impl VolatilityEnsemble {
    pub fn new(config: EnsembleConfig) -> VolResult<Self> {
        check_horizon(config.forecast_horizon)?;
        if config.historical_window < 2 {
            return Err(VolError::invalid_input(format!(
                "historical window must be at least 2, got {}",
                config.historical_window
            )));
        }
        let ewma = EwmaForecaster::new(config.ewma_lambda)?;
        Ok(Self { config, ewma })
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Compute per-model levels and inverse-variance weights.
    pub fn fit(&self, prices: &PriceSeries, ranges: Option<&RangeSeries>) -> VolResult<EnsembleFit> {
        let window = self.config.historical_window;
        let horizon = self.config.forecast_horizon;

        // All input checks happen before any model is fitted
        check_window(window, prices.len())?;
        if let Some(r) = ranges {
            if !r.is_aligned_with(prices) {
                return Err(VolError::invalid_input(
                    "high/low ranges are not aligned with the price dates",
                ));
            }
        }

        let mut levels = BTreeMap::new();
        for kind in ModelKind::ALL {
            let level = match kind {
                ModelKind::Historical => last_value(historical_volatility(prices, window)?.last(), kind)?,
                ModelKind::Parkinson => match ranges {
                    Some(r) => last_value(parkinson_volatility(r, window)?.last(), kind)?,
                    None => continue,
                },
                ModelKind::Garch => mean_value(&self.config.garch.forecast(prices, horizon)?, kind)?,
                ModelKind::Ewma => mean_value(&self.ewma.forecast(prices, horizon)?, kind)?,
            };
            levels.insert(kind, level);
        }

        let weights = ModelWeights::inverse_variance(&levels)?;
        info!(
            "Ensemble fit on {} prices ({} → {}): weights {}",
            prices.len(),
            prices.first_date(),
            prices.last_date(),
            weights
                .iter()
                .map(|(k, w)| format!("{k}={w:.3}"))
                .collect::<Vec<_>>()
                .join(" ")
        );

        Ok(EnsembleFit { weights, levels, prices: prices.clone() })
    }

    /// Blend the forecasting models' paths with re-normalised weights.
    pub fn predict(&self, fit: &EnsembleFit) -> VolResult<ForecastSeries> {
        self.predict_with_paths(fit).map(|p| p.blended)
    }

    /// Like `predict`, but also hands back each forecasting model's own path.
    pub fn predict_with_paths(&self, fit: &EnsembleFit) -> VolResult<EnsemblePrediction> {
        let horizon = self.config.forecast_horizon;
        let prices = &fit.prices;

        let mut paths = BTreeMap::new();
        for (kind, _) in fit.weights.iter() {
            if let Some(path) = self.forecast_path(kind, prices, horizon)? {
                paths.insert(kind, path);
            }
        }

        let total: f64 = paths.keys().filter_map(|k| fit.weights.get(*k)).sum();
        if paths.is_empty() || total <= 0.0 {
            return Err(VolError::numerical("no forecasting model carries positive weight"));
        }

        let mut blended = vec![0.0; horizon];
        for (kind, path) in &paths {
            let share = fit.weights.get(*kind).unwrap_or(0.0) / total;
            debug!("blend {kind}: share {share:.4}");
            for (b, v) in blended.iter_mut().zip(path.values()) {
                *b += share * v;
            }
        }
        let blended = blended.into_iter().map(f64::abs).collect();

        Ok(EnsemblePrediction {
            blended: ForecastSeries::from_values(prices.last_date(), blended),
            paths,
        })
    }

    /// Forward path for a model, or `None` for level-only estimators.
    pub fn forecast_path(
        &self,
        kind: ModelKind,
        prices: &PriceSeries,
        horizon: usize,
    ) -> VolResult<Option<ForecastSeries>> {
        match kind {
            ModelKind::Garch => self.config.garch.forecast(prices, horizon).map(Some),
            ModelKind::Ewma => self.ewma.forecast(prices, horizon).map(Some),
            ModelKind::Historical | ModelKind::Parkinson => Ok(None),
        }
    }
}

fn last_value(point: Option<crate::series::VolPoint>, kind: ModelKind) -> VolResult<f64> {
    point
        .map(|p| p.value)
        .ok_or_else(|| VolError::numerical(format!("{kind} estimator produced no values")))
}

fn mean_value(forecast: &ForecastSeries, kind: ModelKind) -> VolResult<f64> {
    forecast
        .mean()
        .ok_or_else(|| VolError::numerical(format!("{kind} forecast is empty")))
}

/// Stateful fit-then-predict façade over `VolatilityEnsemble`.
///
/// Not meant to be shared between threads mid-cycle; use one per request.
#[derive(Debug)]
pub struct EnsembleCombiner {
    ensemble: VolatilityEnsemble,
    state: Option<EnsembleFit>,
}

impl EnsembleCombiner {
    pub fn new(config: EnsembleConfig) -> VolResult<Self> {
        Ok(Self { ensemble: VolatilityEnsemble::new(config)?, state: None })
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Fit (or re-fit, replacing the previous weights).
    pub fn fit(&mut self, prices: &PriceSeries, ranges: Option<&RangeSeries>) -> VolResult<()> {
        self.state = Some(self.ensemble.fit(prices, ranges)?);
        Ok(())
    }

    pub fn predict(&self) -> VolResult<ForecastSeries> {
        self.ensemble.predict(self.fitted()?)
    }

    pub fn weights(&self) -> VolResult<ModelWeights> {
        Ok(self.fitted()?.weights.clone())
    }

    fn fitted(&self) -> VolResult<&EnsembleFit> {
        self.state
            .as_ref()
            .ok_or_else(|| VolError::InvalidState("ensemble must be fitted before use".into()))
    }
}
