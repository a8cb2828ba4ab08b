/// config.rs — Centralised configuration loaded from .env
///
/// All parameters consumed by the volatility engine are defined here.
/// Loading happens once at startup; callers borrow &EngineConfig and may
/// override single fields (e.g. from CLI flags) before `validate()`.
use anyhow::Result;
use std::env;

use crate::ensemble::EnsembleConfig;
use crate::error::{VolError, VolResult};
use crate::models::garch::{GarchForecaster, DEFAULT_MAX_ITER, DEFAULT_TOLERANCE};

pub const DEFAULT_HISTORICAL_WINDOW: usize = 30;
pub const DEFAULT_FORECAST_HORIZON: usize = 5;
pub const DEFAULT_EWMA_LAMBDA: f64 = 0.94;
pub const DEFAULT_DECAY: f64 = 0.94;
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // ── Estimation ───────────────────────────────────────────────────
    /// Rolling window (days) for historical and Parkinson volatility
    pub historical_window: usize,
    /// EWMA decay λ for the variance recursion
    pub ewma_lambda: f64,

    // ── Forecast ─────────────────────────────────────────────────────
    /// Business days to forecast
    pub forecast_horizon: usize,
    /// Per-step decay for the current-level forecast
    pub decay: f64,
    /// Two-sided confidence level for the interval band
    pub confidence: f64,

    // ── GARCH optimiser ──────────────────────────────────────────────
    pub garch_max_iter: usize,
    pub garch_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            historical_window: DEFAULT_HISTORICAL_WINDOW,
            ewma_lambda: DEFAULT_EWMA_LAMBDA,
            forecast_horizon: DEFAULT_FORECAST_HORIZON,
            decay: DEFAULT_DECAY,
            confidence: DEFAULT_CONFIDENCE,
            garch_max_iter: DEFAULT_MAX_ITER,
            garch_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables (after dotenv).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // ignore missing .env

        Ok(Self {
            historical_window: parse_env("VOL_HISTORICAL_WINDOW", DEFAULT_HISTORICAL_WINDOW)?,
            ewma_lambda:       parse_env("VOL_EWMA_LAMBDA",       DEFAULT_EWMA_LAMBDA)?,

            forecast_horizon: parse_env("VOL_FORECAST_HORIZON", DEFAULT_FORECAST_HORIZON)?,
            decay:            parse_env("VOL_DECAY",            DEFAULT_DECAY)?,
            confidence:       parse_env("VOL_CONFIDENCE",       DEFAULT_CONFIDENCE)?,

            garch_max_iter:  parse_env("VOL_GARCH_MAX_ITER",  DEFAULT_MAX_ITER)?,
            garch_tolerance: parse_env("VOL_GARCH_TOLERANCE", DEFAULT_TOLERANCE)?,
        })
    }

    pub fn validate(&self) -> VolResult<()> {
        if self.historical_window < 2 {
            return Err(VolError::invalid_input(format!(
                "historical_window must be at least 2, got {}",
                self.historical_window
            )));
        }
        if self.forecast_horizon == 0 {
            return Err(VolError::invalid_input("forecast_horizon must be at least 1"));
        }
        if !(self.ewma_lambda > 0.0 && self.ewma_lambda < 1.0) {
            return Err(VolError::invalid_input(format!(
                "ewma_lambda must lie in (0, 1), got {}",
                self.ewma_lambda
            )));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(VolError::invalid_input(format!("decay must lie in (0, 1], got {}", self.decay)));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(VolError::invalid_input(format!(
                "confidence must lie in (0, 1), got {}",
                self.confidence
            )));
        }
        if self.garch_max_iter == 0 || !(self.garch_tolerance > 0.0) {
            return Err(VolError::invalid_input("GARCH optimiser needs max_iter > 0 and tolerance > 0"));
        }
        Ok(())
    }

    pub fn ensemble(&self) -> EnsembleConfig {
        EnsembleConfig {
            historical_window: self.historical_window,
            forecast_horizon: self.forecast_horizon,
            ewma_lambda: self.ewma_lambda,
            garch: GarchForecaster::new(self.garch_max_iter, self.garch_tolerance),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Config key {key}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        let ens = cfg.ensemble();
        assert_eq!(ens.historical_window, 30);
        assert_eq!(ens.forecast_horizon, 5);
    }

    #[test]
    fn parse_env_reads_and_rejects() {
        env::set_var("VOL_TEST_PARSE_OK", "42");
        env::set_var("VOL_TEST_PARSE_BAD", "forty-two");
        assert_eq!(parse_env("VOL_TEST_PARSE_OK", 7usize).unwrap(), 42);
        assert!(parse_env("VOL_TEST_PARSE_BAD", 7usize).is_err());
        assert_eq!(parse_env("VOL_TEST_PARSE_MISSING", 0.5f64).unwrap(), 0.5);
    }

    #[test]
    fn validate_catches_out_of_range() {
        let cases = [
            EngineConfig { historical_window: 1, ..Default::default() },
            EngineConfig { forecast_horizon: 0, ..Default::default() },
            EngineConfig { ewma_lambda: 1.0, ..Default::default() },
            EngineConfig { decay: 0.0, ..Default::default() },
            EngineConfig { confidence: 1.0, ..Default::default() },
            EngineConfig { garch_tolerance: 0.0, ..Default::default() },
        ];
        for cfg in cases {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }
}
