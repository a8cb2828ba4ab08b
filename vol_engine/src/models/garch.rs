/// models/garch.rs — GARCH(1,1) Volatility Forecasting
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
/// ```text
///
/// GARCH(1,1): Bollerslev (1986), constant mean, Gaussian innovations
///
///   Scaled return:      y_t = 100 · ln(P_t / P_{t−1})
///   Innovation:         ε_t = y_t − μ
///   Conditional variance:
///
///       σ²_t = ω  +  α · ε²_{t−1}  +  β · σ²_{t−1}
///
///   Constraints (covariance stationarity):
///     ω > 0,  α ≥ 0,  β ≥ 0,  α + β < 1
///
///   Initial variance σ²_0 (backcast):
///       Σ_{i<τ} 0.94^i · ε²_i / Σ_{i<τ} 0.94^i,     τ = min(75, T)
///
///   Negative log-likelihood (minimised):
///       L = ½ Σ [ ln(2π) + ln σ²_t + ε²_t / σ²_t ]
///
///   Unconstrained reparametrisation for the simplex search:
///       θ = (μ, ln ω, logit((α+β)/0.9999), logit(α/(α+β)))
///
///   Long-run variance:       σ²_∞ = ω / (1 − α − β)
///   Multi-step forecast:     σ²_{T+h} = σ²_∞ + (α+β)^(h−1) · (σ²_{T+1} − σ²_∞)
///
///   Annualised volatility (returns already in percent):
///       σ_annual = √(σ²_{T+h}) · √252
/// ```
/// ─────────────────────────────────────────────────────────────────────────
use std::f64::consts::PI;

use tracing::{debug, warn};

use crate::error::{VolError, VolResult};
use crate::models::check_horizon;
use crate::optimise::nelder_mead;
use crate::series::{ForecastSeries, PriceSeries, TRADING_DAYS_PER_YEAR};
use crate::stats::{mean, variance};

/// Log returns are multiplied by this before fitting.
pub const RETURN_SCALE: f64 = 100.0;
/// Below this many returns the likelihood surface is meaningless.
pub const MIN_OBSERVATIONS: usize = 5;
pub const DEFAULT_MAX_ITER: usize = 5_000;
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

const BACKCAST_DECAY: f64 = 0.94;
const BACKCAST_SPAN: usize = 75;
const VARIANCE_FLOOR: f64 = 1e-12;
/// Upper bound on α+β so the reparametrisation never reaches a unit root.
const MAX_PERSISTENCE: f64 = 0.9999;

// Optimiser start point: α₀ = 0.10, β₀ = 0.85
const ALPHA_START: f64 = 0.10;
const BETA_START: f64 = 0.85;

#[derive(Debug, Clone)]
pub struct Garch11 {
    /// μ: constant conditional mean of scaled returns
    pub mu: f64,
    /// ω: long-run variance weight
    pub omega: f64,
    /// α: ARCH (shock) coefficient
    pub alpha: f64,
    /// β: GARCH (persistence) coefficient
    pub beta: f64,
    /// Conditional variance for the next, not yet observed, return
    pub sigma2: f64,
    /// Annualisation factor (periods per year)
    pub periods_per_year: f64,
}

impl Garch11 {
    /// Construct GARCH(1,1) with given parameters.
    /// Initial σ² is set to the long-run variance σ²_∞ = ω/(1-α-β).
    pub fn new(mu: f64, omega: f64, alpha: f64, beta: f64, periods_per_year: f64) -> VolResult<Self> {
        if !(omega > 0.0 && alpha >= 0.0 && beta >= 0.0 && alpha + beta < 1.0) {
            return Err(VolError::invalid_input(format!(
                "GARCH requires ω>0, α,β≥0, α+β<1; got ω={omega}, α={alpha}, β={beta}"
            )));
        }
        let longrun_var = omega / (1.0 - alpha - beta);
        Ok(Self { mu, omega, alpha, beta, sigma2: longrun_var, periods_per_year })
    }

    /// Feed a new scaled return and roll σ² forward one step.
    ///
    /// Formula:  σ²_{t+1} = ω + α·ε²_t + β·σ²_t,   ε_t = y_t − μ
    pub fn update(&mut self, y: f64) {
        let eps = y - self.mu;
        self.sigma2 = (self.omega + self.alpha * eps * eps + self.beta * self.sigma2).max(VARIANCE_FLOOR);
    }

    pub fn persistence(&self) -> f64 {
        self.alpha + self.beta
    }

    pub fn longrun_variance(&self) -> f64 {
        self.omega / (1.0 - self.persistence())
    }

    /// Current one-step σ (annualised).
    ///
    /// σ_annual = √(σ²_{T+1} · periods_per_year)
    pub fn sigma_annual(&self) -> f64 {
        (self.sigma2 * self.periods_per_year).sqrt()
    }

    /// h-step ahead variance forecast, h ≥ 1.
    ///
    /// σ²_{T+h} = σ²_∞ + (α+β)^(h−1) · (σ²_{T+1} − σ²_∞)
    pub fn forecast_variance(&self, h: usize) -> f64 {
        let longrun = self.longrun_variance();
        longrun + self.persistence().powi(h as i32 - 1) * (self.sigma2 - longrun)
    }

    /// Annualised volatility path for steps 1..=horizon.
    pub fn forecast_volatility(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon)
            .map(|h| (self.forecast_variance(h) * self.periods_per_year).sqrt().abs())
            .collect()
    }
}

/// Run GARCH(1,1) over a scaled return series, return all σ²_t values.
///
/// Each entry is the variance conditional on information *before* that
/// return; after the call `garch.sigma2` holds σ²_{T+1}.
pub fn garch_filter(garch: &mut Garch11, returns: &[f64]) -> Vec<f64> {
    let mut variances = Vec::with_capacity(returns.len());
    for &y in returns {
        variances.push(garch.sigma2);
        garch.update(y);
    }
    variances
}

/// Result of a maximum-likelihood fit.
#[derive(Debug, Clone)]
pub struct GarchFit {
    /// Model rolled forward to the end of the sample
    pub model: Garch11,
    pub log_likelihood: f64,
    pub iterations: usize,
    pub n_obs: usize,
}

/// Fits GARCH(1,1) by MLE and forecasts annualised volatility.
#[derive(Debug, Clone)]
pub struct GarchForecaster {
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for GarchForecaster {
    fn default() -> Self {
        Self { max_iter: DEFAULT_MAX_ITER, tolerance: DEFAULT_TOLERANCE }
    }
}

impl GarchForecaster {
    pub fn new(max_iter: usize, tolerance: f64) -> Self {
        Self { max_iter, tolerance }
    }

    /// Maximum-likelihood fit on the scaled log returns of `prices`.
    pub fn fit(&self, prices: &PriceSeries) -> VolResult<GarchFit> {
        let returns: Vec<f64> = prices.log_returns().iter().map(|r| r * RETURN_SCALE).collect();
        if returns.len() < MIN_OBSERVATIONS {
            return Err(VolError::invalid_input(format!(
                "GARCH needs at least {MIN_OBSERVATIONS} returns, got {}",
                returns.len()
            )));
        }
        fit_returns(&returns, self.max_iter, self.tolerance)
    }

    /// h-step annualised volatility forecast dated on the following business days.
    pub fn forecast(&self, prices: &PriceSeries, horizon: usize) -> VolResult<ForecastSeries> {
        check_horizon(horizon)?;
        let fit = self.fit(prices)?;
        let values = fit.model.forecast_volatility(horizon);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(VolError::numerical("GARCH forecast produced non-finite volatility"));
        }
        Ok(ForecastSeries::from_values(prices.last_date(), values))
    }
}

fn fit_returns(returns: &[f64], max_iter: usize, tolerance: f64) -> VolResult<GarchFit> {
    let n = returns.len();
    let mu0 = mean(returns).unwrap_or(0.0);
    let var0 = variance(returns).unwrap_or(0.0);
    if !var0.is_finite() || var0 < VARIANCE_FLOOR {
        return Err(VolError::numerical("degenerate return series: zero variance"));
    }

    let s0 = ALPHA_START + BETA_START;
    let theta0 = [
        mu0,
        (var0 * (1.0 - s0)).ln(),
        logit(s0 / MAX_PERSISTENCE),
        logit(ALPHA_START / s0),
    ];

    let objective = |theta: &[f64]| -> f64 {
        let (mu, omega, alpha, beta) = unpack(theta);
        negative_log_likelihood(returns, mu, omega, alpha, beta)
    };

    let min = nelder_mead(objective, &theta0, max_iter, tolerance);
    if !min.converged {
        warn!(iterations = min.iterations, "GARCH optimiser did not converge");
        return Err(VolError::numerical(format!(
            "GARCH likelihood did not converge within {max_iter} iterations"
        )));
    }
    if !min.value.is_finite() {
        return Err(VolError::numerical("GARCH likelihood is non-finite at the optimum"));
    }

    let (mu, omega, alpha, beta) = unpack(&min.x);
    let mut model = Garch11::new(mu, omega, alpha, beta, TRADING_DAYS_PER_YEAR)
        .map_err(|e| VolError::numerical(format!("optimiser left the feasible region: {e}")))?;
    model.sigma2 = backcast(returns, mu);
    garch_filter(&mut model, returns);

    if !model.sigma2.is_finite() {
        return Err(VolError::numerical("GARCH conditional variance is non-finite"));
    }

    debug!(
        "GARCH fit: μ={:.4} ω={:.4e} α={:.4} β={:.4} σ_annual={:.2}% iters={}",
        model.mu, model.omega, model.alpha, model.beta, model.sigma_annual(), min.iterations
    );

    Ok(GarchFit { model, log_likelihood: -min.value, iterations: min.iterations, n_obs: n })
}

fn negative_log_likelihood(returns: &[f64], mu: f64, omega: f64, alpha: f64, beta: f64) -> f64 {
    let Ok(mut g) = Garch11::new(mu, omega, alpha, beta, TRADING_DAYS_PER_YEAR) else {
        return f64::INFINITY;
    };
    g.sigma2 = backcast(returns, mu);
    let variances = garch_filter(&mut g, returns);

    let ln_2pi = (2.0 * PI).ln();
    0.5 * returns
        .iter()
        .zip(&variances)
        .map(|(y, s2)| {
            let eps = y - mu;
            ln_2pi + s2.ln() + eps * eps / s2
        })
        .sum::<f64>()
}

/// Exponentially weighted mean of the first τ squared innovations.
fn backcast(returns: &[f64], mu: f64) -> f64 {
    let tau = returns.len().min(BACKCAST_SPAN);
    let mut weight = 1.0;
    let mut num = 0.0;
    let mut den = 0.0;
    for y in &returns[..tau] {
        let eps = y - mu;
        num += weight * eps * eps;
        den += weight;
        weight *= BACKCAST_DECAY;
    }
    (num / den).max(VARIANCE_FLOOR)
}

fn unpack(theta: &[f64]) -> (f64, f64, f64, f64) {
    let mu = theta[0];
    let omega = theta[1].exp();
    let persistence = MAX_PERSISTENCE * logistic(theta[2]);
    let share = logistic(theta[3]);
    (mu, omega, persistence * share, persistence * (1.0 - share))
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{prices_from, synthetic_prices};

    #[test]
    fn garch_stationarity() {
        let g = Garch11::new(0.0, 1e-6, 0.10, 0.85, 252.0).unwrap();
        let longrun = 1e-6 / (1.0 - 0.10 - 0.85);
        assert!((g.sigma2 - longrun).abs() < 1e-12);
        assert!(Garch11::new(0.0, 1e-6, 0.5, 0.5, 252.0).is_err());
    }

    #[test]
    fn garch_update_monotonic() {
        let mut g = Garch11::new(0.0, 0.05, 0.10, 0.85, 252.0).unwrap();
        g.update(5.0); // 5% shock
        let after_shock = g.sigma2;
        g.update(0.0);
        let after_calm = g.sigma2;
        // After shock, variance must be elevated; after calm tick it decays
        assert!(after_shock > after_calm);
    }

    #[test]
    fn forecast_reverts_to_longrun() {
        let mut g = Garch11::new(0.0, 0.1, 0.1, 0.8, 252.0).unwrap();
        g.sigma2 = 4.0;
        let longrun = g.longrun_variance();
        assert!((g.forecast_variance(1) - 4.0).abs() < 1e-12);
        let far = g.forecast_variance(200);
        assert!((far - longrun).abs() < 1e-6, "far = {far}, longrun = {longrun}");
        let path = g.forecast_volatility(5);
        assert!(path.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn backcast_weights_early_residuals() {
        let bc = backcast(&[2.0, 0.0], 0.0);
        // (1·4 + 0.94·0) / (1 + 0.94)
        assert!((bc - 4.0 / 1.94).abs() < 1e-12);
    }

    #[test]
    fn reparametrisation_is_feasible() {
        for theta in [[0.0, -50.0, 40.0, -40.0], [1.0, 5.0, -40.0, 40.0], [0.0, 0.0, 0.0, 0.0]] {
            let (_, omega, alpha, beta) = unpack(&theta);
            assert!(omega > 0.0 && alpha >= 0.0 && beta >= 0.0 && alpha + beta < 1.0);
        }
    }

    #[test]
    fn fit_and_forecast_synthetic() {
        let prices = synthetic_prices(250);
        let fc = GarchForecaster::default().forecast(&prices, 5).unwrap();
        assert_eq!(fc.len(), 5);
        assert!(fc.values().iter().all(|v| v.is_finite() && *v > 0.0));
        assert!(fc.dates().iter().all(|d| *d > prices.last_date()));
    }

    #[test]
    fn fit_improves_on_start_point() {
        let prices = synthetic_prices(200);
        let returns: Vec<f64> = prices.log_returns().iter().map(|r| r * RETURN_SCALE).collect();
        let fit = GarchForecaster::default().fit(&prices).unwrap();
        let var0 = variance(&returns).unwrap();
        let start = negative_log_likelihood(
            &returns,
            mean(&returns).unwrap(),
            var0 * 0.05,
            ALPHA_START,
            BETA_START,
        );
        assert!(-fit.log_likelihood <= start + 1e-9);
        assert!(fit.model.persistence() < 1.0);
        assert_eq!(fit.n_obs, 199);
    }

    #[test]
    fn fit_is_deterministic() {
        let prices = synthetic_prices(120);
        let a = GarchForecaster::default().forecast(&prices, 4).unwrap();
        let b = GarchForecaster::default().forecast(&prices, 4).unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn too_few_returns_is_invalid_input() {
        let prices = prices_from(&[100.0, 101.0, 100.5, 102.0]);
        let e = GarchForecaster::default().fit(&prices).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn flat_prices_is_numerical_failure() {
        let prices = prices_from(&[100.0; 12]);
        let e = GarchForecaster::default().forecast(&prices, 3).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NumericalFailure);
    }

    #[test]
    fn starved_iteration_budget_is_numerical_failure() {
        let prices = synthetic_prices(80);
        let e = GarchForecaster::new(2, 1e-12).fit(&prices).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NumericalFailure);
    }
}
