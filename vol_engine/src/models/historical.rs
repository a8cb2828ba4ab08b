/// models/historical.rs — Rolling close-to-close volatility
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
///   r_t  = ln(P_t / P_{t−1})
///   s_t  = sample std of the returns inside the price window [t−w+1, t]
///   HV_t = |s_t| · √252 · 100
///
/// Output starts at price index w−1.  That first window only holds w−1
/// returns (there is no return for the first price); a window holding a
/// single return has zero dispersion.
/// ─────────────────────────────────────────────────────────────────────────
use crate::error::VolResult;
use crate::models::check_window;
use crate::series::{annualise, PriceSeries, VolatilitySeries};
use crate::stats::std_dev;

/// Rolling annualised volatility, `len(prices) − window + 1` points.
pub fn historical_volatility(prices: &PriceSeries, window: usize) -> VolResult<VolatilitySeries> {
    check_window(window, prices.len())?;

    let returns = prices.log_returns();
    let dates = prices.dates();

    let values: Vec<f64> = (window - 1..prices.len())
        .map(|t| {
            // returns[i] belongs to price i+1, so price window [t−w+1, t]
            // maps onto returns[max(0, t−w) .. t]
            let lo = t.saturating_sub(window);
            let sigma = std_dev(&returns[lo..t]).unwrap_or(0.0);
            annualise(sigma).abs()
        })
        .collect();

    Ok(VolatilitySeries::from_parts(&dates[window - 1..], values))
}
