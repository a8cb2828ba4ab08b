pub mod config;
pub mod ensemble;
pub mod error;
pub mod intervals;
pub mod models;
pub mod optimise;
pub mod report;
pub mod series;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::EngineConfig;
pub use ensemble::{
    EnsembleCombiner, EnsembleConfig, EnsembleFit, EnsemblePrediction, ModelWeights, VolatilityEnsemble,
};
pub use error::{ErrorKind, VolError, VolResult};
pub use intervals::{confidence_intervals, z_score, IntervalBounds};
pub use models::ModelKind;
pub use report::ForecastReport;
pub use series::{
    ForecastSeries, PricePoint, PriceSeries, RangePoint, RangeSeries, VolPoint, VolatilitySeries,
};
