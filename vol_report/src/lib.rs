pub mod data;
pub mod reporting;

pub use data::{load_csv, MarketData};
pub use reporting::{output_path, ForecastDocument, ReportMetadata};
