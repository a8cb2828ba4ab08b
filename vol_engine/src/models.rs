pub mod ewma;
pub mod garch;
pub mod historical;
pub mod parkinson;

use serde::{Deserialize, Serialize};

use crate::error::{VolError, VolResult};

/// The closed set of estimators the ensemble knows about.
///
/// Ordering is the order weights are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Historical,
    Garch,
    Ewma,
    Parkinson,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Historical,
        ModelKind::Garch,
        ModelKind::Ewma,
        ModelKind::Parkinson,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Historical => "historical",
            ModelKind::Garch => "garch",
            ModelKind::Ewma => "ewma",
            ModelKind::Parkinson => "parkinson",
        }
    }

    /// Whether the model produces a forward path (vs. only a current level).
    pub fn is_forecasting(self) -> bool {
        match self {
            ModelKind::Garch | ModelKind::Ewma => true,
            ModelKind::Historical | ModelKind::Parkinson => false,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rolling estimators need `2 ≤ window ≤ len`.
pub(crate) fn check_window(window: usize, len: usize) -> VolResult<()> {
    if window < 2 || window > len {
        return Err(VolError::invalid_input(format!(
            "window must be between 2 and the series length ({len}), got {window}"
        )));
    }
    Ok(())
}

pub(crate) fn check_horizon(horizon: usize) -> VolResult<()> {
    if horizon == 0 {
        return Err(VolError::invalid_input("forecast horizon must be at least 1"));
    }
    Ok(())
}
