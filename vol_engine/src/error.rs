/// error.rs — Engine error taxonomy
///
/// Every fallible engine operation returns `Result<T, VolError>`.  The three
/// variants are kept distinct so the serving layer can map them to its own
/// status codes without string matching.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolError {
    /// Bad data or parameters, detected before any model fitting runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An ensemble operation was called before `fit`.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The GARCH optimiser did not converge or produced non-finite output.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InvalidState,
    NumericalFailure,
}

impl VolError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        VolError::InvalidInput(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        VolError::NumericalFailure(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VolError::InvalidInput(_) => ErrorKind::InvalidInput,
            VolError::InvalidState(_) => ErrorKind::InvalidState,
            VolError::NumericalFailure(_) => ErrorKind::NumericalFailure,
        }
    }
}

pub type VolResult<T> = std::result::Result<T, VolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        assert_eq!(VolError::invalid_input("x").kind(), ErrorKind::InvalidInput);
        assert_eq!(VolError::InvalidState("x".into()).kind(), ErrorKind::InvalidState);
        assert_eq!(VolError::numerical("x").kind(), ErrorKind::NumericalFailure);
    }

    #[test]
    fn display_carries_message() {
        let e = VolError::invalid_input("window 1 < 2");
        assert_eq!(e.to_string(), "invalid input: window 1 < 2");
    }
}
