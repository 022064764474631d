use crate::services::{BacktestError, CacheError, OptionsError};
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_service_errors() {
        let err: AppError =
            BacktestError::InvalidConfig("Starting cash must be positive".into()).into();
        assert!(matches!(err, AppError::Backtest(_)));
        assert_eq!(err.to_string(), "Invalid configuration: Starting cash must be positive");

        let err: AppError = OptionsError::InvalidInput("spot must be positive".into()).into();
        assert!(matches!(err, AppError::Options(_)));
    }

    #[test]
    fn test_wraps_json_errors() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::SerdeJson(_)));
    }
}
