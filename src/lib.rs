//! Vantage - perp volatility signals, option pricing, and backtesting

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use services::{
    bsm_greeks, bsm_price, implied_volatility, realized_volatility, rolling_volatility,
    run_backtest, BacktestEngine, BacktestError, OptionsError,
};
pub use types::*;
