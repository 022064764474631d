pub mod backtester;
pub mod normal;
pub mod options;
pub mod retry;
pub mod series_cache;
pub mod signals;
pub mod sweep;
pub mod volatility;

pub use backtester::{run_backtest, BacktestEngine, BacktestError};
pub use options::{bsm_greeks, bsm_price, d1_d2, implied_volatility, price_bounds, OptionsError};
pub use retry::{RetryError, RetryPolicy};
pub use series_cache::{CacheError, CacheReport, PointProvider, SeriesCache};
pub use signals::{contrarian_signal, ContrarianSignalGenerator};
pub use sweep::{enter_threshold_grid, run_sweep, SweepOutcome};
pub use volatility::{
    realized_volatility, rolling_volatility, rolling_volatility_naive, z_score, RollingVolatility,
};
