use crate::types::{BacktestConfig, StrategyMode};
use std::env;
use std::path::PathBuf;

/// 2024-01-01T00:00:00Z
const DEFAULT_SYNTHETIC_START_MS: i64 = 1_704_067_200_000;

/// Runtime configuration for the backtest runner.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file with `candles` and optional `funding` arrays.
    pub data_path: Option<PathBuf>,
    /// Symbol label used in logs.
    pub symbol: String,
    /// Candles to generate when no data file is given.
    pub synthetic_bars: usize,
    /// Seed for the synthetic series.
    pub seed: u64,
    /// Open time of the first synthetic candle (ms since epoch).
    pub synthetic_start_ms: i64,
    /// Worker count for the entry-threshold sweep (disabled when unset).
    pub sweep_workers: Option<usize>,
    /// Backtest parameters.
    pub backtest: BacktestConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_f64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
        let parse_usize = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());

        let defaults = BacktestConfig::default();
        let backtest = BacktestConfig {
            enter_abs_z: parse_f64("VANTAGE_ENTER_Z").unwrap_or(defaults.enter_abs_z),
            exit_abs_z: parse_f64("VANTAGE_EXIT_Z").unwrap_or(defaults.exit_abs_z),
            vol_window_returns: parse_usize("VANTAGE_VOL_WINDOW")
                .unwrap_or(defaults.vol_window_returns),
            max_hold_steps: parse_usize("VANTAGE_MAX_HOLD").unwrap_or(defaults.max_hold_steps),
            slippage_bps: parse_f64("VANTAGE_SLIPPAGE_BPS").unwrap_or(defaults.slippage_bps),
            min_crowding: parse_f64("VANTAGE_MIN_CROWDING").or(defaults.min_crowding),
            mode: lookup("VANTAGE_MODE")
                .and_then(|v| StrategyMode::from_str(v.trim()))
                .unwrap_or(defaults.mode),
            ..defaults
        };

        Self {
            data_path: lookup("VANTAGE_DATA_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            symbol: lookup("VANTAGE_SYMBOL").unwrap_or_else(|| "BTC".to_string()),
            synthetic_bars: parse_usize("VANTAGE_SYNTHETIC_BARS").unwrap_or(720),
            seed: lookup("VANTAGE_SEED")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(42),
            synthetic_start_ms: lookup("VANTAGE_SYNTHETIC_START_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_SYNTHETIC_START_MS),
            sweep_workers: parse_usize("VANTAGE_SWEEP_WORKERS").filter(|&n| n > 0),
            backtest,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
