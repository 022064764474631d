//! Backtest Types
//!
//! Configuration, trade records, equity curve, and summary statistics for the
//! single-instrument perp backtester.

use super::signals::{PerpSide, SignalParams};
use serde::{Deserialize, Serialize};

// =============================================================================
// Configuration
// =============================================================================

/// How the signal side is turned into a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Fade the move (take the signal side)
    #[default]
    Contrarian,
    /// Follow the move (invert the signal side)
    Momentum,
}

impl StrategyMode {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "contrarian" | "fade" => Some(Self::Contrarian),
            "momentum" | "trend" => Some(Self::Momentum),
            _ => None,
        }
    }

    /// Side actually traded for a given signal side.
    pub fn apply(&self, signal_side: PerpSide) -> PerpSide {
        match self {
            StrategyMode::Contrarian => signal_side,
            StrategyMode::Momentum => signal_side.opposite(),
        }
    }
}

impl std::fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyMode::Contrarian => write!(f, "contrarian"),
            StrategyMode::Momentum => write!(f, "momentum"),
        }
    }
}

/// Configuration for a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BacktestConfig {
    /// Candle spacing (ms)
    pub step_size_ms: i64,
    /// Initial cash balance
    pub starting_cash: f64,
    /// Notional committed per position
    pub trade_notional: f64,
    /// Slippage per fill in basis points
    pub slippage_bps: f64,
    /// Accrue funding on open positions
    pub use_funding: bool,
    /// Rolling volatility window, in returns
    pub vol_window_returns: usize,
    /// Horizon of the z-score move, in steps
    pub z_lookback_steps: usize,
    /// Minimum |z| to open a position
    pub enter_abs_z: f64,
    /// |z| at or below which an open position reverts out
    pub exit_abs_z: f64,
    /// Steps after which an open position is closed regardless of z
    pub max_hold_steps: usize,
    /// Skip entries whose crowding multiplier is below this
    pub min_crowding: Option<f64>,
    pub mode: StrategyMode,
    pub signal: SignalParams,
    /// 24h notional volume fed to the signal as liquidity context
    pub notional_volume_24h: Option<f64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            step_size_ms: 3_600_000, // 1 hour candles
            starting_cash: 10_000.0,
            trade_notional: 1_000.0,
            slippage_bps: 5.0,
            use_funding: true,
            vol_window_returns: 24,
            z_lookback_steps: 1,
            enter_abs_z: 2.0,
            exit_abs_z: 0.5,
            max_hold_steps: 24,
            min_crowding: None,
            mode: StrategyMode::Contrarian,
            signal: SignalParams::default(),
            notional_volume_24h: None,
        }
    }
}

impl BacktestConfig {
    /// Candle spacing in seconds.
    pub fn step_seconds(&self) -> f64 {
        self.step_size_ms as f64 / 1000.0
    }

    /// Candle spacing in hours (funding accrual unit).
    pub fn step_hours(&self) -> f64 {
        self.step_size_ms as f64 / 3_600_000.0
    }
}

// =============================================================================
// Records
// =============================================================================

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// |z| reverted to the exit threshold
    Signal,
    /// Held for max_hold_steps
    Timeout,
    /// Forced close on the final candle
    EndOfSeries,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::Timeout => write!(f, "timeout"),
            ExitReason::EndOfSeries => write!(f, "end_of_series"),
        }
    }
}

/// A closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub side: PerpSide,
    /// Entry timestamp (ms)
    pub entry_time: i64,
    /// Exit timestamp (ms)
    pub exit_time: i64,
    /// Entry fill price after slippage
    pub entry_price: f64,
    /// Exit fill price after slippage
    pub exit_price: f64,
    pub quantity: f64,
    pub notional: f64,
    pub price_pnl: f64,
    pub funding_pnl: f64,
    pub total_pnl: f64,
    /// Candles between entry and exit
    pub holding_steps: usize,
    pub entry_z: f64,
    /// z on the exit candle (None if it was undefined)
    pub exit_z: Option<f64>,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.total_pnl > 0.0
    }

    /// Total P&L as a percentage of committed notional.
    pub fn return_pct(&self) -> f64 {
        if self.notional > 0.0 {
            self.total_pnl / self.notional * 100.0
        } else {
            0.0
        }
    }

    /// Duration of trade in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}

/// One point on the equity curve, emitted for every candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    /// Timestamp (ms)
    pub time: i64,
    pub price: f64,
    pub cash: f64,
    /// cash + position value
    pub equity: f64,
    /// Annualized rolling volatility
    pub sigma: Option<f64>,
    pub z: Option<f64>,
    /// Two-sided normal tail probability of z
    pub tail_probability: Option<f64>,
    pub funding_rate: Option<f64>,
    pub premium: Option<f64>,
    pub position_side: Option<PerpSide>,
    /// Notional + unrealized price P&L + accrued funding
    pub position_value: Option<f64>,
}

/// Performance summary for a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSummary {
    pub starting_cash: f64,
    pub ending_equity: f64,
    /// (ending - starting) / starting
    pub total_return: f64,
    pub trade_count: usize,
    /// None without trades
    pub win_rate: Option<f64>,
    /// None without trades
    pub avg_pnl: Option<f64>,
    /// Gross profit / gross loss; None without losing trades
    pub profit_factor: Option<f64>,
    pub max_drawdown: f64,
    /// Drawdown relative to the running peak, as a fraction
    pub max_drawdown_pct: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub total_funding_pnl: f64,
    pub avg_holding_steps: Option<f64>,
    pub signal_exits: usize,
    pub timeout_exits: usize,
    pub end_of_series_exits: usize,
}

impl BacktestSummary {
    /// Summary of a run that never traded.
    pub fn flat(starting_cash: f64) -> Self {
        Self {
            starting_cash,
            ending_equity: starting_cash,
            total_return: 0.0,
            trade_count: 0,
            win_rate: None,
            avg_pnl: None,
            profit_factor: None,
            max_drawdown: 0.0,
            max_drawdown_pct: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            total_funding_pnl: 0.0,
            avg_holding_steps: None,
            signal_exits: 0,
            timeout_exits: 0,
            end_of_series_exits: 0,
        }
    }
}

/// Complete backtest output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
}

impl BacktestResult {
    /// Zero-trade result for inputs too short to simulate.
    pub fn empty(starting_cash: f64) -> Self {
        Self {
            summary: BacktestSummary::flat(starting_cash),
            trades: Vec::new(),
            equity: Vec::new(),
        }
    }
}
