//! Backtesting Engine
//!
//! Replays a perp price series through the contrarian signal.
//! Features:
//! - Rolling volatility and z-score per candle
//! - Single position state machine (Flat / Open)
//! - Funding accrual from a forward-filled funding series
//! - Adverse slippage on every fill
//! - Equity curve and summary statistics
//!
//! A run is a pure function of its inputs: the same candles, funding, and
//! config always produce identical trades and equity.

use crate::services::normal::two_sided_tail;
use crate::services::signals::ContrarianSignalGenerator;
use crate::services::volatility::{z_score, RollingVolatility, DEFAULT_YEAR_SECONDS};
use crate::types::{
    BacktestConfig, BacktestResult, BacktestSummary, CandlePoint, EquityPoint, ExitReason,
    FundingPoint, PerpSide, SignalContext, Trade,
};
use rand::prelude::*;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fewer candles than this yields an empty, zero-trade result.
pub const MIN_CANDLES: usize = 3;

/// Backtesting errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BacktestError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backtest task failed: {0}")]
    TaskFailed(String),
}

/// An open position during the simulation.
#[derive(Debug, Clone, PartialEq)]
struct OpenPosition {
    side: PerpSide,
    notional: f64,
    quantity: f64,
    entry_price: f64,
    entry_time: i64,
    entry_index: usize,
    entry_z: f64,
    funding_pnl: f64,
}

impl OpenPosition {
    fn direction(&self) -> f64 {
        self.side.direction()
    }

    fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.quantity * self.direction()
    }

    /// Notional plus unrealized price P&L plus accrued funding.
    fn value(&self, current_price: f64) -> f64 {
        self.notional + self.unrealized_pnl(current_price) + self.funding_pnl
    }

    /// Shorts receive positive funding, longs pay it.
    fn accrue_funding(&mut self, current_price: f64, funding_rate: f64, step_hours: f64) {
        let sign = -self.direction();
        self.funding_pnl += sign * (self.quantity * current_price) * funding_rate * step_hours;
    }

    fn close(
        self,
        exit_price: f64,
        exit_time: i64,
        exit_index: usize,
        exit_z: Option<f64>,
        reason: ExitReason,
    ) -> Trade {
        let price_pnl = (exit_price - self.entry_price) * self.quantity * self.direction();
        Trade {
            side: self.side,
            entry_time: self.entry_time,
            exit_time,
            entry_price: self.entry_price,
            exit_price,
            quantity: self.quantity,
            notional: self.notional,
            price_pnl,
            funding_pnl: self.funding_pnl,
            total_pnl: price_pnl + self.funding_pnl,
            holding_steps: exit_index - self.entry_index,
            entry_z: self.entry_z,
            exit_z,
            exit_reason: reason,
        }
    }
}

/// Position state machine. Exactly one position can be open at a time.
#[derive(Debug, Clone, Default, PartialEq)]
enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    fn side(&self) -> Option<PerpSide> {
        match self {
            PositionState::Flat => None,
            PositionState::Open(position) => Some(position.side),
        }
    }

    fn value(&self, current_price: f64) -> Option<f64> {
        match self {
            PositionState::Flat => None,
            PositionState::Open(position) => Some(position.value(current_price)),
        }
    }
}

/// Fill price after slippage against a trade in `direction` (+1 buy, -1 sell).
fn apply_slippage(price: f64, direction: f64, slippage_bps: f64) -> f64 {
    price * (1.0 + direction * slippage_bps / 10_000.0)
}

impl BacktestConfig {
    /// Check the configuration before a run.
    pub fn validate(&self) -> Result<(), BacktestError> {
        validate_config(self)
    }
}

fn validate_config(config: &BacktestConfig) -> Result<(), BacktestError> {
    fn positive(value: f64) -> bool {
        value.is_finite() && value > 0.0
    }
    fn non_negative(value: f64) -> bool {
        value.is_finite() && value >= 0.0
    }

    if config.step_size_ms <= 0 {
        return Err(BacktestError::InvalidConfig("Step size must be positive".to_string()));
    }
    if !positive(config.starting_cash) {
        return Err(BacktestError::InvalidConfig("Starting cash must be positive".to_string()));
    }
    if !positive(config.trade_notional) {
        return Err(BacktestError::InvalidConfig("Trade notional must be positive".to_string()));
    }
    if !non_negative(config.slippage_bps) {
        return Err(BacktestError::InvalidConfig("Slippage must be non-negative".to_string()));
    }
    if !positive(config.enter_abs_z) {
        return Err(BacktestError::InvalidConfig(
            "Entry |z| threshold must be positive".to_string(),
        ));
    }
    if !non_negative(config.exit_abs_z) {
        return Err(BacktestError::InvalidConfig(
            "Exit |z| threshold must be non-negative".to_string(),
        ));
    }
    if config.vol_window_returns < 2 {
        return Err(BacktestError::InvalidConfig(
            "Volatility window must cover at least 2 returns".to_string(),
        ));
    }
    if config.z_lookback_steps == 0 {
        return Err(BacktestError::InvalidConfig("z lookback must be at least 1 step".to_string()));
    }
    if let Some(min_crowding) = config.min_crowding {
        if !min_crowding.is_finite() {
            return Err(BacktestError::InvalidConfig("Minimum crowding must be finite".to_string()));
        }
    }
    let signal = &config.signal;
    if !signal.crowding_min.is_finite()
        || !signal.crowding_max.is_finite()
        || signal.crowding_min > signal.crowding_max
    {
        return Err(BacktestError::InvalidConfig(
            "Crowding clamp minimum exceeds maximum".to_string(),
        ));
    }
    Ok(())
}

/// Backtesting engine.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    generator: ContrarianSignalGenerator,
}

impl BacktestEngine {
    /// Create an engine, rejecting invalid configurations.
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let generator = ContrarianSignalGenerator::new(config.signal);
        Ok(Self { config, generator })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the simulation.
    ///
    /// `candles` and `funding` must be sorted ascending by time. Funding is
    /// forward-filled: the latest point at or before each candle applies.
    pub fn run(&self, candles: &[CandlePoint], funding: &[FundingPoint]) -> BacktestResult {
        let config = &self.config;

        if candles.len() < MIN_CANDLES {
            warn!(
                "Backtest skipped: {} candles, need at least {}",
                candles.len(),
                MIN_CANDLES
            );
            return BacktestResult::empty(config.starting_cash);
        }

        let prices: Vec<f64> = candles.iter().map(|c| c.price).collect();
        let step_seconds = config.step_seconds();
        let step_hours = config.step_hours();
        let sigmas =
            RollingVolatility::new(step_seconds, config.vol_window_returns).compute(&prices);

        let mut cash = config.starting_cash;
        let mut state = PositionState::Flat;
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity: Vec<EquityPoint> = Vec::with_capacity(candles.len());

        let mut funding_idx = 0;
        let mut current_funding: Option<FundingPoint> = None;
        let last_index = candles.len() - 1;

        for (i, candle) in candles.iter().enumerate() {
            let price = candle.price;
            let is_last = i == last_index;

            // Forward-fill funding
            while funding_idx < funding.len() && funding[funding_idx].time <= candle.time {
                current_funding = Some(funding[funding_idx]);
                funding_idx += 1;
            }

            if let PositionState::Open(position) = &mut state {
                if config.use_funding {
                    if let Some(point) = current_funding {
                        position.accrue_funding(price, point.funding_rate, step_hours);
                    }
                }
            }

            let sigma = sigmas[i];
            let z = z_score(
                &prices,
                i,
                config.z_lookback_steps,
                sigma,
                step_seconds,
                DEFAULT_YEAR_SECONDS,
            );

            // Exit before entry
            let exit = match &state {
                PositionState::Open(position) => self.exit_reason(position, z, i, is_last),
                PositionState::Flat => None,
            };
            if let Some(reason) = exit {
                if let PositionState::Open(position) = std::mem::take(&mut state) {
                    let exit_price =
                        apply_slippage(price, -position.direction(), config.slippage_bps);
                    let trade = position.close(exit_price, candle.time, i, z, reason);
                    cash += trade.notional + trade.total_pnl;
                    debug!(
                        "Closed {} at {:.4} ({}): pnl {:.4}, funding {:.4}",
                        trade.side, trade.exit_price, reason, trade.total_pnl, trade.funding_pnl
                    );
                    trades.push(trade);
                }
            }

            // The final candle only closes, so the run always ends flat
            if matches!(state, PositionState::Flat) && !is_last {
                if let Some(position) = self.try_enter(candle, i, z, cash, current_funding) {
                    cash -= position.notional;
                    debug!(
                        "Opened {} at {:.4}, z {:.3}, qty {:.6}",
                        position.side, position.entry_price, position.entry_z, position.quantity
                    );
                    state = PositionState::Open(position);
                }
            }

            let position_value = state.value(price);
            equity.push(EquityPoint {
                time: candle.time,
                price,
                cash,
                equity: cash + position_value.unwrap_or(0.0),
                sigma,
                z,
                tail_probability: z.map(two_sided_tail),
                funding_rate: current_funding.map(|f| f.funding_rate),
                premium: current_funding.map(|f| f.premium),
                position_side: state.side(),
                position_value,
            });
        }

        let summary = summarize(config.starting_cash, &trades, &equity);
        info!(
            "Backtest completed: {} trades, {:.2}% return, max drawdown {:.2}%",
            summary.trade_count,
            summary.total_return * 100.0,
            summary.max_drawdown_pct * 100.0
        );

        BacktestResult {
            summary,
            trades,
            equity,
        }
    }

    fn exit_reason(
        &self,
        position: &OpenPosition,
        z: Option<f64>,
        index: usize,
        is_last: bool,
    ) -> Option<ExitReason> {
        if let Some(z) = z {
            if z.abs() <= self.config.exit_abs_z {
                return Some(ExitReason::Signal);
            }
            if index - position.entry_index >= self.config.max_hold_steps {
                return Some(ExitReason::Timeout);
            }
        }
        if is_last {
            return Some(ExitReason::EndOfSeries);
        }
        None
    }

    fn try_enter(
        &self,
        candle: &CandlePoint,
        index: usize,
        z: Option<f64>,
        cash: f64,
        funding: Option<FundingPoint>,
    ) -> Option<OpenPosition> {
        let config = &self.config;
        let z_value = z?;
        if z_value.abs() < config.enter_abs_z || cash < config.trade_notional {
            return None;
        }

        let context = SignalContext {
            notional_volume_24h: config.notional_volume_24h,
            funding_rate: funding.map(|f| f.funding_rate),
            premium: funding.map(|f| f.premium),
        };
        let signal = self.generator.generate(z, &context)?;
        if let Some(min_crowding) = config.min_crowding {
            if signal.crowding < min_crowding {
                debug!(
                    "Entry gated: crowding {:.3} below {:.3}",
                    signal.crowding, min_crowding
                );
                return None;
            }
        }

        let side = config.mode.apply(signal.side);
        let entry_price = apply_slippage(candle.price, side.direction(), config.slippage_bps);
        Some(OpenPosition {
            side,
            notional: config.trade_notional,
            quantity: config.trade_notional / entry_price,
            entry_price,
            entry_time: candle.time,
            entry_index: index,
            entry_z: z_value,
            funding_pnl: 0.0,
        })
    }
}

/// Run a backtest over candles and an optional funding series.
pub fn run_backtest(
    candles: &[CandlePoint],
    funding: Option<&[FundingPoint]>,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    let engine = BacktestEngine::new(config.clone())?;
    Ok(engine.run(candles, funding.unwrap_or(&[])))
}

/// Seeded random-walk candles with occasional jumps, plus a funding print
/// every eight candles. The same seed always yields the same series.
pub fn generate_synthetic_series(
    bars: usize,
    start: i64,
    step_ms: i64,
    seed: u64,
) -> (Vec<CandlePoint>, Vec<FundingPoint>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut candles = Vec::with_capacity(bars);
    let mut funding = Vec::with_capacity(bars / 8 + 1);
    let mut price = 100.0;

    for i in 0..bars {
        let timestamp = start + i as i64 * step_ms;

        // Random walk with rare shocks
        let mut change = rng.gen_range(-0.01..0.01);
        if rng.gen_bool(0.03) {
            change += rng.gen_range(-0.06..0.06);
        }
        price *= 1.0 + change;
        candles.push(CandlePoint::new(timestamp, price));

        if i % 8 == 0 {
            let rate = rng.gen_range(-0.0003..0.0005);
            let premium = rng.gen_range(-0.002..0.002);
            funding.push(FundingPoint::new(timestamp, rate, premium));
        }
    }

    (candles, funding)
}

/// Calculate summary statistics from trades and the equity curve.
fn summarize(starting_cash: f64, trades: &[Trade], equity: &[EquityPoint]) -> BacktestSummary {
    let ending_equity = equity.last().map(|e| e.equity).unwrap_or(starting_cash);

    let trade_count = trades.len();
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    let total_pnl: f64 = trades.iter().map(|t| t.total_pnl).sum();

    let gross_profit: f64 = trades.iter().filter(|t| t.total_pnl > 0.0).map(|t| t.total_pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.total_pnl < 0.0)
        .map(|t| t.total_pnl.abs())
        .sum();
    let profit_factor = if gross_loss > 0.0 {
        Some(gross_profit / gross_loss)
    } else {
        None
    };

    let (win_rate, avg_pnl, avg_holding_steps) = if trade_count > 0 {
        let n = trade_count as f64;
        let holding: usize = trades.iter().map(|t| t.holding_steps).sum();
        (
            Some(wins as f64 / n),
            Some(total_pnl / n),
            Some(holding as f64 / n),
        )
    } else {
        (None, None, None)
    };

    // Peak-to-trough over the curve, seeded with the starting balance
    let mut peak = starting_cash;
    let mut max_drawdown = 0.0f64;
    let mut max_drawdown_pct = 0.0f64;
    for point in equity {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = peak - point.equity;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
            // Fraction of the peak the largest drawdown fell from
            max_drawdown_pct = if peak > 0.0 { drawdown / peak } else { 0.0 };
        }
    }

    let count_reason =
        |reason: ExitReason| trades.iter().filter(|t| t.exit_reason == reason).count();

    BacktestSummary {
        starting_cash,
        ending_equity,
        total_return: (ending_equity - starting_cash) / starting_cash,
        trade_count,
        win_rate,
        avg_pnl,
        profit_factor,
        max_drawdown,
        max_drawdown_pct,
        gross_profit,
        gross_loss,
        total_funding_pnl: trades.iter().map(|t| t.funding_pnl).sum(),
        avg_holding_steps,
        signal_exits: count_reason(ExitReason::Signal),
        timeout_exits: count_reason(ExitReason::Timeout),
        end_of_series_exits: count_reason(ExitReason::EndOfSeries),
    }
}
