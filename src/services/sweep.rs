//! Parallel parameter sweeps.
//!
//! Runs independent backtests over shared inputs on the blocking pool.
//! Every run is a pure function of its inputs, so parallel results match a
//! sequential loop exactly.

use crate::services::backtester::{run_backtest, BacktestError};
use crate::types::{BacktestConfig, BacktestResult, CandlePoint, FundingPoint};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Result of one configuration in a sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Position of the config in the input list
    pub index: usize,
    pub result: Result<BacktestResult, BacktestError>,
}

impl SweepOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one backtest per config with at most `workers` running at once.
///
/// Outcomes come back in config order.
pub async fn run_sweep(
    candles: Vec<CandlePoint>,
    funding: Vec<FundingPoint>,
    configs: Vec<BacktestConfig>,
    workers: usize,
) -> Vec<SweepOutcome> {
    let candles = Arc::new(candles);
    let funding = Arc::new(funding);
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));

    debug!(
        "Starting sweep: {} configs, {} workers",
        configs.len(),
        workers.max(1)
    );

    let mut handles = Vec::with_capacity(configs.len());
    for config in configs {
        let permit = semaphore.clone().acquire_owned().await;
        let candles = Arc::clone(&candles);
        let funding = Arc::clone(&funding);
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit.map_err(|e| BacktestError::TaskFailed(e.to_string()))?;
            run_backtest(candles.as_slice(), Some(funding.as_slice()), &config)
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Sweep run {} failed: {}", index, e);
                Err(BacktestError::TaskFailed(e.to_string()))
            }
        };
        outcomes.push(SweepOutcome { index, result });
    }
    outcomes
}

/// Copies of `base` with each entry threshold substituted.
pub fn enter_threshold_grid(base: &BacktestConfig, thresholds: &[f64]) -> Vec<BacktestConfig> {
    thresholds
        .iter()
        .map(|&enter_abs_z| BacktestConfig {
            enter_abs_z,
            ..base.clone()
        })
        .collect()
}
