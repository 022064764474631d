use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vantage::config::Config;
use vantage::services::backtester::generate_synthetic_series;
use vantage::services::{enter_threshold_grid, run_backtest, run_sweep};
use vantage::types::MarketData;

/// Entry thresholds tried by the sweep.
const SWEEP_THRESHOLDS: [f64; 5] = [1.5, 2.0, 2.5, 3.0, 3.5];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let data = match &config.data_path {
        Some(path) => {
            info!("Loading {} data from {}", config.symbol, path.display());
            MarketData::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => {
            info!(
                "Generating {} synthetic {} candles (seed {})",
                config.synthetic_bars, config.symbol, config.seed
            );
            let (candles, funding) = generate_synthetic_series(
                config.synthetic_bars,
                config.synthetic_start_ms,
                config.backtest.step_size_ms,
                config.seed,
            );
            MarketData { candles, funding }
        }
    };

    if let (Some(first), Some(last)) = (data.candles.first(), data.candles.last()) {
        info!(
            "Series spans {} to {} ({} candles, {} funding points)",
            first.datetime().map(|d| d.to_rfc3339()).unwrap_or_default(),
            last.datetime().map(|d| d.to_rfc3339()).unwrap_or_default(),
            data.candles.len(),
            data.funding.len()
        );
    }

    let result = run_backtest(&data.candles, Some(data.funding.as_slice()), &config.backtest)?;
    let summary = &result.summary;
    info!(
        "{}: {} trades, ending equity {:.2}, return {:.2}%, max drawdown {:.2}%",
        config.symbol,
        summary.trade_count,
        summary.ending_equity,
        summary.total_return * 100.0,
        summary.max_drawdown_pct * 100.0
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(workers) = config.sweep_workers {
        let configs = enter_threshold_grid(&config.backtest, &SWEEP_THRESHOLDS);
        let outcomes = run_sweep(data.candles, data.funding, configs, workers).await;
        for outcome in outcomes {
            let threshold = SWEEP_THRESHOLDS[outcome.index];
            match outcome.result {
                Ok(result) => info!(
                    "Sweep |z| >= {:.1}: {} trades, return {:.2}%",
                    threshold,
                    result.summary.trade_count,
                    result.summary.total_return * 100.0
                ),
                Err(e) => warn!("Sweep |z| >= {:.1} failed: {}", threshold, e),
            }
        }
    }

    Ok(())
}
