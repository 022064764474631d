//! Integration tests for volatility estimators and z-scores

use proptest::prelude::*;
use vantage::services::normal::{cdf, two_sided_tail};
use vantage::services::volatility::{
    realized_volatility, rolling_volatility, rolling_volatility_naive, z_score, RollingVolatility,
    DEFAULT_YEAR_SECONDS,
};
use vantage::services::{contrarian_signal, ContrarianSignalGenerator};
use vantage::types::{PerpSide, SignalContext, SignalParams};

const HOUR: f64 = 3600.0;

#[test]
fn test_constant_series_has_zero_vol() {
    let prices = vec![42.0; 30];
    assert_eq!(realized_volatility(&prices, HOUR, None), Some(0.0));

    let rolling = rolling_volatility(&prices, HOUR, 5, None);
    assert!(rolling[..5].iter().all(|v| v.is_none()));
    assert!(rolling[5..].iter().all(|v| *v == Some(0.0)));
}

#[test]
fn test_zero_vol_leaves_z_undefined() {
    let prices = vec![42.0; 30];
    let sigma = rolling_volatility(&prices, HOUR, 5, None)[10];
    assert_eq!(z_score(&prices, 10, 1, sigma, HOUR, DEFAULT_YEAR_SECONDS), None);
}

#[test]
fn test_annualization_scales_with_period() {
    let prices = [100.0, 102.0, 99.0, 101.0, 100.5, 103.0];
    let hourly = realized_volatility(&prices, HOUR, None).unwrap();
    let daily = realized_volatility(&prices, 24.0 * HOUR, None).unwrap();
    assert!((hourly / daily - 24f64.sqrt()).abs() < 1e-9);
}

#[test]
fn test_custom_year_length() {
    let prices = [100.0, 102.0, 99.0, 101.0, 100.5, 103.0];
    let trading_year = 252.0 * 86_400.0;
    let a = rolling_volatility(&prices, 86_400.0, 3, Some(trading_year));
    let b = RollingVolatility::new(86_400.0, 3)
        .with_year_seconds(trading_year)
        .compute(&prices);
    assert_eq!(a, b);
}

#[test]
fn test_gap_blocks_window() {
    let prices = [100.0, 101.0, 102.0, f64::NAN, 101.0, 100.0, 99.0, 100.0, 101.0];
    let vols = rolling_volatility(&prices, HOUR, 3, None);
    // Windows whose returns touch index 3 or 4 are undefined
    assert!(vols[3..7].iter().all(|v| v.is_none()));
    assert!(vols[7].is_some());

    let naive = rolling_volatility_naive(&prices, HOUR, 3, None);
    for (a, b) in vols.iter().zip(naive.iter()) {
        assert_eq!(a.is_some(), b.is_some());
    }
}

#[test]
fn test_z_feeds_signal_and_tail() {
    let prices = [100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 120.0];
    let sigma = rolling_volatility(&prices, HOUR, 5, None)[6];
    let z = z_score(&prices, 6, 1, sigma, HOUR, DEFAULT_YEAR_SECONDS).unwrap();
    assert!(z > 2.0);

    let signal = ContrarianSignalGenerator::default()
        .generate(Some(z), &SignalContext::default())
        .unwrap();
    assert_eq!(signal.side, PerpSide::Short);

    let tail = two_sided_tail(z);
    assert!((tail - 2.0 * (1.0 - cdf(z))).abs() < 1e-12);
    assert!(tail < 0.05);
}

#[test]
fn test_signal_wrapper_matches_generator() {
    let context = SignalContext {
        notional_volume_24h: Some(5e6),
        funding_rate: Some(-0.0002),
        premium: Some(0.001),
    };
    let params = SignalParams::default();
    assert_eq!(
        contrarian_signal(Some(-2.4), &context, &params),
        ContrarianSignalGenerator::new(params).generate(Some(-2.4), &context)
    );
}

proptest! {
    #[test]
    fn prop_rolling_matches_naive(
        returns in prop::collection::vec(-0.05f64..0.05, 3..120),
        window in 2usize..20,
    ) {
        let mut prices = Vec::with_capacity(returns.len() + 1);
        let mut price = 100.0;
        prices.push(price);
        for r in &returns {
            price *= (*r).exp();
            prices.push(price);
        }

        let fast = rolling_volatility(&prices, HOUR, window, None);
        let slow = rolling_volatility_naive(&prices, HOUR, window, None);
        prop_assert_eq!(fast.len(), slow.len());
        for (a, b) in fast.iter().zip(slow.iter()) {
            match (a, b) {
                (Some(a), Some(b)) => prop_assert!((a - b).abs() <= 1e-5 * b.max(1.0)),
                (None, None) => {}
                _ => prop_assert!(false, "definedness differs"),
            }
        }
    }

    #[test]
    fn prop_vol_is_non_negative(
        prices in prop::collection::vec(1.0f64..1000.0, 3..60),
    ) {
        let vol = realized_volatility(&prices, HOUR, None).unwrap();
        prop_assert!(vol >= 0.0);
    }
}
