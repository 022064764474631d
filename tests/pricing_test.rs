//! Integration tests for option pricing and implied volatility

use proptest::prelude::*;
use vantage::services::options::{bsm_greeks, bsm_price, implied_volatility, price_bounds};
use vantage::services::OptionsError;
use vantage::types::{OptionInputs, OptionRight};

fn atm() -> OptionInputs {
    OptionInputs::new(100.0, 100.0, 1.0, 0.20, 0.05)
}

// =============================================================================
// Reference prices
// =============================================================================

mod reference_tests {
    use super::*;

    #[test]
    fn test_atm_reference_prices() {
        let call = bsm_price(&atm(), OptionRight::Call).unwrap();
        let put = bsm_price(&atm(), OptionRight::Put).unwrap();
        assert!((call - 10.4506).abs() < 1e-3);
        assert!((put - 5.5735).abs() < 1e-3);
    }

    #[test]
    fn test_greeks_consistent_with_price() {
        let result = bsm_greeks(&atm(), OptionRight::Call).unwrap();
        assert_eq!(result.price, bsm_price(&atm(), OptionRight::Call).unwrap());
        assert!(result.has_d_terms());
        assert!(result.delta > 0.5 && result.delta < 1.0);
        assert!(result.gamma > 0.0);
        assert!(result.theta < 0.0);
        assert!(result.rho > 0.0);

        // Vega against a central difference
        let h = 1e-4;
        let up = bsm_price(&atm().with_volatility(0.20 + h), OptionRight::Call).unwrap();
        let down = bsm_price(&atm().with_volatility(0.20 - h), OptionRight::Call).unwrap();
        assert!((result.vega - (up - down) / (2.0 * h)).abs() < 1e-2);
    }

    #[test]
    fn test_dividend_yield_lowers_call() {
        let plain = bsm_price(&atm(), OptionRight::Call).unwrap();
        let paying = bsm_price(&atm().with_dividend_yield(0.03), OptionRight::Call).unwrap();
        assert!(paying < plain);
    }

    #[test]
    fn test_expired_is_intrinsic() {
        let itm = OptionInputs::new(110.0, 100.0, 0.0, 0.3, 0.05);
        assert_eq!(bsm_price(&itm, OptionRight::Call).unwrap(), 10.0);
        assert_eq!(bsm_price(&itm, OptionRight::Put).unwrap(), 0.0);

        let greeks = bsm_greeks(&itm, OptionRight::Call).unwrap();
        assert_eq!(greeks.delta, 1.0);
        assert_eq!(greeks.gamma, 0.0);
        assert!(!greeks.has_d_terms());
    }

    #[test]
    fn test_invalid_inputs() {
        let bad = [
            OptionInputs::new(0.0, 100.0, 1.0, 0.2, 0.05),
            OptionInputs::new(100.0, -1.0, 1.0, 0.2, 0.05),
            OptionInputs::new(100.0, 100.0, -1.0, 0.2, 0.05),
            OptionInputs::new(100.0, 100.0, 1.0, -0.2, 0.05),
            OptionInputs::new(f64::NAN, 100.0, 1.0, 0.2, 0.05),
        ];
        for inputs in bad {
            assert!(matches!(
                bsm_price(&inputs, OptionRight::Call),
                Err(OptionsError::InvalidInput(_))
            ));
        }
    }
}

// =============================================================================
// Implied volatility
// =============================================================================

mod implied_volatility_tests {
    use super::*;

    #[test]
    fn test_recovers_reference_vol() {
        let price = bsm_price(&atm(), OptionRight::Put).unwrap();
        let iv = implied_volatility(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Put, price).unwrap();
        assert!((iv - 0.20).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_prices_outside_bounds() {
        let (lower, upper) = price_bounds(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Call);
        let solve = |quote: f64| {
            implied_volatility(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Call, quote)
        };
        assert!(solve(upper + 1.0).is_none());
        assert!(solve(lower - 1.0).is_none());
        assert!(solve(-1.0).is_none());
        assert!(solve(f64::NAN).is_none());
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_put_call_parity(
        strike in 50.0f64..150.0,
        time in 0.01f64..3.0,
        vol in 0.05f64..2.0,
        rate in 0.0f64..0.1,
        yield_ in 0.0f64..0.05,
    ) {
        let inputs = OptionInputs::new(100.0, strike, time, vol, rate).with_dividend_yield(yield_);
        let call = bsm_price(&inputs, OptionRight::Call).unwrap();
        let put = bsm_price(&inputs, OptionRight::Put).unwrap();
        let forward_value = 100.0 * (-yield_ * time).exp() - strike * (-rate * time).exp();
        prop_assert!((call - put - forward_value).abs() < 1e-8);
    }

    #[test]
    fn prop_price_within_bounds(
        strike in 50.0f64..150.0,
        time in 0.0f64..3.0,
        vol in 0.0f64..2.0,
        rate in 0.0f64..0.1,
    ) {
        let inputs = OptionInputs::new(100.0, strike, time, vol, rate);
        for right in [OptionRight::Call, OptionRight::Put] {
            let price = bsm_price(&inputs, right).unwrap();
            let (lower, upper) = price_bounds(100.0, strike, time, rate, 0.0, right);
            prop_assert!(price >= lower - 1e-4 && price <= upper + 1e-4);
        }
    }

    #[test]
    fn prop_implied_vol_round_trip(
        strike in 90.0f64..110.0,
        vol in 0.1f64..3.5,
        time in 0.25f64..2.0,
        rate in 0.0f64..0.08,
        yield_ in 0.0f64..0.04,
        is_call in any::<bool>(),
    ) {
        let right = if is_call { OptionRight::Call } else { OptionRight::Put };
        let inputs = OptionInputs::new(100.0, strike, time, vol, rate).with_dividend_yield(yield_);
        let price = bsm_price(&inputs, right).unwrap();
        let iv = implied_volatility(100.0, strike, time, rate, yield_, right, price);
        prop_assert!(iv.is_some());
        prop_assert!((iv.unwrap() - vol).abs() < 1e-6, "iv {:?} vs {}", iv, vol);
    }
}
