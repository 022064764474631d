//! Options Service
//!
//! Handles European options pricing under Black-Scholes-Merton:
//! - Closed-form price with continuous rate and dividend/borrow yield
//! - Greeks (delta, gamma, vega, theta, rho)
//! - Implied volatility by bracketed bisection
//!
//! `T = 0` and `σ = 0` are priced by their own closed-form branches
//! (intrinsic value and discounted forward payoff) rather than by the general
//! formula, so d1/d2 are never evaluated there.

use crate::services::normal::{cdf, pdf};
use crate::types::{BsmResult, OptionInputs, OptionRight};
use thiserror::Error;
use tracing::debug;

/// Options service errors.
#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Lower end of the implied volatility search.
const IV_LOW: f64 = 1e-6;
/// Initial upper end of the implied volatility search.
const IV_HIGH: f64 = 4.0;
/// The upper end is grown geometrically up to this cap.
const IV_HIGH_CAP: f64 = 10.0;
const IV_EXPANSION: f64 = 1.5;
const IV_MAX_ITERATIONS: u32 = 120;
const IV_PRICE_TOLERANCE: f64 = 1e-10;
const IV_WIDTH_TOLERANCE: f64 = 1e-8;
/// Slack allowed outside the no-arbitrage band.
const BOUND_TOLERANCE: f64 = 1e-9;

/// Which pricing branch applies to a set of validated inputs.
enum Regime {
    Expired,
    Deterministic,
    Diffusive { d1: f64, d2: f64 },
}

fn validate(inputs: &OptionInputs) -> Result<(), OptionsError> {
    if !inputs.spot.is_finite() || inputs.spot <= 0.0 {
        return Err(OptionsError::InvalidInput(format!(
            "spot must be positive, got {}",
            inputs.spot
        )));
    }
    if !inputs.strike.is_finite() || inputs.strike <= 0.0 {
        return Err(OptionsError::InvalidInput(format!(
            "strike must be positive, got {}",
            inputs.strike
        )));
    }
    if inputs.time_years.is_nan() || inputs.time_years < 0.0 {
        return Err(OptionsError::InvalidInput(format!(
            "time to expiry must be non-negative, got {}",
            inputs.time_years
        )));
    }
    if inputs.volatility.is_nan() || inputs.volatility < 0.0 {
        return Err(OptionsError::InvalidInput(format!(
            "volatility must be non-negative, got {}",
            inputs.volatility
        )));
    }
    Ok(())
}

fn regime(inputs: &OptionInputs) -> Regime {
    if inputs.time_years == 0.0 {
        return Regime::Expired;
    }
    if inputs.volatility == 0.0 {
        return Regime::Deterministic;
    }
    let (d1, d2) = raw_d1_d2(inputs);
    Regime::Diffusive { d1, d2 }
}

fn raw_d1_d2(inputs: &OptionInputs) -> (f64, f64) {
    let vol_sqrt_t = inputs.volatility * inputs.time_years.sqrt();
    let d1 = ((inputs.spot / inputs.strike).ln()
        + (inputs.rate - inputs.dividend_yield + 0.5 * inputs.volatility * inputs.volatility)
            * inputs.time_years)
        / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

/// Calculate d1 and d2.
///
/// Both are NaN when `T = 0` or `σ = 0`.
pub fn d1_d2(inputs: &OptionInputs) -> Result<(f64, f64), OptionsError> {
    validate(inputs)?;
    Ok(match regime(inputs) {
        Regime::Diffusive { d1, d2 } => (d1, d2),
        Regime::Expired | Regime::Deterministic => (f64::NAN, f64::NAN),
    })
}

/// Price of a European option.
pub fn bsm_price(inputs: &OptionInputs, right: OptionRight) -> Result<f64, OptionsError> {
    validate(inputs)?;
    Ok(price_validated(inputs, right))
}

fn price_validated(inputs: &OptionInputs, right: OptionRight) -> f64 {
    match regime(inputs) {
        Regime::Expired => right.intrinsic(inputs.spot, inputs.strike),
        Regime::Deterministic => {
            inputs.strike_discount() * right.intrinsic(inputs.forward(), inputs.strike)
        }
        Regime::Diffusive { d1, d2 } => {
            let spot_leg = inputs.spot * inputs.spot_discount();
            let strike_leg = inputs.strike * inputs.strike_discount();
            match right {
                OptionRight::Call => spot_leg * cdf(d1) - strike_leg * cdf(d2),
                OptionRight::Put => strike_leg * cdf(-d2) - spot_leg * cdf(-d1),
            }
        }
    }
}

/// Price, greeks, and d1/d2 for a European option.
pub fn bsm_greeks(inputs: &OptionInputs, right: OptionRight) -> Result<BsmResult, OptionsError> {
    validate(inputs)?;
    let price = price_validated(inputs, right);

    let result = match regime(inputs) {
        Regime::Expired => {
            let delta = match right {
                OptionRight::Call if inputs.spot > inputs.strike => 1.0,
                OptionRight::Put if inputs.spot < inputs.strike => -1.0,
                _ => 0.0,
            };
            degenerate(right, price, delta)
        }
        Regime::Deterministic => {
            let forward = inputs.forward();
            let delta = match right {
                OptionRight::Call if forward > inputs.strike => inputs.spot_discount(),
                OptionRight::Put if forward < inputs.strike => -inputs.spot_discount(),
                _ => 0.0,
            };
            degenerate(right, price, delta)
        }
        Regime::Diffusive { d1, d2 } => {
            let sqrt_t = inputs.time_years.sqrt();
            let spot_disc = inputs.spot_discount();
            let strike_disc = inputs.strike_discount();
            let density = pdf(d1);

            let delta = match right {
                OptionRight::Call => spot_disc * cdf(d1),
                OptionRight::Put => spot_disc * (cdf(d1) - 1.0),
            };

            // Gamma and vega are the same for calls and puts
            let gamma = spot_disc * density / (inputs.spot * inputs.volatility * sqrt_t);
            let vega = inputs.spot * spot_disc * density * sqrt_t;

            // Theta (per year): decay + discounting + carry
            let decay = -inputs.spot * spot_disc * density * inputs.volatility / (2.0 * sqrt_t);
            let theta = match right {
                OptionRight::Call => {
                    decay - inputs.rate * inputs.strike * strike_disc * cdf(d2)
                        + inputs.dividend_yield * inputs.spot * spot_disc * cdf(d1)
                }
                OptionRight::Put => {
                    decay + inputs.rate * inputs.strike * strike_disc * cdf(-d2)
                        - inputs.dividend_yield * inputs.spot * spot_disc * cdf(-d1)
                }
            };

            let rho = match right {
                OptionRight::Call => inputs.strike * inputs.time_years * strike_disc * cdf(d2),
                OptionRight::Put => -inputs.strike * inputs.time_years * strike_disc * cdf(-d2),
            };

            BsmResult {
                right,
                price,
                delta,
                gamma,
                vega,
                theta,
                rho,
                d1,
                d2,
            }
        }
    };

    Ok(result)
}

fn degenerate(right: OptionRight, price: f64, delta: f64) -> BsmResult {
    BsmResult {
        right,
        price,
        delta,
        gamma: 0.0,
        vega: 0.0,
        theta: 0.0,
        rho: 0.0,
        d1: f64::NAN,
        d2: f64::NAN,
    }
}

// ========== Implied Volatility ==========

/// No-arbitrage price band `(lower, upper)` for a European option.
pub fn price_bounds(
    spot: f64,
    strike: f64,
    time_years: f64,
    rate: f64,
    dividend_yield: f64,
    right: OptionRight,
) -> (f64, f64) {
    let spot_leg = spot * (-dividend_yield * time_years).exp();
    let strike_leg = strike * (-rate * time_years).exp();
    match right {
        OptionRight::Call => ((spot_leg - strike_leg).max(0.0), spot_leg),
        OptionRight::Put => ((strike_leg - spot_leg).max(0.0), strike_leg),
    }
}

/// Calculate implied volatility from an observed option price.
///
/// Returns `None` when no volatility reproduces the price: negative or
/// non-finite quotes, prices outside the no-arbitrage band, or a root that
/// cannot be bracketed below `σ = 10`. Expired options return `Some(0.0)`.
pub fn implied_volatility(
    spot: f64,
    strike: f64,
    time_years: f64,
    rate: f64,
    dividend_yield: f64,
    right: OptionRight,
    price: f64,
) -> Option<f64> {
    if !price.is_finite() || price < 0.0 {
        return None;
    }
    let base = OptionInputs::new(spot, strike, time_years, IV_LOW, rate)
        .with_dividend_yield(dividend_yield);
    if validate(&base).is_err() {
        return None;
    }
    if time_years == 0.0 {
        return Some(0.0);
    }

    let (lower, upper) = price_bounds(spot, strike, time_years, rate, dividend_yield, right);
    if price < lower - BOUND_TOLERANCE || price > upper + BOUND_TOLERANCE {
        debug!(
            "IV rejected: price {} outside no-arbitrage band [{}, {}]",
            price, lower, upper
        );
        return None;
    }

    let residual = |vol: f64| price_validated(&base.with_volatility(vol), right) - price;

    let mut low = IV_LOW;
    let mut high = IV_HIGH;
    let f_low = residual(low);
    let mut f_high = residual(high);

    if f_low.abs() < IV_PRICE_TOLERANCE {
        return Some(low);
    }

    while f_low * f_high > 0.0 && high < IV_HIGH_CAP {
        high = (high * IV_EXPANSION).min(IV_HIGH_CAP);
        f_high = residual(high);
    }
    if f_low * f_high > 0.0 {
        debug!("IV not bracketed in [{}, {}] for price {}", IV_LOW, high, price);
        return None;
    }

    for _ in 0..IV_MAX_ITERATIONS {
        let mid = 0.5 * (low + high);
        let f_mid = residual(mid);

        if f_mid.abs() < IV_PRICE_TOLERANCE || high - low < IV_WIDTH_TOLERANCE {
            return Some(mid);
        }

        // The residual keeps the sign of f_low on the low side of the root
        if (f_mid > 0.0) == (f_low > 0.0) {
            low = mid;
        } else {
            high = mid;
        }
    }

    Some(0.5 * (low + high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atm() -> OptionInputs {
        OptionInputs::new(100.0, 100.0, 1.0, 0.20, 0.05)
    }

    #[test]
    fn test_black_scholes_call() {
        // ATM call: S=100, K=100, T=1yr, σ=20%, r=5%
        let price = bsm_price(&atm(), OptionRight::Call).unwrap();
        assert!((price - 10.4506).abs() < 1e-3);
    }

    #[test]
    fn test_black_scholes_put() {
        let price = bsm_price(&atm(), OptionRight::Put).unwrap();
        assert!((price - 5.5735).abs() < 1e-3);
    }

    #[test]
    fn test_greeks_call() {
        let greeks = bsm_greeks(&atm(), OptionRight::Call).unwrap();

        // Delta for ATM call should be around 0.6
        assert!(greeks.delta > 0.5 && greeks.delta < 0.7);
        assert!(greeks.gamma > 0.0);
        assert!(greeks.theta < 0.0);
        // Per unit vol, not per 1%
        assert!((greeks.vega - 37.52).abs() < 0.05);
        assert!(greeks.rho > 0.0);
        assert!(greeks.has_d_terms());
    }

    #[test]
    fn test_greeks_put() {
        let greeks = bsm_greeks(&atm(), OptionRight::Put).unwrap();

        assert!(greeks.delta < 0.0 && greeks.delta > -0.6);
        assert!(greeks.gamma > 0.0);
        assert!(greeks.rho < 0.0);
    }

    #[test]
    fn test_put_call_delta_gap() {
        let inputs = atm().with_dividend_yield(0.02);
        let call = bsm_greeks(&inputs, OptionRight::Call).unwrap();
        let put = bsm_greeks(&inputs, OptionRight::Put).unwrap();
        assert!((call.delta - put.delta - inputs.spot_discount()).abs() < 1e-12);
        assert!((call.gamma - put.gamma).abs() < 1e-12);
        assert!((call.vega - put.vega).abs() < 1e-12);
    }

    #[test]
    fn test_expired_is_intrinsic() {
        let inputs = OptionInputs::new(105.0, 100.0, 0.0, 0.8, 0.05);
        assert_eq!(bsm_price(&inputs, OptionRight::Call).unwrap(), 5.0);
        assert_eq!(bsm_price(&inputs, OptionRight::Put).unwrap(), 0.0);

        let greeks = bsm_greeks(&inputs, OptionRight::Call).unwrap();
        assert_eq!(greeks.delta, 1.0);
        assert_eq!(greeks.gamma, 0.0);
        assert!(greeks.d1.is_nan() && greeks.d2.is_nan());
    }

    #[test]
    fn test_zero_vol_discounted_forward() {
        let inputs = OptionInputs::new(100.0, 100.0, 1.0, 0.0, 0.05);
        let call = bsm_price(&inputs, OptionRight::Call).unwrap();
        let expected = (-0.05f64).exp() * (100.0 * 0.05f64.exp() - 100.0);
        assert!((call - expected).abs() < 1e-12);
        assert_eq!(bsm_price(&inputs, OptionRight::Put).unwrap(), 0.0);

        let greeks = bsm_greeks(&inputs, OptionRight::Call).unwrap();
        assert_eq!(greeks.delta, 1.0);
        assert_eq!(greeks.vega, 0.0);
        assert_eq!(greeks.theta, 0.0);
    }

    #[test]
    fn test_d1_d2_sentinels() {
        let (d1, d2) = d1_d2(&OptionInputs::new(100.0, 100.0, 0.0, 0.2, 0.05)).unwrap();
        assert!(d1.is_nan() && d2.is_nan());

        let (d1, d2) = d1_d2(&atm()).unwrap();
        assert!((d1 - 0.35).abs() < 1e-12);
        assert!((d2 - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        let bad = [
            OptionInputs::new(-100.0, 100.0, 1.0, 0.2, 0.05),
            OptionInputs::new(100.0, 0.0, 1.0, 0.2, 0.05),
            OptionInputs::new(100.0, 100.0, -1.0, 0.2, 0.05),
            OptionInputs::new(100.0, 100.0, 1.0, -0.2, 0.05),
        ];
        for inputs in bad.iter() {
            assert!(bsm_price(inputs, OptionRight::Call).is_err());
            assert!(bsm_greeks(inputs, OptionRight::Put).is_err());
            assert!(d1_d2(inputs).is_err());
        }
    }

    #[test]
    fn test_implied_volatility() {
        let vol = 0.25;
        let inputs = atm().with_volatility(vol);
        let price = bsm_price(&inputs, OptionRight::Call).unwrap();

        let iv =
            implied_volatility(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Call, price).unwrap();
        assert!((iv - vol).abs() < 1e-6);
    }

    #[test]
    fn test_implied_volatility_high_vol_expands_bracket() {
        let vol = 5.0;
        let inputs = OptionInputs::new(100.0, 100.0, 0.05, vol, 0.0);
        let price = bsm_price(&inputs, OptionRight::Call).unwrap();

        let iv =
            implied_volatility(100.0, 100.0, 0.05, 0.0, 0.0, OptionRight::Call, price).unwrap();
        assert!((iv - vol).abs() < 1e-6);
    }

    #[test]
    fn test_implied_volatility_rejects_out_of_bounds() {
        // Above S·e^{-qT}
        assert_eq!(
            implied_volatility(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Call, 101.0),
            None
        );
        // Below intrinsic forward value
        assert_eq!(
            implied_volatility(120.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Call, 20.0),
            None
        );
        assert_eq!(
            implied_volatility(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Put, -1.0),
            None
        );
        assert_eq!(
            implied_volatility(100.0, 100.0, 1.0, 0.05, 0.0, OptionRight::Put, f64::NAN),
            None
        );
    }

    #[test]
    fn test_implied_volatility_expired() {
        assert_eq!(
            implied_volatility(100.0, 90.0, 0.0, 0.05, 0.0, OptionRight::Call, 10.0),
            Some(0.0)
        );
    }
}
