//! Options Types
//!
//! Inputs and outputs for European option pricing under Black-Scholes-Merton.

use serde::{Deserialize, Serialize};

/// Option right (Call or Put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionRight {
    /// Right to buy at strike price
    Call,
    /// Right to sell at strike price
    Put,
}

impl OptionRight {
    /// +1 for calls, -1 for puts.
    pub fn sign(&self) -> f64 {
        match self {
            OptionRight::Call => 1.0,
            OptionRight::Put => -1.0,
        }
    }

    /// Payoff at expiry for a given underlying price.
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionRight::Call => (spot - strike).max(0.0),
            OptionRight::Put => (strike - spot).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionRight::Call => write!(f, "call"),
            OptionRight::Put => write!(f, "put"),
        }
    }
}

/// Market inputs for pricing a single European option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInputs {
    /// Underlying spot price (S > 0)
    pub spot: f64,
    /// Strike price (K > 0)
    pub strike: f64,
    /// Time to expiry in years (T >= 0)
    pub time_years: f64,
    /// Annualized volatility (σ >= 0)
    pub volatility: f64,
    /// Continuously-compounded risk-free rate
    pub rate: f64,
    /// Continuously-compounded dividend/borrow yield
    #[serde(default)]
    pub dividend_yield: f64,
}

impl OptionInputs {
    /// Create inputs with a zero dividend yield.
    pub fn new(spot: f64, strike: f64, time_years: f64, volatility: f64, rate: f64) -> Self {
        Self {
            spot,
            strike,
            time_years,
            volatility,
            rate,
            dividend_yield: 0.0,
        }
    }

    /// Set the continuous dividend yield.
    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = dividend_yield;
        self
    }

    /// Copy of these inputs with a different volatility.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Discount factor applied to the spot leg, e^{-qT}.
    pub fn spot_discount(&self) -> f64 {
        (-self.dividend_yield * self.time_years).exp()
    }

    /// Discount factor applied to the strike leg, e^{-rT}.
    pub fn strike_discount(&self) -> f64 {
        (-self.rate * self.time_years).exp()
    }

    /// Deterministic forward F = S·e^{(r-q)T}.
    pub fn forward(&self) -> f64 {
        self.spot * ((self.rate - self.dividend_yield) * self.time_years).exp()
    }
}

/// Price, greeks, and the d1/d2 terms for one option.
///
/// `d1` and `d2` are NaN when `T = 0` or `σ = 0`; those cases are priced by
/// closed-form branches that never read them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BsmResult {
    pub right: OptionRight,
    pub price: f64,
    /// dV/dS
    pub delta: f64,
    /// d²V/dS²
    pub gamma: f64,
    /// dV/dσ per unit of volatility
    pub vega: f64,
    /// dV/dt per year
    pub theta: f64,
    /// dV/dr per unit of rate
    pub rho: f64,
    pub d1: f64,
    pub d2: f64,
}

impl BsmResult {
    /// True when the general closed form was used (d1/d2 are finite).
    pub fn has_d_terms(&self) -> bool {
        self.d1.is_finite() && self.d2.is_finite()
    }
}
