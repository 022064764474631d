//! Signal Types
//!
//! Output of the contrarian perp signal and the knobs that shape it.

use serde::{Deserialize, Serialize};

/// Direction of a perp position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerpSide {
    Long,
    Short,
}

impl PerpSide {
    /// +1 for long, -1 for short.
    pub fn direction(&self) -> f64 {
        match self {
            PerpSide::Long => 1.0,
            PerpSide::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PerpSide::Long => PerpSide::Short,
            PerpSide::Short => PerpSide::Long,
        }
    }
}

impl std::fmt::Display for PerpSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerpSide::Long => write!(f, "long"),
            PerpSide::Short => write!(f, "short"),
        }
    }
}

/// Optional market context that modulates signal strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalContext {
    /// 24h notional volume
    pub notional_volume_24h: Option<f64>,
    /// Current funding rate (decimal)
    pub funding_rate: Option<f64>,
    /// Current perp premium (decimal)
    pub premium: Option<f64>,
}

/// Tunables for the contrarian signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalParams {
    /// Weight on log10(volume + 1)
    pub liquidity_weight: f64,
    /// Funding level (bps) that maps to full quality
    pub funding_scale_bps: f64,
    /// Premium level (bps) that maps to full quality
    pub premium_scale_bps: f64,
    pub funding_weight: f64,
    pub premium_weight: f64,
    pub crowding_min: f64,
    pub crowding_max: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            liquidity_weight: 1.0,
            funding_scale_bps: 10.0,
            premium_scale_bps: 25.0,
            funding_weight: 0.35,
            premium_weight: 0.25,
            crowding_min: 0.25,
            crowding_max: 2.0,
        }
    }
}

/// A scored contrarian trade idea.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpSignal {
    pub side: PerpSide,
    /// |z| · liquidityFactor · crowding
    pub score: f64,
    pub z: f64,
    pub abs_z: f64,
    pub liquidity_factor: f64,
    /// Funding alignment with `side`, in [-1, 1]
    pub funding_quality: f64,
    /// Premium alignment with `side`, in [-1, 1]
    pub premium_quality: f64,
    pub crowding: f64,
}
