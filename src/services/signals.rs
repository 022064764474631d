//! Contrarian perp signal.
//!
//! Fades a volatility-scaled move: a positive z opens short, a negative z opens
//! long. Strength is scaled by liquidity and by a crowding multiplier that
//! rewards funding and premium carry paying the position.

use crate::types::{PerpSide, PerpSignal, SignalContext, SignalParams};

/// Contrarian signal generator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContrarianSignalGenerator {
    params: SignalParams,
}

impl ContrarianSignalGenerator {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Build the signal for a z-score; `None` if z is undefined.
    pub fn generate(&self, z: Option<f64>, context: &SignalContext) -> Option<PerpSignal> {
        let z = z.filter(|z| z.is_finite())?;
        let p = &self.params;

        let side = if z >= 0.0 { PerpSide::Short } else { PerpSide::Long };
        let abs_z = z.abs();

        let volume = context.notional_volume_24h.unwrap_or(0.0).max(0.0);
        let liquidity_factor = 1.0 + p.liquidity_weight * (volume + 1.0).log10();

        let funding_quality = context
            .funding_rate
            .map(|rate| carry_quality(rate, side, p.funding_scale_bps))
            .unwrap_or(0.0);
        let premium_quality = context
            .premium
            .map(|premium| carry_quality(premium, side, p.premium_scale_bps))
            .unwrap_or(0.0);

        let crowding = (1.0
            + p.funding_weight * funding_quality
            + p.premium_weight * premium_quality)
            .clamp(p.crowding_min, p.crowding_max);

        Some(PerpSignal {
            side,
            score: abs_z * liquidity_factor * crowding,
            z,
            abs_z,
            liquidity_factor,
            funding_quality,
            premium_quality,
            crowding,
        })
    }
}

/// Alignment of a carry term with `side`, scaled and clamped to [-1, 1].
///
/// Positive funding or premium pays shorts, so it is favorable for a short
/// and unfavorable for a long.
fn carry_quality(value: f64, side: PerpSide, scale_bps: f64) -> f64 {
    if !value.is_finite() || !scale_bps.is_finite() || scale_bps <= 0.0 {
        return 0.0;
    }
    let bps = value * 10_000.0;
    let aligned = match side {
        PerpSide::Short => bps,
        PerpSide::Long => -bps,
    };
    (aligned / scale_bps).clamp(-1.0, 1.0)
}

/// Convenience wrapper around [`ContrarianSignalGenerator::generate`].
pub fn contrarian_signal(
    z: Option<f64>,
    context: &SignalContext,
    params: &SignalParams,
) -> Option<PerpSignal> {
    ContrarianSignalGenerator::new(*params).generate(z, context)
}
