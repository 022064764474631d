//! Standard normal distribution.
//!
//! The CDF uses the five-term rational approximation of the upper tail from
//! Abramowitz & Stegun 26.2.17 (|error| < 7.5e-8):
//!
//! Q(x) = φ(x)·(b1·t + b2·t² + b3·t³ + b4·t⁴ + b5·t⁵), t = 1 / (1 + p·x), x ≥ 0

use std::f64::consts::PI;

const P: f64 = 0.231_641_9;
const B1: f64 = 0.319_381_530;
const B2: f64 = -0.356_563_782;
const B3: f64 = 1.781_477_937;
const B4: f64 = -1.821_255_978;
const B5: f64 = 1.330_274_429;

/// Beyond this |x| the density underflows and the CDF is exactly 0 or 1.
const SATURATION: f64 = 37.5;

/// Standard normal probability density function.
pub fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal cumulative distribution function.
pub fn cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x >= SATURATION {
        return 1.0;
    }
    if x <= -SATURATION {
        return 0.0;
    }

    if x >= 0.0 {
        1.0 - upper_tail(x)
    } else {
        // cdf(x) = 1 - cdf(-x) = Q(-x)
        upper_tail(-x)
    }
}

/// Two-sided tail probability P(|Z| >= |z|).
pub fn two_sided_tail(z: f64) -> f64 {
    (2.0 * (1.0 - cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Q(x) = 1 - Φ(x) for x >= 0.
fn upper_tail(x: f64) -> f64 {
    let t = 1.0 / (1.0 + P * x);
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    pdf(x) * poly
}
