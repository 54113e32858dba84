//! Scalar math helpers shared by every basilica module.
//!
//! All functions are allocation-free and `no_std` friendly.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`]
//!
//! # Smoothing and Decay
//!
//! - [`smoothing_coeff`] - per-sample one-pole coefficient from a time constant
//! - [`block_coeff`] - the same coefficient applied once per block
//! - [`rt60_gain`] - loop gain that yields a given -60 dB decay time
//!
//! # Limiting
//!
//! | Function | Range | Use |
//! |----------|-------|-----|
//! | [`soft_clip`] | (-1, 1) | feedback return paths |
//! | [`soft_knee`] | [0, 1) | unipolar modulation sources |
//! | [`soft_limit`] | (-ceiling, ceiling) | output headroom guard |

use libm::{expf, logf, tanhf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use basilica_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Inputs at or below 1e-10 read as -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Linear interpolation: `a` at `t = 0`, `b` at `t = 1`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Flush values too small to matter to exactly zero.
///
/// Recirculating structures (delay feedback, one-poles, allpasses) decay
/// toward zero forever and eventually land in the IEEE 754 subnormal range,
/// where arithmetic can be 100x slower. Anything below 1e-20 (-400 dB) is
/// replaced with 0.0.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Crossfade `dry` toward `wet`: `mix = 0` is all dry, `mix = 1` all wet.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Hyperbolic-tangent saturation, output in (-1, 1).
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Unipolar soft knee.
///
/// Identity up to `knee`, then an exponential approach to 1.0 that is
/// continuous in both value and slope at the knee. Negative inputs map to 0.
///
/// ```rust
/// use basilica_core::soft_knee;
///
/// assert_eq!(soft_knee(0.5, 0.75), 0.5);
/// assert!(soft_knee(10.0, 0.75) < 1.0);
/// ```
#[inline]
pub fn soft_knee(x: f32, knee: f32) -> f32 {
    let x = x.max(0.0);
    if x <= knee {
        x
    } else {
        let span = 1.0 - knee;
        // expf underflows for large overshoots; stay strictly under 1.0.
        (knee + span * (1.0 - expf(-(x - knee) / span))).min(below(1.0))
    }
}

/// Symmetric soft limiter.
///
/// Linear below `knee`, tanh-compressed between `knee` and `ceiling`. The
/// output magnitude never reaches `ceiling`, and the slope never exceeds 1,
/// so the limiter cannot enlarge a sample-to-sample step.
#[inline]
pub fn soft_limit(x: f32, knee: f32, ceiling: f32) -> f32 {
    let mag = x.abs();
    if mag <= knee {
        x
    } else {
        let span = ceiling - knee;
        let limited = (knee + span * tanhf((mag - knee) / span)).min(below(ceiling));
        if x < 0.0 { -limited } else { limited }
    }
}

/// Largest `f32` strictly below a positive `ceiling`.
#[inline]
fn below(ceiling: f32) -> f32 {
    if ceiling > 0.0 && ceiling.is_finite() {
        f32::from_bits(ceiling.to_bits() - 1)
    } else {
        ceiling
    }
}

/// Per-sample one-pole smoothing coefficient for a time constant.
///
/// `coeff = 1 - exp(-1 / (tau * sample_rate))`. Returns 1.0 (instant) when
/// either argument is non-positive.
#[inline]
pub fn smoothing_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    if time_ms <= 0.0 || sample_rate <= 0.0 {
        1.0
    } else {
        1.0 - expf(-1000.0 / (time_ms * sample_rate))
    }
}

/// One-pole coefficient for a smoother that is advanced once per block of
/// `block_len` samples: `1 - exp(-block_len / (tau * sample_rate))`.
#[inline]
pub fn block_coeff(time_ms: f32, sample_rate: f32, block_len: usize) -> f32 {
    if time_ms <= 0.0 || sample_rate <= 0.0 {
        1.0
    } else {
        1.0 - expf(-(block_len as f32) * 1000.0 / (time_ms * sample_rate))
    }
}

/// Loop gain for a delay of `delay_samples` that decays by 60 dB in
/// `rt60_secs`: `10^(-3 * delay / (rt60 * sample_rate))`.
///
/// Always strictly below 1.0 for a positive delay and finite decay time.
#[inline]
pub fn rt60_gain(delay_samples: f32, rt60_secs: f32, sample_rate: f32) -> f32 {
    const NEG_3_LN_10: f32 = -3.0 * core::f32::consts::LN_10;
    expf(NEG_3_LN_10 * delay_samples / (rt60_secs * sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_roundtrip() {
        let back = db_to_linear(linear_to_db(0.5));
        assert!((back - 0.5).abs() < 1e-5, "got {back}");
    }

    #[test]
    fn linear_to_db_floors_silence() {
        assert!(linear_to_db(0.0) <= -199.0);
    }

    #[test]
    fn flush_denormal_zeroes_tiny_values() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(-1e-25), 0.0);
        assert_eq!(flush_denormal(1e-3), 1e-3);
    }

    #[test]
    fn soft_knee_is_continuous_at_knee() {
        let knee = 0.75;
        let below = soft_knee(knee - 1e-4, knee);
        let above = soft_knee(knee + 1e-4, knee);
        assert!((above - below).abs() < 5e-4);
        assert!(soft_knee(100.0, knee) < 1.0);
        assert_eq!(soft_knee(-0.3, knee), 0.0);
    }

    #[test]
    fn soft_limit_stays_below_ceiling() {
        for &x in &[0.5f32, 0.95, 1.5, 10.0, -10.0, 1e6] {
            let y = soft_limit(x, 0.9, 1.0);
            assert!(y.abs() < 1.0 || x.abs() <= 0.9, "x={x} y={y}");
            assert_eq!(y.signum(), x.signum());
        }
        assert_eq!(soft_limit(0.3, 0.9, 1.0), 0.3);
    }

    #[test]
    fn saturated_limiters_stay_under_their_ceilings() {
        // tanhf and expf round to exactly 1.0 long before these inputs.
        for &x in &[20.0f32, 1e3, f32::MAX] {
            assert!(soft_knee(x, 0.5) < 1.0, "soft_knee({x})");
            assert!(soft_limit(x, 0.85, 0.95) < 0.95, "soft_limit({x})");
            assert!(soft_limit(-x, 0.85, 0.95) > -0.95, "soft_limit(-{x})");
        }
        assert!(soft_limit(f32::MAX, 0.85, 0.95) > 0.949);
    }

    #[test]
    fn smoothing_coeff_instant_for_zero_time() {
        assert_eq!(smoothing_coeff(0.0, 48000.0), 1.0);
        let c = smoothing_coeff(10.0, 48000.0);
        assert!(c > 0.0 && c < 0.01);
    }

    #[test]
    fn block_coeff_matches_repeated_sample_coeff() {
        let per_sample = smoothing_coeff(50.0, 48000.0);
        let block = block_coeff(50.0, 48000.0, 64);
        let repeated = 1.0 - (1.0 - per_sample).powi(64);
        assert!((block - repeated).abs() < 1e-4, "{block} vs {repeated}");
    }

    #[test]
    fn rt60_gain_reaches_minus_60_db() {
        let sr = 48000.0;
        let delay = 1000.0;
        let rt60 = 2.0;
        let g = rt60_gain(delay, rt60, sr);
        assert!(g < 1.0);
        // Number of round trips in rt60 seconds.
        let trips = rt60 * sr / delay;
        let db = linear_to_db(g.powf(trips));
        assert!((db + 60.0).abs() < 0.1, "got {db} dB");
    }
}
