//! Response curves applied to a source value before depth scaling.
//!
//! Every curve is odd-symmetric and maps [-1, 1] onto [-1, 1], so a curve
//! never changes the sign or the reach of a connection, only how it gets
//! there.

use core::fmt;
use core::str::FromStr;

/// Shape applied to a raw source value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModulationCurve {
    /// Identity.
    #[default]
    Linear,
    /// Slow start: `x²`.
    EaseIn,
    /// Fast start: `1 - (1 - x)²`.
    EaseOut,
    /// Smoothstep: `3x² - 2x³`.
    SCurve,
    /// Quantized to `n` levels per polarity (`n ≥ 1`).
    Steps(u8),
}

impl ModulationCurve {
    /// Applies the curve. Inputs are clamped to [-1, 1] first.
    #[inline]
    pub fn apply(self, value: f32) -> f32 {
        let x = value.clamp(-1.0, 1.0);
        let mag = x.abs();
        let shaped = match self {
            Self::Linear => return x,
            Self::EaseIn => mag * mag,
            Self::EaseOut => {
                let inv = 1.0 - mag;
                1.0 - inv * inv
            }
            Self::SCurve => mag * mag * (3.0 - 2.0 * mag),
            Self::Steps(n) => {
                let n = f32::from(n.max(1));
                libm::roundf(mag * n) / n
            }
        };
        if x < 0.0 { -shaped } else { shaped }
    }

    /// Short lowercase name (`"steps:4"` for stepped curves).
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseIn => "ease-in",
            Self::EaseOut => "ease-out",
            Self::SCurve => "s-curve",
            Self::Steps(_) => "steps",
        }
    }
}

impl fmt::Display for ModulationCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steps(n) => write!(f, "steps:{n}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for ModulationCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "linear" => Ok(Self::Linear),
            "ease-in" => Ok(Self::EaseIn),
            "ease-out" => Ok(Self::EaseOut),
            "s-curve" => Ok(Self::SCurve),
            other => other
                .strip_prefix("steps:")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|&n| n > 0)
                .map(Self::Steps)
                .ok_or_else(|| s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ModulationCurve; 5] = [
        ModulationCurve::Linear,
        ModulationCurve::EaseIn,
        ModulationCurve::EaseOut,
        ModulationCurve::SCurve,
        ModulationCurve::Steps(4),
    ];

    #[test]
    fn curves_are_odd_and_bounded() {
        for curve in ALL {
            for i in 0..=100 {
                let x = i as f32 / 50.0 - 1.0;
                let y = curve.apply(x);
                assert!((-1.0..=1.0).contains(&y), "{curve} at {x}");
                assert!((y + curve.apply(-x)).abs() < 1e-6, "{curve} not odd at {x}");
            }
            assert_eq!(curve.apply(1.0), 1.0);
            assert_eq!(curve.apply(0.0), 0.0);
        }
    }

    #[test]
    fn ease_in_lags_ease_out() {
        assert!(ModulationCurve::EaseIn.apply(0.5) < 0.5);
        assert!(ModulationCurve::EaseOut.apply(0.5) > 0.5);
    }

    #[test]
    fn steps_quantize() {
        assert_eq!(ModulationCurve::Steps(4).apply(0.3), 0.25);
        assert_eq!(ModulationCurve::Steps(0).apply(0.3), 0.0);
    }

    #[test]
    fn parse_roundtrip() {
        for curve in ALL {
            assert_eq!(curve.to_string().parse::<ModulationCurve>(), Ok(curve));
        }
        assert!("steps:0".parse::<ModulationCurve>().is_err());
        assert!("wobble".parse::<ModulationCurve>().is_err());
    }
}
