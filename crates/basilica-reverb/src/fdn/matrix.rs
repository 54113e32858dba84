//! 8×8 feedback mixing matrix.
//!
//! The matrix is a blend of two orthogonal bases:
//!
//! - `H`, the Sylvester Hadamard matrix scaled by 1/√8 (dense, all entries
//!   ±0.354, maximal inter-line diffusion)
//! - `K = I - (2/8)·11ᵀ`, the Householder reflection (diagonal-heavy,
//!   slower diffusion, a "warmer" build-up)
//!
//! `M = (1-w)·H + w·K`. A blend of two orthogonal matrices is not orthogonal,
//! so after blending every column is normalized to unit length and the
//! spectral norm is estimated by power iteration on `MᵀM`. If the estimate
//! exceeds 1 the whole matrix is rescaled. The loop therefore never gains
//! energy from mixing, whatever the warp.

/// Number of delay lines.
pub const LINES: usize = 8;

/// Relative headroom added to the power-iteration estimate, which converges
/// from below.
const NORM_MARGIN: f32 = 1e-3;
const POWER_ITERATIONS: usize = 48;
/// Warp changes smaller than this keep the current matrix.
const WARP_EPSILON: f32 = 1e-4;

type Matrix = [[f32; LINES]; LINES];

/// Warp-blended, norm-bounded mixing matrix.
#[derive(Debug, Clone)]
pub struct MixingMatrix {
    m: Matrix,
    warp: f32,
    norm: f32,
}

impl MixingMatrix {
    /// Pure Hadamard (warp 0).
    pub fn new() -> Self {
        let mut matrix = Self {
            m: hadamard(),
            warp: 0.0,
            norm: 1.0,
        };
        matrix.rebuild(0.0);
        matrix
    }

    /// Sets the blend toward the Householder basis, clamped to [0, 1].
    pub fn set_warp(&mut self, warp: f32) {
        let warp = if warp.is_finite() { warp.clamp(0.0, 1.0) } else { 0.0 };
        if (warp - self.warp).abs() >= WARP_EPSILON {
            self.rebuild(warp);
        }
    }

    /// Current warp.
    pub fn warp(&self) -> f32 {
        self.warp
    }

    /// Spectral-norm estimate after rescaling (≤ 1).
    pub fn spectral_norm(&self) -> f32 {
        self.norm
    }

    /// Entry at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.m[i][j]
    }

    /// `out = M · input`.
    #[inline]
    pub fn apply(&self, input: &[f32; LINES], out: &mut [f32; LINES]) {
        for (row, o) in self.m.iter().zip(out.iter_mut()) {
            *o = row.iter().zip(input).map(|(a, b)| a * b).sum();
        }
    }

    fn rebuild(&mut self, warp: f32) {
        let h = hadamard();
        let k = householder();
        let mut m = [[0.0f32; LINES]; LINES];
        for i in 0..LINES {
            for j in 0..LINES {
                m[i][j] = (1.0 - warp) * h[i][j] + warp * k[i][j];
            }
        }

        for j in 0..LINES {
            let len = libm::sqrtf((0..LINES).map(|i| m[i][j] * m[i][j]).sum());
            if len > 1e-9 {
                for row in &mut m {
                    row[j] /= len;
                }
            }
        }

        let bound = spectral_norm_estimate(&m) * (1.0 + NORM_MARGIN);
        if bound > 1.0 {
            for row in &mut m {
                for v in row.iter_mut() {
                    *v /= bound;
                }
            }
            self.norm = spectral_norm_estimate(&m);
        } else {
            self.norm = bound;
        }
        self.m = m;
        self.warp = warp;
    }
}

impl Default for MixingMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalized Sylvester Hadamard: `H[i][j] = (-1)^popcount(i & j) / √8`.
pub fn hadamard() -> Matrix {
    let scale = 1.0 / libm::sqrtf(LINES as f32);
    core::array::from_fn(|i| {
        core::array::from_fn(|j| {
            if (i & j).count_ones() % 2 == 0 {
                scale
            } else {
                -scale
            }
        })
    })
}

/// Householder reflection `I - (2/N)·11ᵀ`.
pub fn householder() -> Matrix {
    let c = 2.0 / LINES as f32;
    core::array::from_fn(|i| core::array::from_fn(|j| if i == j { 1.0 - c } else { -c }))
}

/// Largest singular value of `m`, by power iteration on `MᵀM`.
fn spectral_norm_estimate(m: &Matrix) -> f32 {
    let mut v: [f32; LINES] = core::array::from_fn(|i| 1.0 + 0.1 * i as f32);
    let mut lambda = 0.0f32;
    for _ in 0..POWER_ITERATIONS {
        let mut mv = [0.0f32; LINES];
        for i in 0..LINES {
            mv[i] = (0..LINES).map(|j| m[i][j] * v[j]).sum();
        }
        let mut w = [0.0f32; LINES];
        for j in 0..LINES {
            w[j] = (0..LINES).map(|i| m[i][j] * mv[i]).sum();
        }
        let len = libm::sqrtf(w.iter().map(|x| x * x).sum());
        if len < 1e-12 {
            return 0.0;
        }
        lambda = len;
        for (vi, wi) in v.iter_mut().zip(&w) {
            *vi = wi / len;
        }
    }
    libm::sqrtf(lambda)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_orthogonal(m: &Matrix) -> bool {
        for a in 0..LINES {
            for b in 0..LINES {
                let dot: f32 = (0..LINES).map(|i| m[i][a] * m[i][b]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                if (dot - expected).abs() > 1e-5 {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn bases_are_orthogonal() {
        assert!(is_orthogonal(&hadamard()));
        assert!(is_orthogonal(&householder()));
    }

    #[test]
    fn norm_bounded_across_warp() {
        let mut m = MixingMatrix::new();
        for step in 0..=20 {
            m.set_warp(step as f32 / 20.0);
            assert!(m.spectral_norm() <= 1.0 + 1e-5, "warp {} norm {}", m.warp(), m.spectral_norm());
            let signal: [f32; LINES] = core::array::from_fn(|i| if i % 3 == 0 { 1.0 } else { -0.5 });
            let mut out = [0.0; LINES];
            m.apply(&signal, &mut out);
            let e_in: f32 = signal.iter().map(|x| x * x).sum();
            let e_out: f32 = out.iter().map(|x| x * x).sum();
            assert!(e_out <= e_in * (1.0 + 1e-4), "mixing gained energy at warp {}", m.warp());
        }
    }

    #[test]
    fn pure_hadamard_preserves_energy() {
        let m = MixingMatrix::new();
        let signal = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut out = [0.0; LINES];
        m.apply(&signal, &mut out);
        let e: f32 = out.iter().map(|x| x * x).sum();
        assert!((e - 1.0).abs() < 0.01, "energy {e}");
        assert!(out.iter().all(|v| (v.abs() - 0.3535).abs() < 2e-3));
    }

    #[test]
    fn non_finite_warp_is_ignored() {
        let mut m = MixingMatrix::new();
        m.set_warp(f32::NAN);
        assert_eq!(m.warp(), 0.0);
    }
}
