//! Slow modulated delay that makes the tail drift in pitch and position.

use basilica_core::{DelayLine, ParamId, ParameterBufferPool, lerp, wet_dry_mix};
use core::f32::consts::{FRAC_PI_2, TAU};

const BASE_DELAY_MS: f32 = 15.0;
const DEPTH_MS: f32 = 5.0;
const DEPTH_SCALE: (f32, f32) = (0.25, 1.2);
const MIX_RANGE: (f32, f32) = (0.1, 0.4);
const RATE_RANGE_HZ: (f32, f32) = (0.02, 0.2);

/// Modulated delay, 15 ms ± up to 6 ms. Left and right sweep in quadrature.
///
/// `warp` sets depth and mix, `drift` sets the LFO rate.
#[derive(Debug, Clone)]
pub struct Wander {
    sample_rate: f32,
    lines: [DelayLine; 2],
    phase: f32,
    base_delay: f32,
    depth: f32,
}

impl Wander {
    /// Allocates lines for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let max_secs = (BASE_DELAY_MS + DEPTH_MS * DEPTH_SCALE.1) * 0.001 + 0.001;
        Self {
            sample_rate,
            lines: [
                DelayLine::from_time(sample_rate, max_secs),
                DelayLine::from_time(sample_rate, max_secs),
            ],
            phase: 0.0,
            base_delay: BASE_DELAY_MS * 0.001 * sample_rate,
            depth: DEPTH_MS * 0.001 * sample_rate,
        }
    }

    /// LFO phase in cycles.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Processes a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        let warp = params.buffer(ParamId::Warp);
        let drift = params.buffer(ParamId::Drift);
        let [line_l, line_r] = &mut self.lines;
        let inv_sr = 1.0 / self.sample_rate;

        for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let w = warp.get(n).clamp(0.0, 1.0);
            let rate = lerp(RATE_RANGE_HZ.0, RATE_RANGE_HZ.1, drift.get(n).clamp(0.0, 1.0));
            let depth = self.depth * lerp(DEPTH_SCALE.0, DEPTH_SCALE.1, w);
            let mix = lerp(MIX_RANGE.0, MIX_RANGE.1, w);

            let angle = TAU * self.phase;
            let delayed_l = line_l.read(self.base_delay + depth * libm::sinf(angle));
            let delayed_r = line_r.read(self.base_delay + depth * libm::sinf(angle + FRAC_PI_2));
            line_l.write(*l);
            line_r.write(*r);
            *l = wet_dry_mix(*l, delayed_l, mix);
            *r = wet_dry_mix(*r, delayed_r, mix);

            self.phase += rate * inv_sr;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }

    /// Clears both lines. The LFO phase is kept.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(warp: f32, drift: f32, block: usize) -> ParameterBufferPool {
        let mut pool = ParameterBufferPool::new(block);
        pool.set_constant(ParamId::Warp, warp, block);
        pool.set_constant(ParamId::Drift, drift, block);
        pool
    }

    #[test]
    fn delays_impulse_by_about_fifteen_ms() {
        let block = 2048;
        let mut wander = Wander::new(48000.0);
        let mut l = vec![0.0f32; block];
        let mut r = vec![0.0f32; block];
        l[0] = 1.0;
        wander.process(&mut l, &mut r, &pool(0.0, 0.0, block));
        assert!((l[0] - 0.9).abs() < 1e-6, "dry share {}", l[0]);
        let peak = l[1..]
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &v)| if v > best.1 { (i + 1, v) } else { best });
        assert!((peak.0 as i32 - 720).unsigned_abs() < 80, "echo at {}", peak.0);
    }

    #[test]
    fn warp_raises_mix() {
        let block = 64;
        let mut wander = Wander::new(48000.0);
        let mut l = vec![1.0f32; block];
        let mut r = vec![1.0f32; block];
        wander.process(&mut l, &mut r, &pool(1.0, 0.5, block));
        assert!((l[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn drift_sets_lfo_rate() {
        let sr = 1000.0;
        let mut wander = Wander::new(sr);
        let mut l = vec![0.0f32; 1000];
        let mut r = vec![0.0f32; 1000];
        wander.process(&mut l, &mut r, &pool(0.0, 1.0, 1000));
        assert!((wander.phase() - 0.2).abs() < 1e-3);
    }
}
