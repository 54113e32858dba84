//! Output stage: air shelf, stereo width and a soft ceiling.

use basilica_core::{OnePole, ParamId, ParameterBufferPool, lerp, soft_limit};

const AIR_SPLIT_HZ: f32 = 6500.0;
const AIR_GAIN_RANGE: (f32, f32) = (-0.3, 0.35);
const LIMIT_KNEE: f32 = 0.8;
/// Output magnitude never exceeds this.
pub const OUTPUT_CEILING: f32 = 1.0;

/// Last node of every graph.
///
/// `air` adds or removes content above 6.5 kHz, `width` scales the side
/// signal by `2 · width` (0 is mono, 0.5 unity).
#[derive(Debug, Clone)]
pub struct OutputStage {
    splits: [OnePole; 2],
}

impl OutputStage {
    /// Creates the stage.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            splits: [
                OnePole::new(sample_rate, AIR_SPLIT_HZ),
                OnePole::new(sample_rate, AIR_SPLIT_HZ),
            ],
        }
    }

    /// Processes a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        let air = params.buffer(ParamId::Air);
        let width = params.buffer(ParamId::Width);
        let [split_l, split_r] = &mut self.splits;

        for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let shelf = lerp(AIR_GAIN_RANGE.0, AIR_GAIN_RANGE.1, air.get(n).clamp(0.0, 1.0));
            let x_l = *l + split_l.process_highpass(*l) * shelf;
            let x_r = *r + split_r.process_highpass(*r) * shelf;

            let mid = 0.5 * (x_l + x_r);
            let side = 0.5 * (x_l - x_r) * 2.0 * width.get(n).clamp(0.0, 1.0);
            *l = soft_limit(mid + side, LIMIT_KNEE, OUTPUT_CEILING);
            *r = soft_limit(mid - side, LIMIT_KNEE, OUTPUT_CEILING);
        }
    }

    /// Clears the shelf filters.
    pub fn reset(&mut self) {
        for s in &mut self.splits {
            s.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(air: f32, width: f32, block: usize) -> ParameterBufferPool {
        let mut pool = ParameterBufferPool::new(block);
        pool.set_constant(ParamId::Air, air, block);
        pool.set_constant(ParamId::Width, width, block);
        pool
    }

    #[test]
    fn zero_width_is_mono() {
        let mut out = OutputStage::new(48000.0);
        let mut l = vec![0.4f32; 32];
        let mut r = vec![-0.2f32; 32];
        out.process(&mut l, &mut r, &pool(0.5, 0.0, 32));
        for (a, b) in l.iter().zip(&r) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn unity_width_preserves_low_frequency_image() {
        let mut out = OutputStage::new(48000.0);
        // DC has no air content once the split settles.
        let mut l = vec![0.4f32; 4800];
        let mut r = vec![-0.2f32; 4800];
        out.process(&mut l, &mut r, &pool(1.0, 0.5, 4800));
        assert!((l[4799] - 0.4).abs() < 1e-3);
        assert!((r[4799] + 0.2).abs() < 1e-3);
    }

    #[test]
    fn never_exceeds_ceiling() {
        let mut out = OutputStage::new(48000.0);
        let mut l: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 8.0 } else { -8.0 }).collect();
        let mut r = l.clone();
        out.process(&mut l, &mut r, &pool(1.0, 1.0, 256));
        assert!(l.iter().chain(&r).all(|v| v.abs() <= OUTPUT_CEILING));
    }
}
