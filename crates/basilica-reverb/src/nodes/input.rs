//! Input conditioning: DC removal and a ramped input gain.

use basilica_core::{DcBlocker, LinearSmoothedParam, db_to_linear};

/// DC high-pass cutoff.
const DC_CUTOFF_HZ: f32 = 20.0;
/// Input gain changes ramp linearly over this time.
const GAIN_RAMP_MS: f32 = 20.0;
/// Accepted input gain range.
pub const INPUT_GAIN_RANGE_DB: (f32, f32) = (-48.0, 24.0);

/// First node of every graph.
#[derive(Debug, Clone)]
pub struct InputStage {
    dc: [DcBlocker; 2],
    gain: LinearSmoothedParam,
    gain_db: f32,
}

impl InputStage {
    /// Creates the stage with `gain_db` already applied.
    pub fn new(sample_rate: f32, gain_db: f32) -> Self {
        let gain_db = clamp_gain_db(gain_db);
        Self {
            dc: [
                DcBlocker::new(sample_rate, DC_CUTOFF_HZ),
                DcBlocker::new(sample_rate, DC_CUTOFF_HZ),
            ],
            gain: LinearSmoothedParam::with_config(db_to_linear(gain_db), sample_rate, GAIN_RAMP_MS),
            gain_db,
        }
    }

    /// Ramps toward a new gain. Non-finite values are ignored.
    pub fn set_gain_db(&mut self, gain_db: f32) {
        if !gain_db.is_finite() {
            return;
        }
        let gain_db = clamp_gain_db(gain_db);
        if (gain_db - self.gain_db).abs() > f32::EPSILON {
            self.gain_db = gain_db;
            self.gain.set_target(db_to_linear(gain_db));
        }
    }

    /// Target gain in dB.
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Processes a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let [dc_l, dc_r] = &mut self.dc;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let g = self.gain.advance();
            *l = dc_l.process(*l) * g;
            *r = dc_r.process(*r) * g;
        }
    }

    /// Clears filter state and lands the gain on its target.
    pub fn reset(&mut self) {
        for dc in &mut self.dc {
            dc.reset();
        }
        self.gain.snap_to_target();
    }
}

fn clamp_gain_db(gain_db: f32) -> f32 {
    gain_db.clamp(INPUT_GAIN_RANGE_DB.0, INPUT_GAIN_RANGE_DB.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_dc() {
        let mut stage = InputStage::new(48000.0, 0.0);
        let mut l = vec![0.5f32; 48000];
        let mut r = vec![-0.5f32; 48000];
        stage.process(&mut l, &mut r);
        assert!(l[47999].abs() < 1e-3);
        assert!(r[47999].abs() < 1e-3);
    }

    #[test]
    fn gain_ramps_over_twenty_ms() {
        let mut stage = InputStage::new(48000.0, 0.0);
        stage.set_gain_db(-6.0);
        let mut l = vec![0.0f32; 960];
        let mut r = vec![0.0f32; 960];
        // Impulses at the start and after the ramp measure the gain path.
        l[0] = 1.0;
        l[959] = 1.0;
        stage.process(&mut l, &mut r);
        assert!(l[0] > 0.9);
        let settled = db_to_linear(-6.0);
        assert!((l[959] - settled).abs() < 0.01, "gain {}", l[959]);
    }

    #[test]
    fn non_finite_gain_ignored() {
        let mut stage = InputStage::new(48000.0, -3.0);
        stage.set_gain_db(f32::NAN);
        assert_eq!(stage.gain_db(), -3.0);
        stage.set_gain_db(100.0);
        assert_eq!(stage.gain_db(), INPUT_GAIN_RANGE_DB.1);
    }
}
