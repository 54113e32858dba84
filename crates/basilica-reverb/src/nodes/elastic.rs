//! Elastic hall: room-mode resonances whose tuning bends under pressure.

use basilica_core::{Biquad, BiquadCoefficients, ParamId, ParameterBufferPool, block_coeff};

/// Number of room modes.
pub const MODES: usize = 8;
/// Half the speed of sound, m/s.
const HALF_SPEED_OF_SOUND: f32 = 171.5;
/// Room dimensions in metres.
const ROOM: [f32; 3] = [10.0, 5.0, 15.0];
const MODE_INDICES: [[f32; 3]; MODES] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [2.0, 0.0, 0.0],
];
const MODE_Q: f32 = 5.0;
/// Largest relative frequency shift at full elasticity.
pub const MAX_DEFORMATION: f32 = 0.2;
const PRESSURE_ALPHA: f32 = 0.1;
const PRESSURE_SCALE: f32 = 2.0;
const DEFORM_ATTACK_MS: f32 = 50.0;
const RECOVERY_MS: f32 = 2500.0;
/// Coefficients are recomputed once a mode moves further than this.
const RETUNE_THRESHOLD_HZ: f32 = 0.5;

/// Axial, tangential and oblique mode frequencies of the room.
pub fn room_modes() -> [f32; MODES] {
    MODE_INDICES.map(|n| {
        let sum: f32 = n
            .iter()
            .zip(ROOM)
            .map(|(&k, dim)| (k / dim) * (k / dim))
            .sum();
        HALF_SPEED_OF_SOUND * libm::sqrtf(sum)
    })
}

/// Resonant modes of a 10 × 5 × 15 m room added on top of the dry signal.
///
/// Block RMS pressure pushes modes away from their rest tuning, alternately
/// down and up, by up to `0.2 · elasticity`. The walls then relax back over
/// about 2.5 s.
#[derive(Debug, Clone)]
pub struct ElasticHall {
    sample_rate: f32,
    rest: [f32; MODES],
    tuned: [f32; MODES],
    gains: [f32; MODES],
    filters: [[Biquad; MODES]; 2],
    pressure: f32,
    deformation: f32,
}

impl ElasticHall {
    /// Creates the hall at rest.
    pub fn new(sample_rate: f32) -> Self {
        let rest = room_modes();
        let filters = core::array::from_fn(|_| {
            core::array::from_fn(|m| {
                Biquad::with_coefficients(BiquadCoefficients::bandpass(rest[m], MODE_Q, sample_rate))
            })
        });
        Self {
            sample_rate,
            rest,
            tuned: rest,
            gains: rest.map(|f| 0.15 / (1.0 + f / 500.0)),
            filters,
            pressure: 0.0,
            deformation: 0.0,
        }
    }

    /// Current mode frequencies in Hz.
    pub fn mode_frequencies(&self) -> &[f32; MODES] {
        &self.tuned
    }

    /// Current relative deformation in [0, 0.2].
    pub fn deformation(&self) -> f32 {
        self.deformation
    }

    /// Processes a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        let len = left.len();
        if len == 0 {
            return;
        }
        self.update_deformation(left, right, params.buffer(ParamId::Elasticity).last());

        let [bank_l, bank_r] = &mut self.filters;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (x_l, x_r) = (*l, *r);
            let mut acc_l = 0.0;
            let mut acc_r = 0.0;
            for m in 0..MODES {
                acc_l += bank_l[m].process(x_l) * self.gains[m];
                acc_r += bank_r[m].process(x_r) * self.gains[m];
            }
            *l = x_l + acc_l;
            *r = x_r + acc_r;
        }
    }

    fn update_deformation(&mut self, left: &[f32], right: &[f32], elasticity: f32) {
        let len = left.len();
        let energy: f32 = left.iter().chain(right).map(|s| s * s).sum();
        let rms = libm::sqrtf(energy / (2 * len) as f32);
        if rms.is_finite() {
            self.pressure += (rms - self.pressure) * PRESSURE_ALPHA;
        }
        let target = (self.pressure * PRESSURE_SCALE).clamp(0.0, 1.0)
            * MAX_DEFORMATION
            * elasticity.clamp(0.0, 1.0);
        let time_ms = if target > self.deformation {
            DEFORM_ATTACK_MS
        } else {
            RECOVERY_MS
        };
        self.deformation += (target - self.deformation) * block_coeff(time_ms, self.sample_rate, len);

        for m in 0..MODES {
            let sign = if m % 2 == 0 { -1.0 } else { 1.0 };
            let freq = self.rest[m] * (1.0 + sign * self.deformation);
            if (freq - self.tuned[m]).abs() > RETUNE_THRESHOLD_HZ {
                self.tuned[m] = freq;
                let coeffs = BiquadCoefficients::bandpass(freq, MODE_Q, self.sample_rate);
                self.filters[0][m].set_coefficients(coeffs);
                self.filters[1][m].set_coefficients(coeffs);
            }
        }
    }

    /// Clears filter state and relaxes the walls.
    pub fn reset(&mut self) {
        for bank in &mut self.filters {
            for f in bank {
                f.clear();
            }
        }
        self.pressure = 0.0;
        self.deformation = 0.0;
    }
}
