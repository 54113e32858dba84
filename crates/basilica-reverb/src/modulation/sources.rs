//! Block-rate modulation sources.
//!
//! Every source advances once per audio block and exposes one or more axes.
//! [`SourceBank`] owns one instance of each and flattens their axes into a
//! fixed array indexed by [`SourceKind::axis_offset`] + axis.

use core::f32::consts::TAU;
use core::fmt;
use core::str::FromStr;

use basilica_core::{EnvelopeFollower, lerp, soft_clip, soft_knee};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::EngineError;

/// Number of user LFOs.
pub const LFO_COUNT: usize = 4;
/// Total axes across all sources.
pub const SOURCE_AXES: usize = 11;

/// Knee of the unipolar sources' output shaper.
const LEVEL_KNEE: f32 = 0.8;

// ── SourceKind ──────────────────────────────────────────────────────────────

/// Modulation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Lorenz attractor, axes x/y/z in [-1, 1].
    ChaosAttractor,
    /// Reflected random walk in [-1, 1].
    BrownianWalk,
    /// Input RMS envelope in [0, 1].
    AudioFollower,
    /// Transient-aware input envelope in [0, 1].
    EnvelopeTracker,
    /// User LFOs, one axis per LFO, in [-1, 1].
    Lfo,
    /// Damped spring pushed by the input level, in (-1, 1).
    SpringMass,
}

impl SourceKind {
    /// Every source, in axis order.
    pub const ALL: [SourceKind; 6] = [
        Self::ChaosAttractor,
        Self::BrownianWalk,
        Self::AudioFollower,
        Self::EnvelopeTracker,
        Self::Lfo,
        Self::SpringMass,
    ];

    /// Number of axes this source provides.
    pub const fn axes(self) -> usize {
        match self {
            Self::ChaosAttractor => 3,
            Self::Lfo => LFO_COUNT,
            Self::BrownianWalk
            | Self::AudioFollower
            | Self::EnvelopeTracker
            | Self::SpringMass => 1,
        }
    }

    /// Index of axis 0 in the flattened source array.
    pub const fn axis_offset(self) -> usize {
        match self {
            Self::ChaosAttractor => 0,
            Self::BrownianWalk => 3,
            Self::AudioFollower => 4,
            Self::EnvelopeTracker => 5,
            Self::Lfo => 6,
            Self::SpringMass => 10,
        }
    }

    /// Lowercase name used in configs and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChaosAttractor => "chaos",
            Self::BrownianWalk => "brownian",
            Self::AudioFollower => "follower",
            Self::EnvelopeTracker => "tracker",
            Self::Lfo => "lfo",
            Self::SpringMass => "spring",
        }
    }

    /// Whether the source is unipolar ([0, 1]).
    pub const fn is_unipolar(self) -> bool {
        matches!(self, Self::AudioFollower | Self::EnvelopeTracker)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EngineError::UnknownSource(s.to_string()))
    }
}

// ── Chaos ───────────────────────────────────────────────────────────────────

/// Lorenz system (σ = 10, ρ = 28, β = 8/3), ten Euler steps per block.
#[derive(Debug, Clone)]
pub struct LorenzAttractor {
    state: [f32; 3],
    initial: [f32; 3],
}

impl LorenzAttractor {
    const SIGMA: f32 = 10.0;
    const RHO: f32 = 28.0;
    const BETA: f32 = 8.0 / 3.0;
    const DT: f32 = 0.001;
    const STEPS: usize = 10;

    /// Starts near the origin, perturbed by `rng`.
    pub fn new(rng: &mut ChaCha8Rng) -> Self {
        let initial = [
            0.1 + rng.random_range(-0.01..0.01),
            rng.random_range(-0.01..0.01),
            rng.random_range(-0.01..0.01),
        ];
        Self {
            state: initial,
            initial,
        }
    }

    /// Integrates one block and returns the scaled axes.
    pub fn advance(&mut self) -> [f32; 3] {
        for _ in 0..Self::STEPS {
            let [x, y, z] = self.state;
            let dx = Self::SIGMA * (y - x);
            let dy = x * (Self::RHO - z) - y;
            let dz = x * y - Self::BETA * z;
            self.state = [x + dx * Self::DT, y + dy * Self::DT, z + dz * Self::DT];
        }
        if self.state.iter().any(|v| !v.is_finite()) {
            self.state = self.initial;
        }
        self.output()
    }

    /// Current axes without advancing.
    pub fn output(&self) -> [f32; 3] {
        let [x, y, z] = self.state;
        [
            (x / 20.0).clamp(-1.0, 1.0),
            (y / 20.0).clamp(-1.0, 1.0),
            ((z - 25.0) / 25.0).clamp(-1.0, 1.0),
        ]
    }

    /// Returns to the seeded start point.
    pub fn reset(&mut self) {
        self.state = self.initial;
    }

    #[cfg(test)]
    fn poison(&mut self) {
        self.state = [f32::NAN; 3];
    }
}

// ── Brownian ────────────────────────────────────────────────────────────────

/// Damped random walk reflected at ±1.
#[derive(Debug, Clone)]
pub struct BrownianWalk {
    position: f32,
    velocity: f32,
}

impl BrownianWalk {
    const DAMPING: f32 = 0.65;
    const STEP: f32 = 0.03;
    const BOUNCE: f32 = -0.5;

    /// Starts at rest in the middle.
    pub fn new() -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
        }
    }

    /// One block step.
    pub fn advance(&mut self, rng: &mut ChaCha8Rng) -> f32 {
        self.velocity = Self::DAMPING * self.velocity + rng.random_range(-Self::STEP..=Self::STEP);
        self.position += self.velocity;
        if self.position > 1.0 {
            self.position = 2.0 - self.position;
            self.velocity *= Self::BOUNCE;
        } else if self.position < -1.0 {
            self.position = -2.0 - self.position;
            self.velocity *= Self::BOUNCE;
        }
        self.position = self.position.clamp(-1.0, 1.0);
        self.position
    }

    /// Current position.
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Back to rest at 0.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for BrownianWalk {
    fn default() -> Self {
        Self::new()
    }
}

// ── Audio-reactive ──────────────────────────────────────────────────────────

/// Block RMS → attack/release follower → gain 2 → soft knee.
#[derive(Debug, Clone)]
pub struct AudioFollower {
    follower: EnvelopeFollower,
}

impl AudioFollower {
    const GAIN: f32 = 2.0;

    /// 10 ms attack, 150 ms release.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::with_times(sample_rate, 10.0, 150.0),
        }
    }

    /// Advances by one block of measured RMS.
    pub fn advance(&mut self, rms: f32, block_len: usize) -> f32 {
        let env = self.follower.process_level(rms, block_len);
        soft_knee(env * Self::GAIN, LEVEL_KNEE)
    }

    /// Zeroes the envelope.
    pub fn reset(&mut self) {
        self.follower.reset();
    }
}

/// Peak/RMS blend with a faster attack on transients.
#[derive(Debug, Clone)]
pub struct EnvelopeTracker {
    follower: EnvelopeFollower,
}

impl EnvelopeTracker {
    const GAIN: f32 = 2.5;
    const TRANSIENT_RATIO: f32 = 2.0;
    const TRANSIENT_FLOOR: f32 = 0.01;
    const FAST_ATTACK_MS: f32 = 5.0;
    const ATTACK_MS: f32 = 20.0;
    const RELEASE_MS: f32 = 300.0;

    /// 20 ms attack (5 ms on transients), 300 ms release.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::with_times(sample_rate, Self::ATTACK_MS, Self::RELEASE_MS),
        }
    }

    /// Advances by one block given its peak and RMS.
    pub fn advance(&mut self, peak: f32, rms: f32, block_len: usize) -> f32 {
        let level = 0.6 * peak + 0.4 * rms;
        let env = self.follower.level();
        let attack = if level > Self::TRANSIENT_RATIO * env && level > Self::TRANSIENT_FLOOR {
            Self::FAST_ATTACK_MS
        } else {
            Self::ATTACK_MS
        };
        if (self.follower.attack_ms() - attack).abs() > f32::EPSILON {
            self.follower.set_attack_ms(attack);
        }
        let env = self.follower.process_level(level, block_len);
        soft_knee(env * Self::GAIN, LEVEL_KNEE)
    }

    /// Zeroes the envelope.
    pub fn reset(&mut self) {
        self.follower.reset();
    }
}

// ── Spring ──────────────────────────────────────────────────────────────────

/// Mass on a damped spring, pushed by the block RMS of the input.
///
/// Integrated with semi-implicit Euler (velocity first, then position) in
/// sub-steps of at most 1 ms, so the response does not depend on block
/// size. Position is held inside ±10 and leaves through [`soft_clip`].
/// Loud passages push the mass out; when the input stops it swings back
/// through zero before settling.
#[derive(Debug, Clone)]
pub struct SpringMass {
    stiffness: f32,
    mass: f32,
    damping: f32,
    position: f32,
    velocity: f32,
}

impl SpringMass {
    const STIFFNESS: f32 = 40.0;
    const MASS: f32 = 1.0;
    const DAMPING: f32 = 2.0;
    const DRIVE: f32 = 60.0;
    const MAX_STEP_SECS: f32 = 0.001;
    const LIMIT: f32 = 10.0;

    /// Roughly 1 Hz, damping ratio about 0.16.
    pub fn new() -> Self {
        Self::with_physics(Self::STIFFNESS, Self::MASS, Self::DAMPING)
    }

    /// Custom stiffness `k`, mass `m` and damping `c`. `k` and `m` are
    /// floored at 0.01 and `c` at 0.
    pub fn with_physics(stiffness: f32, mass: f32, damping: f32) -> Self {
        Self {
            stiffness: stiffness.max(0.01),
            mass: mass.max(0.01),
            damping: damping.max(0.0),
            position: 0.0,
            velocity: 0.0,
        }
    }

    /// Advances by one block driven by `rms` and returns the shaped position.
    pub fn advance(&mut self, rms: f32, block_len: usize, sample_rate: f32) -> f32 {
        let force = if rms.is_finite() { Self::DRIVE * rms } else { 0.0 };
        let span = block_len as f32 / sample_rate;
        let steps = libm::ceilf(span / Self::MAX_STEP_SECS).max(1.0);
        let dt = span / steps;
        for _ in 0..steps as usize {
            let accel =
                (-self.stiffness * self.position - self.damping * self.velocity + force) / self.mass;
            self.velocity += accel * dt;
            self.position = (self.position + self.velocity * dt).clamp(-Self::LIMIT, Self::LIMIT);
        }
        if !self.position.is_finite() || !self.velocity.is_finite() {
            self.reset();
        }
        self.output()
    }

    /// Shaped position without advancing.
    pub fn output(&self) -> f32 {
        soft_clip(self.position)
    }

    /// Back to rest at 0.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
    }
}

impl Default for SpringMass {
    fn default() -> Self {
        Self::new()
    }
}

// ── LFO ─────────────────────────────────────────────────────────────────────

/// LFO waveform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LfoShape {
    /// Sine.
    #[default]
    Sine,
    /// Symmetric triangle.
    Triangle,
    /// Rising ramp.
    SawUp,
    /// Falling ramp.
    SawDown,
    /// Pulse with configurable width.
    Square,
    /// New random level each cycle, held.
    RandomHold,
    /// Linear glide between random levels, one per cycle.
    SmoothRandom,
    /// Triangle with a movable apex.
    SkewedTriangle,
}

impl LfoShape {
    /// Every shape.
    pub const ALL: [LfoShape; 8] = [
        Self::Sine,
        Self::Triangle,
        Self::SawUp,
        Self::SawDown,
        Self::Square,
        Self::RandomHold,
        Self::SmoothRandom,
        Self::SkewedTriangle,
    ];

    /// Kebab-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::SawUp => "saw-up",
            Self::SawDown => "saw-down",
            Self::Square => "square",
            Self::RandomHold => "random-hold",
            Self::SmoothRandom => "smooth-random",
            Self::SkewedTriangle => "skewed-triangle",
        }
    }
}

impl fmt::Display for LfoShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LfoShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|shape| shape.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| s.to_string())
    }
}

/// Settings for one user LFO.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoConfig {
    /// Waveform.
    pub shape: LfoShape,
    /// Rate in Hz, 0.01..=20.
    pub rate_hz: f32,
    /// Square duty cycle, 0.05..=0.95.
    pub pulse_width: f32,
    /// Skewed-triangle apex position, 0.05..=0.95.
    pub skew: f32,
    /// Phase offset in cycles, 0..1.
    pub phase_offset: f32,
}

impl LfoConfig {
    /// Slowest accepted rate.
    pub const MIN_RATE_HZ: f32 = 0.01;
    /// Fastest accepted rate.
    pub const MAX_RATE_HZ: f32 = 20.0;

    /// A config with the given shape and rate and neutral shaping.
    pub fn new(shape: LfoShape, rate_hz: f32) -> Self {
        Self {
            shape,
            rate_hz,
            pulse_width: 0.5,
            skew: 0.5,
            phase_offset: 0.0,
        }
        .sanitized()
    }

    /// Factory settings for slot `index`.
    pub fn factory(index: usize) -> Self {
        match index {
            0 => Self::new(LfoShape::Sine, 0.05),
            1 => Self::new(LfoShape::Triangle, 0.10),
            2 => Self::new(LfoShape::SawUp, 0.20),
            _ => Self::new(LfoShape::SawDown, 0.35),
        }
    }

    /// Clamps every field into its accepted range. Non-finite fields fall
    /// back to their neutral values.
    pub fn sanitized(self) -> Self {
        let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        Self {
            shape: self.shape,
            rate_hz: finite_or(self.rate_hz, 0.1).clamp(Self::MIN_RATE_HZ, Self::MAX_RATE_HZ),
            pulse_width: finite_or(self.pulse_width, 0.5).clamp(0.05, 0.95),
            skew: finite_or(self.skew, 0.5).clamp(0.05, 0.95),
            phase_offset: {
                let p = finite_or(self.phase_offset, 0.0);
                p - libm::floorf(p)
            },
        }
    }
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self::new(LfoShape::Sine, 0.1)
    }
}

/// Block-rate phase accumulator behind one user LFO.
#[derive(Debug, Clone)]
pub struct BlockLfo {
    phase: f32,
    random_start: f32,
    random_target: f32,
}

impl BlockLfo {
    /// Starts at phase 0 with random levels drawn from `rng`.
    pub fn new(rng: &mut ChaCha8Rng) -> Self {
        Self {
            phase: 0.0,
            random_start: rng.random_range(-1.0..=1.0),
            random_target: rng.random_range(-1.0..=1.0),
        }
    }

    /// Value at the current phase, then advances by one block.
    pub fn advance(
        &mut self,
        config: &LfoConfig,
        block_len: usize,
        sample_rate: f32,
        rng: &mut ChaCha8Rng,
    ) -> f32 {
        let mut p = self.phase + config.phase_offset;
        p -= libm::floorf(p);
        let value = match config.shape {
            LfoShape::Sine => libm::sinf(TAU * p),
            LfoShape::Triangle => 2.0 * (2.0 * p - 1.0).abs() - 1.0,
            LfoShape::SawUp => 2.0 * p - 1.0,
            LfoShape::SawDown => 1.0 - 2.0 * p,
            LfoShape::Square => {
                if p < config.pulse_width {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::RandomHold => self.random_target,
            LfoShape::SmoothRandom => lerp(self.random_start, self.random_target, p),
            LfoShape::SkewedTriangle => {
                let skew = config.skew;
                if p < skew {
                    (p / skew) * 2.0 - 1.0
                } else {
                    1.0 - ((p - skew) / (1.0 - skew)) * 2.0
                }
            }
        };

        self.phase += config.rate_hz * block_len as f32 / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= libm::floorf(self.phase);
            self.random_start = self.random_target;
            self.random_target = rng.random_range(-1.0..=1.0);
        }
        value.clamp(-1.0, 1.0)
    }

    /// Current phase in cycles.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Back to phase 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

// ── SourceBank ──────────────────────────────────────────────────────────────

/// One instance of every source, advanced together once per block.
#[derive(Debug, Clone)]
pub struct SourceBank {
    sample_rate: f32,
    seed: u64,
    rng: ChaCha8Rng,
    chaos: LorenzAttractor,
    brownian: BrownianWalk,
    follower: AudioFollower,
    tracker: EnvelopeTracker,
    lfos: [BlockLfo; LFO_COUNT],
    spring: SpringMass,
    values: [f32; SOURCE_AXES],
}

impl SourceBank {
    /// Creates all sources with a deterministic seed.
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let chaos = LorenzAttractor::new(&mut rng);
        let lfos = core::array::from_fn(|_| BlockLfo::new(&mut rng));
        Self {
            sample_rate,
            seed,
            rng,
            chaos,
            brownian: BrownianWalk::new(),
            follower: AudioFollower::new(sample_rate),
            tracker: EnvelopeTracker::new(sample_rate),
            lfos,
            spring: SpringMass::new(),
            values: [0.0; SOURCE_AXES],
        }
    }

    /// Advances every source by one block of input and returns the
    /// flattened axis values.
    pub fn process(
        &mut self,
        left: &[f32],
        right: &[f32],
        lfos: &[LfoConfig; LFO_COUNT],
    ) -> &[f32; SOURCE_AXES] {
        let len = left.len();
        if len == 0 {
            return &self.values;
        }
        let (peak, rms) = block_levels(left, right);

        let chaos = self.chaos.advance();
        let base = SourceKind::ChaosAttractor.axis_offset();
        self.values[base..base + 3].copy_from_slice(&chaos);

        self.values[SourceKind::BrownianWalk.axis_offset()] = self.brownian.advance(&mut self.rng);
        self.values[SourceKind::AudioFollower.axis_offset()] = self.follower.advance(rms, len);
        self.values[SourceKind::EnvelopeTracker.axis_offset()] =
            self.tracker.advance(peak, rms, len);

        let base = SourceKind::Lfo.axis_offset();
        for (i, (lfo, config)) in self.lfos.iter_mut().zip(lfos).enumerate() {
            self.values[base + i] = lfo.advance(config, len, self.sample_rate, &mut self.rng);
        }

        self.values[SourceKind::SpringMass.axis_offset()] =
            self.spring.advance(rms, len, self.sample_rate);
        &self.values
    }

    /// Values produced by the last block.
    pub fn values(&self) -> &[f32; SOURCE_AXES] {
        &self.values
    }

    /// Returns every source to its seeded state.
    pub fn reset(&mut self) {
        *self = Self::new(self.sample_rate, self.seed);
    }
}

/// Peak and RMS over both channels of a block.
fn block_levels(left: &[f32], right: &[f32]) -> (f32, f32) {
    let mut peak = 0.0f32;
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for &x in left.iter().chain(right) {
        peak = peak.max(x.abs());
        sum += x * x;
        count += 1;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    (peak, libm::sqrtf(sum / count as f32))
}
