//! Zipper-free parameter smoothing.
//!
//! Control values arrive in steps (automation points, modulation updated once
//! per block, preset recalls). Feeding a step straight into a delay time or a
//! feedback gain produces audible clicks and stepping. The smoothers here turn
//! each step into a continuous per-sample trajectory.
//!
//! - [`SmoothedParam`] - exponential approach (one-pole), monotonic for a step
//! - [`LinearSmoothedParam`] - constant-rate ramp that lands exactly on target
//!
//! Both expose [`fill`](SmoothedParam::fill), which writes a block's worth of
//! trajectory into a slice; [`ParameterBufferPool`](crate::ParameterBufferPool)
//! builds on it.

use crate::math::smoothing_coeff;

/// Exponentially smoothed parameter.
///
/// Each call to [`advance`](Self::advance) moves the current value a fixed
/// fraction of the remaining distance toward the target:
///
/// ```text
/// y[n] = y[n-1] + coeff * (target - y[n-1])
/// coeff = 1 - exp(-1 / (tau * sample_rate))
/// ```
///
/// For a single step the trajectory is monotonic and the largest per-sample
/// delta is `|step| * coeff`, taken on the first sample after the step.
///
/// # Example
///
/// ```rust
/// use basilica_core::SmoothedParam;
///
/// let mut p = SmoothedParam::with_config(0.0, 48000.0, 20.0);
/// p.set_target(1.0);
/// let first = p.advance();
/// assert!(first > 0.0 && first < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Tolerance under which the value counts as settled.
    pub const SETTLE_EPSILON: f32 = 1e-6;

    /// Creates an unsmoothed parameter (jumps instantly until configured).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Creates a parameter with a sample rate and time constant.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// 10 ms smoothing, used for bypass and crossfade envelopes.
    pub fn fast(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, 10.0)
    }

    /// Sets a new destination. The current value keeps its position.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jumps to `value` with no smoothing.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Updates the sample rate and recomputes the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Updates the time constant and recomputes the coefficient.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Time constant in milliseconds.
    pub fn smoothing_time_ms(&self) -> f32 {
        self.smoothing_time_ms
    }

    /// Per-sample coefficient in (0, 1].
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Advances one sample and returns the new value.
    ///
    /// Once `coeff * gap` drops below half an ulp of the current value the
    /// one-pole update rounds to no change; from there the value walks one
    /// ulp per sample so it always lands exactly on the target.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let next = self.current + self.coeff * (self.target - self.current);
        self.current = if next == self.current {
            ulp_toward(self.current, self.target)
        } else {
            next
        };
        self.current
    }

    /// Writes the next `out.len()` values of the trajectory into `out`.
    ///
    /// Snaps to the target once within [`SETTLE_EPSILON`](Self::SETTLE_EPSILON)
    /// so long tails do not crawl through denormal territory.
    pub fn fill(&mut self, out: &mut [f32]) {
        for slot in out.iter_mut() {
            *slot = self.advance();
        }
        if self.is_settled() {
            self.current = self.target;
        }
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Destination value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when the current value is within tolerance of the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < Self::SETTLE_EPSILON
    }

    /// Ends any glide by jumping to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    fn recalculate_coeff(&mut self) {
        self.coeff = smoothing_coeff(self.smoothing_time_ms, self.sample_rate);
    }
}

/// The adjacent representable value from `from` in the direction of `to`.
#[inline]
fn ulp_toward(from: f32, to: f32) -> f32 {
    if from == to || from.is_nan() || to.is_nan() {
        return to;
    }
    if from == 0.0 {
        let tiny = f32::from_bits(1);
        return if to > 0.0 { tiny } else { -tiny };
    }
    let bits = from.to_bits();
    if (to > from) == (from > 0.0) {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Linearly ramped parameter.
///
/// A new target starts a ramp that lasts exactly the transition time and
/// lands on the target. Used where the duration of a fade must be known in
/// advance: routing crossfades and input gain changes.
#[derive(Debug, Clone)]
pub struct LinearSmoothedParam {
    current: f32,
    target: f32,
    start: f32,
    increment: f32,
    samples_total: u32,
    samples_remaining: u32,
    sample_rate: f32,
    transition_time_ms: f32,
}

impl LinearSmoothedParam {
    /// Creates a ramp with a 10 ms transition at 48 kHz.
    pub fn new(initial: f32) -> Self {
        Self::with_config(initial, 48000.0, 10.0)
    }

    /// Creates a ramp with an explicit sample rate and transition time.
    pub fn with_config(initial: f32, sample_rate: f32, transition_time_ms: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            start: initial,
            increment: 0.0,
            samples_total: 0,
            samples_remaining: 0,
            sample_rate,
            transition_time_ms,
        }
    }

    /// Starts a ramp from the current value to `target`.
    ///
    /// Setting the same target again does not restart the ramp.
    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() < 1e-9 {
            return;
        }
        self.target = target;
        let samples = self.transition_samples();
        if samples == 0 {
            self.current = target;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.start = self.current;
            self.increment = (target - self.current) / samples as f32;
            self.samples_total = samples;
            self.samples_remaining = samples;
        }
    }

    /// Jumps to `value` and cancels any ramp.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Updates the sample rate used for future ramps.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Updates the duration used for future ramps.
    pub fn set_transition_time_ms(&mut self, time_ms: f32) {
        self.transition_time_ms = time_ms;
    }

    /// Ramp length in samples at the current settings.
    pub fn transition_samples(&self) -> u32 {
        libm::roundf(self.transition_time_ms * self.sample_rate / 1000.0).max(0.0) as u32
    }

    /// Advances one sample and returns the new value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.samples_remaining -= 1;
            self.current = if self.samples_remaining == 0 {
                self.target
            } else {
                // Position from the ramp start, so rounding never accumulates.
                let k = (self.samples_total - self.samples_remaining) as f32;
                let (lo, hi) = if self.start <= self.target {
                    (self.start, self.target)
                } else {
                    (self.target, self.start)
                };
                (self.start + self.increment * k).clamp(lo, hi)
            };
        }
        self.current
    }

    /// Writes the next `out.len()` values of the ramp into `out`.
    pub fn fill(&mut self, out: &mut [f32]) {
        for slot in out.iter_mut() {
            *slot = self.advance();
        }
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Destination value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when no ramp is in progress.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }

    /// Ends any ramp by jumping to the target.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }
}

impl Default for LinearSmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
