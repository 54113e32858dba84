//! Insert slot hosting an optional external coloration effect.

use basilica_core::StereoEffect;

/// Passes audio through unless a [`StereoEffect`] is installed.
#[derive(Default)]
pub struct InsertSlot {
    effect: Option<Box<dyn StereoEffect>>,
    sample_rate: f32,
    max_block: usize,
}

impl InsertSlot {
    /// Empty slot.
    pub fn new(sample_rate: f32, max_block: usize) -> Self {
        Self {
            effect: None,
            sample_rate,
            max_block,
        }
    }

    /// Installs `effect`, preparing it for the current stream format.
    /// Returns the previously installed effect.
    pub fn install(&mut self, mut effect: Box<dyn StereoEffect>) -> Option<Box<dyn StereoEffect>> {
        effect.prepare(self.sample_rate, self.max_block);
        self.effect.replace(effect)
    }

    /// Removes and returns the installed effect.
    pub fn take(&mut self) -> Option<Box<dyn StereoEffect>> {
        self.effect.take()
    }

    /// True if an effect is installed.
    pub fn is_occupied(&self) -> bool {
        self.effect.is_some()
    }

    /// Re-prepares the installed effect. Control path only.
    pub fn prepare(&mut self, sample_rate: f32, max_block: usize) {
        self.sample_rate = sample_rate;
        self.max_block = max_block;
        if let Some(fx) = self.effect.as_mut() {
            fx.prepare(sample_rate, max_block);
        }
    }

    /// Processes a stereo block in place.
    #[inline]
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if let Some(fx) = self.effect.as_mut() {
            fx.process_stereo(left, right);
        }
    }

    /// Resets the installed effect.
    pub fn reset(&mut self) {
        if let Some(fx) = self.effect.as_mut() {
            fx.reset();
        }
    }
}

impl core::fmt::Debug for InsertSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InsertSlot")
            .field("occupied", &self.is_occupied())
            .field("sample_rate", &self.sample_rate)
            .field("max_block", &self.max_block)
            .finish()
    }
}
