//! Per-block parameter trajectories with a branchless read path.
//!
//! A [`ParameterBuffer`] is what a DSP node sees for one parameter during one
//! block. It is either a single value broadcast over the block (the parameter
//! is settled) or one value per sample (the parameter is gliding). Both modes
//! are read through the same `data[i * stride]` expression, with a stride of 0
//! for a constant and 1 for a per-sample lane, so inner loops never branch on
//! the mode.
//!
//! The [`ParameterBufferPool`] owns one lane per [`ParamId`]. All lanes live in
//! a single allocation made at prepare time; each lane starts on a 64-byte
//! cache-line boundary.
//!
//! # Example
//!
//! ```rust
//! use basilica_core::{ParamId, ParameterBufferPool, SmoothedParam};
//!
//! let mut pool = ParameterBufferPool::new(256);
//! let mut time = SmoothedParam::with_config(0.2, 48000.0, 40.0);
//! time.set_target(0.8);
//!
//! pool.fill_smoothed(ParamId::Time, &mut time, 128);
//! pool.set_constant(ParamId::Mass, 0.5, 128);
//!
//! let t = pool.buffer(ParamId::Time);
//! let m = pool.buffer(ParamId::Mass);
//! assert!(!t.is_constant());
//! assert!(m.is_constant());
//! assert_eq!(m.get(127), 0.5);
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::param::SmoothedParam;
use crate::param_id::ParamId;

/// Floats per cache line.
const LANE_ALIGN: usize = 16;
/// Cache-line size in bytes.
const CACHE_LINE_BYTES: usize = 64;

/// Read-only view of one parameter over one block.
#[derive(Debug, Clone, Copy)]
pub struct ParameterBuffer<'a> {
    data: &'a [f32],
    stride: usize,
    len: usize,
}

impl<'a> ParameterBuffer<'a> {
    /// A single value broadcast over `len` samples.
    #[inline]
    pub fn constant(value: &'a f32, len: usize) -> Self {
        Self {
            data: core::slice::from_ref(value),
            stride: 0,
            len,
        }
    }

    /// One value per sample.
    #[inline]
    pub fn per_sample(values: &'a [f32]) -> Self {
        Self {
            data: values,
            stride: 1,
            len: values.len(),
        }
    }

    /// Value at sample `i`. Same cost in both modes.
    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        debug_assert!(i < self.len, "parameter index {i} out of block length {}", self.len);
        self.data[i * self.stride]
    }

    /// Number of samples this view covers.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length block.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when every sample reads the same value.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.stride == 0
    }

    /// Value at the first sample, or 0.0 for an empty block.
    #[inline]
    pub fn first(&self) -> f32 {
        self.data.first().copied().unwrap_or(0.0)
    }

    /// Value at the last sample, or 0.0 for an empty block.
    #[inline]
    pub fn last(&self) -> f32 {
        if self.len == 0 {
            0.0
        } else {
            self.get(self.len - 1)
        }
    }

    /// Iterates the block's values.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Start of the backing storage.
    pub fn as_ptr(&self) -> *const f32 {
        self.data.as_ptr()
    }
}

/// Fixed set of per-parameter lanes, sized once for the largest block.
#[derive(Debug, Clone)]
pub struct ParameterBufferPool {
    storage: Vec<f32>,
    offset: usize,
    lane_stride: usize,
    capacity: usize,
    lens: [usize; ParamId::COUNT],
    constants: [f32; ParamId::COUNT],
    per_sample: [bool; ParamId::COUNT],
}

impl ParameterBufferPool {
    /// Creates a pool whose lanes each hold `max_block` samples.
    pub fn new(max_block: usize) -> Self {
        let mut pool = Self {
            storage: Vec::new(),
            offset: 0,
            lane_stride: 0,
            capacity: 0,
            lens: [0; ParamId::COUNT],
            constants: ParamId::ALL.map(ParamId::default_value),
            per_sample: [false; ParamId::COUNT],
        };
        pool.prepare(max_block);
        pool
    }

    /// Reallocates every lane for a new maximum block size.
    ///
    /// Allocates; call from the control path only.
    pub fn prepare(&mut self, max_block: usize) {
        self.capacity = max_block;
        self.lane_stride = max_block.div_ceil(LANE_ALIGN).max(1) * LANE_ALIGN;
        self.storage = vec![0.0; self.lane_stride * ParamId::COUNT + LANE_ALIGN];
        // align_offset counts in f32 steps; anything past one cache line means
        // the allocator gave us storage we cannot align, so fall back to 0.
        self.offset = match self.storage.as_ptr().align_offset(CACHE_LINE_BYTES) {
            n if n < LANE_ALIGN => n,
            _ => 0,
        };
        self.lens = [0; ParamId::COUNT];
        self.per_sample = [false; ParamId::COUNT];
    }

    /// Largest block the pool can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn check_len(&self, len: usize) {
        assert!(
            len <= self.capacity,
            "block of {len} samples exceeds parameter pool capacity {}",
            self.capacity
        );
    }

    /// Fills `len` samples of `id` from a smoother. A settled smoother yields
    /// constant mode.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds [`capacity`](Self::capacity). An oversized
    /// block is a sizing error in the caller and is never truncated.
    pub fn fill_smoothed(&mut self, id: ParamId, param: &mut SmoothedParam, len: usize) {
        self.check_len(len);
        let i = id.index();
        self.lens[i] = len;
        if param.is_settled() {
            param.snap_to_target();
            self.constants[i] = param.get();
            self.per_sample[i] = false;
        } else {
            let start = self.lane_start(i);
            param.fill(&mut self.storage[start..start + len]);
            self.constants[i] = param.get();
            self.per_sample[i] = true;
        }
    }

    /// Broadcasts one value over `len` samples.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds [`capacity`](Self::capacity).
    pub fn set_constant(&mut self, id: ParamId, value: f32, len: usize) {
        self.check_len(len);
        let i = id.index();
        self.lens[i] = len;
        self.constants[i] = value;
        self.per_sample[i] = false;
    }

    /// Writable per-sample lane for `id`, `len` samples long.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds [`capacity`](Self::capacity).
    pub fn lane_mut(&mut self, id: ParamId, len: usize) -> &mut [f32] {
        self.check_len(len);
        let i = id.index();
        self.lens[i] = len;
        self.per_sample[i] = true;
        let start = self.lane_start(i);
        &mut self.storage[start..start + len]
    }

    /// View of `id` as last written.
    #[inline]
    pub fn buffer(&self, id: ParamId) -> ParameterBuffer<'_> {
        let i = id.index();
        let len = self.lens[i];
        if self.per_sample[i] {
            let start = self.lane_start(i);
            ParameterBuffer::per_sample(&self.storage[start..start + len])
        } else {
            ParameterBuffer::constant(&self.constants[i], len)
        }
    }

    /// True if `id` was written per-sample this block.
    pub fn is_per_sample(&self, id: ParamId) -> bool {
        self.per_sample[id.index()]
    }

    #[inline]
    fn lane_start(&self, index: usize) -> usize {
        self.offset + index * self.lane_stride
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_and_per_sample_read_alike() {
        let value = 0.25f32;
        let constant = ParameterBuffer::constant(&value, 8);
        let values = [0.25f32; 8];
        let lane = ParameterBuffer::per_sample(&values);
        for i in 0..8 {
            assert_eq!(constant.get(i), lane.get(i));
        }
        assert!(constant.is_constant());
        assert!(!lane.is_constant());
        assert_eq!(constant.len(), 8);
    }

    #[test]
    fn lanes_are_cache_line_aligned() {
        let mut pool = ParameterBufferPool::new(100);
        for id in ParamId::ALL {
            pool.lane_mut(id, 100).fill(id.index() as f32);
        }
        for id in ParamId::ALL {
            let buf = pool.buffer(id);
            assert_eq!(buf.as_ptr() as usize % CACHE_LINE_BYTES, 0, "{id}");
            assert!(buf.iter().all(|v| v == id.index() as f32));
        }
    }

    #[test]
    fn settled_smoother_gives_constant_lane() {
        let mut pool = ParameterBufferPool::new(64);
        let mut p = SmoothedParam::with_config(0.4, 48000.0, 20.0);
        pool.fill_smoothed(ParamId::Air, &mut p, 64);
        assert!(!pool.is_per_sample(ParamId::Air));
        assert_eq!(pool.buffer(ParamId::Air).get(63), 0.4);
    }

    #[test]
    fn gliding_smoother_gives_per_sample_lane() {
        let mut pool = ParameterBufferPool::new(64);
        let mut p = SmoothedParam::with_config(0.0, 48000.0, 20.0);
        p.set_target(1.0);
        pool.fill_smoothed(ParamId::Warp, &mut p, 32);
        let buf = pool.buffer(ParamId::Warp);
        assert_eq!(buf.len(), 32);
        assert!(buf.get(0) < buf.get(31));
        assert_eq!(buf.last(), p.get());
    }

    #[test]
    fn lanes_do_not_overlap() {
        let mut pool = ParameterBufferPool::new(17);
        pool.lane_mut(ParamId::Time, 17).fill(1.0);
        pool.lane_mut(ParamId::Mass, 17).fill(2.0);
        assert!(pool.buffer(ParamId::Time).iter().all(|v| v == 1.0));
        assert!(pool.buffer(ParamId::Mass).iter().all(|v| v == 2.0));
    }

    #[test]
    #[should_panic]
    fn oversized_block_is_rejected() {
        let mut pool = ParameterBufferPool::new(64);
        let mut p = SmoothedParam::new(0.0);
        pool.fill_smoothed(ParamId::Time, &mut p, 65);
    }
}
