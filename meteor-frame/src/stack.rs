use std::collections::TryReserveError;

use rayon::prelude::*;

use crate::clip::clip8;
use crate::frame::Frame;

/// Per-pixel sum of a sequence of frames.
///
/// Invariant: `data[p] == sum(frame_i[p] for frame_i in the frames
/// accumulated since the last `zero()`)`, and `n_frames` is that count.
#[derive(Clone, Debug)]
pub struct Stack {
    pub width: u32,
    pub height: u32,
    pub data: Vec<i32>,
    pub n_frames: u32,
}

impl Stack {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self::try_zeroed(width, height).expect("allocating stack")
    }

    /// Fallible counterpart of [Stack::zeroed], for the one place (engine
    /// startup) where a failed allocation must be reported rather than
    /// aborting the process.
    pub fn try_zeroed(width: u32, height: u32) -> Result<Self, TryReserveError> {
        let len = (width as usize) * (height as usize);
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0i32);
        Ok(Self {
            width,
            height,
            data,
            n_frames: 0,
        })
    }

    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0);
        self.n_frames = 0;
    }

    /// Accumulate one frame's pixels into this stack.
    ///
    /// The per-pixel addition is expressed as a parallel iterator over
    /// disjoint indices, matching the `#pragma omp parallel for` annotation
    /// on the reference implementation's accumulation loop: each index is
    /// touched by exactly one task, so there is no data race to guard
    /// against.
    pub fn accumulate(&mut self, frame: &Frame) {
        self.accumulate_slice(&frame.data);
    }

    /// Same as [Stack::accumulate], but against a bare luminance slice
    /// rather than a [Frame]. The short-buffer stacker (`read_short_buffer`)
    /// uses this directly on bytes just copied out of the frame source,
    /// avoiding an intermediate `Frame` allocation per frame.
    pub fn accumulate_slice(&mut self, pixels: &[u8]) {
        self.data
            .par_iter_mut()
            .zip(pixels.par_iter())
            .for_each(|(s, &p)| *s += p as i32);
        self.n_frames += 1;
    }

    /// Fold another stack's running sum into this one, summing `n_frames`
    /// too. Used by the long-buffer recorder, which accumulates each
    /// completed short buffer's stack into the running post-trigger stack.
    pub fn accumulate_stack(&mut self, other: &Stack) {
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(s, &o)| *s += o);
        self.n_frames += other.n_frames;
    }

    /// Per-pixel mean over the accumulated frames, clamped to `0..=255`.
    pub fn mean_u8(&self, p: usize) -> u8 {
        clip8(self.data[p] as i64 / self.n_frames.max(1) as i64)
    }

    /// Plain (no background subtraction) encoder: `clip8(gain * stack[p] /
    /// nfr)`.
    pub fn encode_plain(&self, nfr: u32, gain: i32) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| clip8((gain as i64 * v as i64) / nfr.max(1) as i64))
            .collect()
    }

    /// Background-subtracted encoder: `clip8(stack_gain * stack[p] / nfr -
    /// median[p])`.
    pub fn encode_subtracted(&self, nfr: u32, stack_gain: i32, median: &[u8]) -> Vec<u8> {
        self.data
            .iter()
            .zip(median.iter())
            .map(|(&v, &m)| {
                clip8((stack_gain as i64 * v as i64) / nfr.max(1) as i64 - m as i64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(width: u32, height: u32, value: u8, utc: f64) -> Frame {
        let mut f = Frame::zeroed(width, height);
        f.data.iter_mut().for_each(|v| *v = value);
        f.utc = utc;
        f
    }

    #[test]
    fn stack_coherence() {
        let mut stack = Stack::zeroed(4, 3);
        let frames = [frame_of(4, 3, 1, 0.0), frame_of(4, 3, 5, 1.0), frame_of(4, 3, 10, 2.0)];
        for f in &frames {
            stack.accumulate(f);
        }
        let expected: i32 = frames.iter().map(|f| f.data[0] as i32).sum();
        assert!(stack.data.iter().all(|&v| v == expected));
        assert_eq!(stack.n_frames, 3);
    }

    #[test]
    fn zero_resets_sum_and_count() {
        let mut stack = Stack::zeroed(2, 2);
        stack.accumulate(&frame_of(2, 2, 200, 0.0));
        stack.zero();
        assert!(stack.data.iter().all(|&v| v == 0));
        assert_eq!(stack.n_frames, 0);
    }

    #[test]
    fn encode_plain_clamps_to_u8() {
        let mut stack = Stack::zeroed(1, 1);
        stack.data[0] = 1000;
        stack.n_frames = 1;
        let encoded = stack.encode_plain(1, 1);
        assert_eq!(encoded[0], 255);
    }

    #[test]
    fn encode_subtracted_clamps_negative_to_zero() {
        let mut stack = Stack::zeroed(1, 1);
        stack.data[0] = 0;
        stack.n_frames = 1;
        let median = vec![50u8];
        let encoded = stack.encode_subtracted(1, 4, &median);
        assert_eq!(encoded[0], 0);
    }

    #[test]
    fn accumulate_stack_sums_data_and_frame_counts() {
        let mut long = Stack::zeroed(2, 1);
        long.accumulate(&frame_of(2, 1, 10, 0.0));
        let mut short = Stack::zeroed(2, 1);
        short.accumulate(&frame_of(2, 1, 3, 1.0));
        short.accumulate(&frame_of(2, 1, 4, 2.0));
        long.accumulate_stack(&short);
        assert_eq!(long.data, vec![17, 17]);
        assert_eq!(long.n_frames, 3);
    }
}
