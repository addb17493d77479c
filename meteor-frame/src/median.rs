use std::collections::TryReserveError;

use crate::stack::Stack;

/// Histogram of per-pixel intensity across short-buffer cycles.
///
/// For each pixel `p` and bucket `v` (`0..256`), `counts[p, v]` is the number
/// of short-buffer cycles whose mean intensity at `p` fell in that bucket.
/// Bucket counts are stored contiguously per pixel (`p * 256 + v`), unlike
/// the reference implementation's per-bucket-plane layout
/// (`pixel + bucket * frame_size`); both satisfy the same conservation
/// invariant, and the per-pixel layout keeps one pixel's whole histogram in
/// a cache line run when computing its median.
pub struct MedianHistogram {
    pub width: u32,
    pub height: u32,
    counts: Vec<u8>,
}

impl MedianHistogram {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self::try_zeroed(width, height).expect("allocating median histogram")
    }

    /// Fallible counterpart of [MedianHistogram::zeroed]. This is the
    /// largest single allocation the engine makes (`width * height * 256`
    /// bytes), so it is the most likely of the startup allocations to fail
    /// under memory pressure.
    pub fn try_zeroed(width: u32, height: u32) -> Result<Self, TryReserveError> {
        let len = (width as usize) * (height as usize) * 256;
        let mut counts = Vec::new();
        counts.try_reserve_exact(len)?;
        counts.resize(len, 0u8);
        Ok(Self {
            width,
            height,
            counts,
        })
    }

    #[inline]
    fn frame_size(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    /// Record one short-buffer cycle's per-pixel mean into the histogram.
    pub fn record(&mut self, stack: &Stack) {
        for p in 0..self.frame_size() {
            let bucket = stack.mean_u8(p) as usize;
            let idx = p * 256 + bucket;
            self.counts[idx] = self.counts[idx].saturating_add(1);
        }
    }

    /// Number of cycles contributed since the last reset, for pixel `p`.
    ///
    /// Exposed for the conservation-invariant test; every pixel should agree,
    /// since `record` touches every pixel on every cycle.
    pub fn cycles_contributed(&self, p: usize) -> u32 {
        let base = p * 256;
        self.counts[base..base + 256]
            .iter()
            .map(|&c| c as u32)
            .sum()
    }

    /// Compute the median-bucket map: for each pixel, the smallest bucket `v`
    /// whose cumulative count reaches half the total.
    pub fn compute_median(&self) -> MedianMap {
        let frame_size = self.frame_size();
        let mut data = vec![0u8; frame_size];
        for p in 0..frame_size {
            let base = p * 256;
            let row = &self.counts[base..base + 256];
            let total: u32 = row.iter().map(|&c| c as u32).sum();
            let half = total.div_ceil(2);
            let mut cumulative = 0u32;
            let mut median = 0u8;
            for (v, &c) in row.iter().enumerate() {
                cumulative += c as u32;
                if cumulative >= half {
                    median = v as u8;
                    break;
                }
            }
            data[p] = median;
        }
        MedianMap {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Per-pixel median intensity over the most recent 255 short-buffer cycles.
#[derive(Clone, Debug)]
pub struct MedianMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl MedianMap {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self::try_zeroed(width, height).expect("allocating median map")
    }

    /// Fallible counterpart of [MedianMap::zeroed], for the one place
    /// (engine startup) where a failed allocation must be reported rather
    /// than aborting the process.
    pub fn try_zeroed(width: u32, height: u32) -> Result<Self, TryReserveError> {
        let len = (width as usize) * (height as usize);
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0u8);
        Ok(Self {
            width,
            height,
            data,
        })
    }
}
