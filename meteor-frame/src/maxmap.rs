use std::collections::TryReserveError;

use rayon::prelude::*;

use crate::frame::Frame;

/// Per-pixel maximum intensity over a sequence of frames.
#[derive(Clone, Debug)]
pub struct MaxMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl MaxMap {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self::try_zeroed(width, height).expect("allocating max map")
    }

    /// Fallible counterpart of [MaxMap::zeroed], for the one place (engine
    /// startup) where a failed allocation must be reported rather than
    /// aborting the process.
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

    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0);
    }

    /// Fold one frame's pixels into the running maximum.
    pub fn update(&mut self, frame: &Frame) {
        self.update_slice(&frame.data);
    }

    /// Same as [MaxMap::update], but against a bare luminance slice rather
    /// than a [Frame]; see [crate::Stack::accumulate_slice] for why.
    pub fn update_slice(&mut self, pixels: &[u8]) {
        self.data
            .par_iter_mut()
            .zip(pixels.par_iter())
            .for_each(|(m, &p)| {
                if p > *m {
                    *m = p;
                }
            });
    }

    /// Fold another max map's pixels into this one (used by the long-buffer
    /// recorder to merge each short buffer's max map as recording proceeds).
    pub fn merge(&mut self, other: &MaxMap) {
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(m, &o)| {
                if o > *m {
                    *m = o;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_coherence() {
        let mut max = MaxMap::zeroed(3, 1);
        let values = [[1u8, 9, 3], [5, 2, 8], [0, 20, 1]];
        for row in &values {
            let mut f = Frame::zeroed(3, 1);
            f.data.copy_from_slice(row);
            max.update(&f);
        }
        assert_eq!(max.data, vec![5, 20, 8]);
    }

    #[test]
    fn merge_takes_pointwise_max() {
        let mut a = MaxMap::zeroed(2, 1);
        a.data = vec![10, 1];
        let b = MaxMap {
            width: 2,
            height: 1,
            data: vec![2, 20],
        };
        a.merge(&b);
        assert_eq!(a.data, vec![10, 20]);
    }
}
