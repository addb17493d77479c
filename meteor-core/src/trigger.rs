//! Trigger detector (C6): compares two successive short-buffer stacks,
//! flags suspiciously brightened pixels, groups them by 4-connectivity, and
//! fires when any group exceeds a pixel-count threshold.
//!
//! Grounded in the reference implementation's `testTrigger`. Pure and
//! I/O-free: it returns the fired flag and the packed diagnostic RGB map;
//! the caller (the recording controller) decides the trigger stub and
//! performs the actual write, keeping ordering of artifact writes (§5 of
//! the spec) under the controller's control rather than buried in
//! detection logic.

use meteor_frame::{clip8, Stack};

use crate::constants::{
    MARGIN_BOTTOM, MARGIN_LEFT, MARGIN_RIGHT, MARGIN_TOP, NPIXELS, RADIUS, THRESHOLD_PER_FRAME,
};

/// Result of one trigger-detection pass.
pub struct TriggerOutcome {
    pub fired: bool,
    /// Packed RGB8 diagnostic map, `width * height * 3` bytes.
    pub diagnostic_rgb: Vec<u8>,
}

/// Merge connected component `old` into `new` by relabeling every pixel
/// across the *entire* trigger map (the redesign from §4.4/§9: the
/// reference implementation only relabels a 2-row slice around the merge
/// point, which can miss components spanning more rows).
fn merge_components(label_map: &mut [u32], block_counts: &mut [u32], old: u32, new: u32) {
    if old == new {
        return;
    }
    for label in label_map.iter_mut() {
        if *label == old {
            *label = new;
        }
    }
    block_counts[new as usize] += block_counts[old as usize];
    block_counts[old as usize] = 0;
}

/// Compare stack `b` (current second) against stack `a` (previous second),
/// each the sum of `co_added_frames` frames, and test for a trigger.
pub fn test_trigger(width: u32, height: u32, b: &Stack, a: &Stack, co_added_frames: u32) -> TriggerOutcome {
    let w = width as i64;
    let h = height as i64;
    let frame_size = (width as usize) * (height as usize);
    let threshold = THRESHOLD_PER_FRAME * co_added_frames as i64;

    let mut red = vec![0u8; frame_size];
    let mut green = vec![0u8; frame_size];
    let mut blue = vec![0u8; frame_size];
    let mut label_map = vec![0u32; frame_size];
    // block_counts[0] is an unused sentinel: label 0 means "unlabeled".
    let mut block_counts: Vec<u32> = vec![0];
    let mut next_label: u32 = 1;
    let mut fired = false;

    let top = MARGIN_TOP as i64;
    let bottom = h - MARGIN_BOTTOM as i64;
    let left = MARGIN_LEFT as i64;
    let right = w - MARGIN_RIGHT as i64;

    for y in top..bottom {
        for x in left..right {
            let o = (x + y * w) as usize;
            let bv = b.data[o] as i64;
            let av = a.data[o] as i64;

            red[o] = clip8(128 + (bv - av) * 256 / threshold);
            green[o] = clip8(bv / co_added_frames as i64);

            if bv - av <= threshold {
                continue;
            }

            // Temporal-spatial test: B must beat A's threshold at >=8 of a
            // 3x3 grid of neighbors spaced `radius` pixels apart.
            let mut count_a = 0;
            for i in -1..=1i64 {
                for j in -1..=1i64 {
                    let offset = (o as i64 + (j + i * w) * RADIUS) as usize;
                    if bv - a.data[offset] as i64 > threshold {
                        count_a += 1;
                    }
                }
            }
            if count_a <= 7 {
                continue;
            }

            // Spatial-only test: same grid, against B itself.
            let mut count_b = 0;
            for i in -1..=1i64 {
                for j in -1..=1i64 {
                    let offset = (o as i64 + (j + i * w) * RADIUS) as usize;
                    if bv - b.data[offset] as i64 > threshold {
                        count_b += 1;
                    }
                }
            }
            if count_b <= 6 {
                continue;
            }

            blue[o] = 128;

            // Four already-scanned neighbors, in the reference's scan
            // order: west, north-east, north, north-west.
            let neighbors = [o - 1, o + 1 - width as usize, o - width as usize, o - 1 - width as usize];
            let mut block_id = 0u32;
            for &n in &neighbors {
                let label = label_map[n];
                if label == 0 {
                    continue;
                }
                if block_id == 0 {
                    block_id = label;
                } else if label != block_id {
                    merge_components(&mut label_map, &mut block_counts, label, block_id);
                }
            }
            if block_id == 0 {
                block_id = next_label;
                next_label += 1;
                block_counts.push(0);
            }

            block_counts[block_id as usize] += 1;
            label_map[o] = block_id;

            if block_counts[block_id as usize] > NPIXELS {
                blue[o] = 255;
                fired = true;
            }
        }
    }

    let mut diagnostic_rgb = Vec::with_capacity(frame_size * 3);
    for p in 0..frame_size {
        diagnostic_rgb.push(red[p]);
        diagnostic_rgb.push(green[p]);
        diagnostic_rgb.push(blue[p]);
    }

    TriggerOutcome { fired, diagnostic_rgb }
}
