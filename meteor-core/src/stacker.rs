//! Short-buffer stacker (C4): pulls `nfr` frames from the source into a raw
//! buffer, accumulating each into a stack, an optional second (timelapse)
//! stack, and a max map, then records the cycle's per-pixel mean into the
//! rolling median histogram.

use meteor_frame::{MaxMap, MedianHistogram, Stack, UtcSeconds};
use meteor_source::FrameSource;

/// Read exactly `nfr` frames into `raw_buf` (which must be sized
/// `nfr * width * height`), accumulating into `stack1` (reset first),
/// optionally into `stack2` (not reset — the timelapse accumulator spans
/// many calls), and into `max_map` (reset first). Feeds `median_hist` with
/// this cycle's per-pixel mean once all frames are in.
///
/// Returns the UTC timestamp of the last frame read, or propagates the
/// source's error (including end-of-stream) unchanged.
pub fn read_short_buffer(
    source: &mut dyn FrameSource,
    nfr: u32,
    raw_buf: &mut [u8],
    stack1: &mut Stack,
    mut stack2: Option<&mut Stack>,
    max_map: &mut MaxMap,
    median_hist: &mut MedianHistogram,
) -> meteor_source::Result<UtcSeconds> {
    stack1.zero();
    max_map.zero();

    let frame_size = (stack1.width as usize) * (stack1.height as usize);
    debug_assert_eq!(raw_buf.len(), frame_size * nfr as usize);

    let mut utc = 0.0;
    for j in 0..nfr as usize {
        let frame = &mut raw_buf[j * frame_size..(j + 1) * frame_size];
        utc = source.fetch(frame)?;
        stack1.accumulate_slice(frame);
        if let Some(stack2) = stack2.as_mut() {
            stack2.accumulate_slice(frame);
        }
        max_map.update_slice(frame);
    }

    median_hist.record(stack1);
    Ok(utc)
}
