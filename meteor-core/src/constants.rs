//! Fixed parameters of the observation engine, grounded in the reference
//! C implementation's `#define`s and literal constants in `observe.c`.

/// Margin pixels ignored on each edge of the trigger-detection scan.
pub const MARGIN_TOP: u32 = 8;
pub const MARGIN_BOTTOM: u32 = 19;
pub const MARGIN_LEFT: u32 = 12;
pub const MARGIN_RIGHT: u32 = 19;

/// Minimum connected pixel count for a component to fire a trigger.
pub const NPIXELS: u32 = 30;

/// Neighborhood pitch used by the temporal-spatial and spatial-only tests.
pub const RADIUS: i64 = 8;

/// Per-short-buffer-frame brightening threshold multiplier.
pub const THRESHOLD_PER_FRAME: i64 = 13;

/// `framesSinceLastTrigger` starts here: 260 cycles of run-in before the
/// engine ever evaluates a trigger, enough to accumulate one full median
/// (255 cycles) plus a small margin.
pub const FRAMES_SINCE_LAST_TRIGGER_INITIAL: i32 = -260;

/// Sentinel meaning "rewind the source once, then start timelapse timing".
pub const FRAMES_SINCE_LAST_TRIGGER_REWIND: i32 = -2;

/// A trigger may only fire once `framesSinceLastTrigger` reaches this value.
pub const FRAMES_SINCE_LAST_TRIGGER_ALLOWTRIGGER: i32 = 3;

/// Duration of one short-buffer cycle, in seconds.
pub const SECONDS_TRIGGER_BUFF: f64 = 0.5;

/// Duration of one timelapse exposure, in seconds.
pub const SECONDS_TIMELAPSE_BUFF: f64 = 15.0;

/// Duration of the post-trigger long buffer, in seconds.
pub const SECONDS_LONG_BUFF: f64 = 9.0;

/// Number of short-buffer cycles between rolling-median refreshes.
pub const MEDIAN_REFRESH_CYCLES: u32 = 255;

/// Round `value` to the nearest multiple of `factor` (minimum one
/// `factor`), matching the reference implementation's `nearestMultiple`.
pub fn nearest_multiple(value: f64, factor: u32) -> u32 {
    let factor = factor.max(1);
    let multiples = (value / factor as f64).round().max(1.0) as u32;
    multiples * factor
}

/// Number of frames in one short buffer: `round(fps * 0.5)`.
pub fn nfrt(fps: f64) -> u32 {
    (fps * SECONDS_TRIGGER_BUFF).round().max(1.0) as u32
}

/// Number of frames in the post-trigger long buffer: nearest multiple of
/// `nfrt` to `fps * 9`.
pub fn nfrl(fps: f64, nfrt: u32) -> u32 {
    nearest_multiple(fps * SECONDS_LONG_BUFF, nfrt)
}

/// Number of frames in one timelapse exposure: nearest multiple of `nfrt`
/// to `fps * 15`.
pub fn nfrtl(fps: f64, nfrt: u32) -> u32 {
    nearest_multiple(fps * SECONDS_TIMELAPSE_BUFF, nfrt)
}
