//! End-to-end scenarios for the observation loop, run against an in-memory
//! frame source and artifact sink rather than real hardware or real time.
//!
//! The canvas here (100x80) is scaled down from a real deployment
//! (720x480) purely so these tests allocate megabytes instead of
//! gigabytes; the short-buffer/long-buffer/timelapse cadence (driven by
//! `video_fps` alone, not by the canvas size) is exactly what a real
//! deployment would use.
//!
//! The engine spends its first 258 short-buffer cycles in a fixed run-in
//! (the time it takes to build the first rolling median), then rewinds the
//! source once before the trigger gate opens three cycles later. A
//! `FiniteFrameSource` rewind resets its read position to the start, so
//! every cycle *after* the rewind reads `frames[(k-1)*NFRT..k*NFRT)` for
//! `k = 1, 2, ...` same as the run-in did — `frame_range(k)` below gives
//! that slice for a chosen post-rewind cycle `k`, and `FIRST_TRIGGERABLE_K`
//! is the smallest `k` at which a trigger can actually fire.
use std::path::PathBuf;

use meteor_config::MeteorConfig;
use meteor_frame::Frame;
use meteor_sink::MemorySink;
use meteor_source::FiniteFrameSource;
use tempfile::TempDir;

const WIDTH: u32 = 100;
const HEIGHT: u32 = 80;
const FPS: f64 = 30.0;
const NFRT: u32 = 15; // 0.5s short-buffer cycle at 30fps
const NFRL_CYCLES: u32 = 18; // nfrl/nfrt = 270/15, post-trigger drain length
const BASE_UTC: f64 = 1_700_000_000.0;
const PRE_REWIND_CYCLES: u32 = 258;
const FIRST_TRIGGERABLE_K: u32 = 5;

fn config_for(out: &TempDir) -> MeteorConfig {
    let mut config = MeteorConfig::default();
    config.output_path = out.path().to_path_buf();
    config
}

/// Frame-index range read by post-rewind cycle `k` (1-based): the same
/// `[(k-1)*NFRT, k*NFRT)` slice the run-in read at absolute cycle `k`,
/// replayed after the engine's one-time rewind.
fn frame_range(k: u32) -> (usize, usize) {
    let start = ((k - 1) * NFRT) as usize;
    (start, start + NFRT as usize)
}

fn flat_frames(n: u32, value: u8) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            let mut f = Frame::zeroed(WIDTH, HEIGHT);
            f.data.iter_mut().for_each(|v| *v = value);
            f.utc = BASE_UTC + i as f64 / FPS;
            f
        })
        .collect()
}

fn overlay_disk(frame: &mut Frame, cx: i64, cy: i64, radius: i64, value: u8) {
    let w = WIDTH as i64;
    let h = HEIGHT as i64;
    for y in 0..h {
        for x in 0..w {
            if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                frame.data[(x + y * w) as usize] = value;
            }
        }
    }
}

fn has_suffix(paths: &[PathBuf], suffix: &str) -> bool {
    paths.iter().any(|p| p.to_string_lossy().ends_with(suffix))
}

fn count_suffix(paths: &[PathBuf], suffix: &str) -> usize {
    paths
        .iter()
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .count()
}

#[test]
fn dark_stream_never_triggers() {
    let out = tempfile::tempdir().unwrap();
    let config = config_for(&out);

    let frames = flat_frames(PRE_REWIND_CYCLES * NFRT, 0);
    let mut source = FiniteFrameSource::new(WIDTH, HEIGHT, frames);
    let sink = MemorySink::new();

    meteor_core::observe(&mut source, &sink, &config, 0, 0, i64::MAX).unwrap();

    assert!(!has_suffix(&sink.paths(), "_MAP.rawrgb"));
}

#[test]
fn uniform_illumination_ramp_never_triggers() {
    let out = tempfile::tempdir().unwrap();
    let config = config_for(&out);

    let n = PRE_REWIND_CYCLES * NFRT;
    let mut frames = flat_frames(n, 0);
    for (i, frame) in frames.iter_mut().enumerate() {
        let level = 50u32 + (i as u32 / 50).min(150);
        frame.data.iter_mut().for_each(|v| *v = level as u8);
    }
    let mut source = FiniteFrameSource::new(WIDTH, HEIGHT, frames);
    let sink = MemorySink::new();

    meteor_core::observe(&mut source, &sink, &config, 0, 0, i64::MAX).unwrap();

    assert!(!has_suffix(&sink.paths(), "_MAP.rawrgb"));
}

#[test]
fn a_single_flash_fires_exactly_one_trigger() {
    let out = tempfile::tempdir().unwrap();
    let config = config_for(&out);

    let mut frames = flat_frames(PRE_REWIND_CYCLES * NFRT, 0);
    let (start, end) = frame_range(FIRST_TRIGGERABLE_K);
    overlay_disk(&mut frames[start + (end - start) / 2], 50, 40, 7, 250);

    let mut source = FiniteFrameSource::new(WIDTH, HEIGHT, frames);
    let sink = MemorySink::new();

    meteor_core::observe(&mut source, &sink, &config, 0, 0, i64::MAX).unwrap();

    let paths = sink.paths();
    assert_eq!(count_suffix(&paths, "_MAP.rawrgb"), 1, "expected exactly one trigger");
    assert!(has_suffix(&paths, "1_BS0.rawimg"));
    assert!(has_suffix(&paths, "2_BS0.rawimg"));
    assert!(has_suffix(&paths, "3_BS0.rawimg"));
    assert!(has_suffix(&paths, ".rawvid"));
}

#[test]
fn a_second_flash_inside_the_recording_window_is_not_retriggered() {
    let out = tempfile::tempdir().unwrap();
    let config = config_for(&out);

    let mut frames = flat_frames(PRE_REWIND_CYCLES * NFRT, 0);
    let (s1, e1) = frame_range(FIRST_TRIGGERABLE_K);
    overlay_disk(&mut frames[s1 + (e1 - s1) / 2], 50, 40, 7, 250);
    // One cycle later: still inside the just-started post-trigger
    // recording window, so it must not register as a second event.
    let (s2, e2) = frame_range(FIRST_TRIGGERABLE_K + 1);
    overlay_disk(&mut frames[s2 + (e2 - s2) / 2], 50, 40, 7, 250);

    let mut source = FiniteFrameSource::new(WIDTH, HEIGHT, frames);
    let sink = MemorySink::new();

    meteor_core::observe(&mut source, &sink, &config, 0, 0, i64::MAX).unwrap();

    assert_eq!(count_suffix(&sink.paths(), "_MAP.rawrgb"), 1);
}

#[test]
fn a_flash_storm_is_capped_at_the_throttle_limit() {
    let out = tempfile::tempdir().unwrap();
    let mut config = config_for(&out);
    // Long enough that the whole storm falls inside one throttle window.
    config.trigger_throttle_period_minutes = 7;
    config.trigger_throttle_max_events = 5;

    let spacing_k = 25u32; // > drain (18) + ALLOWTRIGGER (3), so every
                           // flash finds the engine idle again
    let n_flashes = 20u32;
    let last_k = FIRST_TRIGGERABLE_K + (n_flashes - 1) * spacing_k;
    let tail_cycles = NFRL_CYCLES + 10;
    let total_cycles = (last_k + tail_cycles).max(PRE_REWIND_CYCLES);

    let mut frames = flat_frames(total_cycles * NFRT, 0);
    for f in 0..n_flashes {
        let k = FIRST_TRIGGERABLE_K + f * spacing_k;
        let (s, e) = frame_range(k);
        overlay_disk(&mut frames[s + (e - s) / 2], 50, 40, 7, 250);
    }

    let mut source = FiniteFrameSource::new(WIDTH, HEIGHT, frames);
    let sink = MemorySink::new();

    meteor_core::observe(&mut source, &sink, &config, 0, 0, i64::MAX).unwrap();

    assert_eq!(
        count_suffix(&sink.paths(), "_MAP.rawrgb"),
        config.trigger_throttle_max_events as usize
    );
}

#[test]
fn a_flash_within_the_left_margin_never_triggers() {
    let out = tempfile::tempdir().unwrap();
    let config = config_for(&out);

    let mut frames = flat_frames(PRE_REWIND_CYCLES * NFRT, 0);
    let (start, end) = frame_range(FIRST_TRIGGERABLE_K);
    // Disk of radius 6 centered at x=5: fully inside the 12px left margin,
    // never reaches the scanned region starting at x=12.
    overlay_disk(&mut frames[start + (end - start) / 2], 5, 40, 6, 250);

    let mut source = FiniteFrameSource::new(WIDTH, HEIGHT, frames);
    let sink = MemorySink::new();

    meteor_core::observe(&mut source, &sink, &config, 0, 0, i64::MAX).unwrap();

    assert!(!has_suffix(&sink.paths(), "_MAP.rawrgb"));
}
