use meteor_frame::UtcSeconds;

use crate::constants::FRAMES_SINCE_LAST_TRIGGER_INITIAL;

/// The engine's run state: `(bufferNum, medianNum, medianCount, recording,
/// timelapseCount, framesSinceLastTrigger, frameNextTargetTime)` from the
/// distilled spec's data model, minus the throttle timer/counter (owned by
/// [crate::throttle::Throttle] instead — see DESIGN.md).
#[derive(Debug, Clone)]
pub struct RunState {
    /// Index (0 or 1) of the short buffer/stack/max-map slot currently
    /// playing the "current second" role.
    pub buffer_num: usize,
    /// Index (0 or 1) of the median map slot currently active for readers.
    pub median_num: usize,
    /// Short-buffer cycles contributed to the median histogram since the
    /// last refresh, `0..255`.
    pub median_count: u32,
    /// `-1` when not recording; otherwise the number of long-buffer slots
    /// filled so far, `0..nfrl/nfrt`.
    pub recording: i32,
    /// `-1` when not accumulating a timelapse exposure; otherwise the
    /// number of cycles accumulated so far, `0..nfrtl/nfrt`.
    pub timelapse_count: i32,
    pub frames_since_last_trigger: i32,
    pub frame_next_target_time: UtcSeconds,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            buffer_num: 0,
            median_num: 0,
            median_count: 0,
            recording: -1,
            timelapse_count: -1,
            frames_since_last_trigger: FRAMES_SINCE_LAST_TRIGGER_INITIAL,
            frame_next_target_time: f64::MAX,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording >= 0
    }

    pub fn is_accumulating_timelapse(&self) -> bool {
        self.timelapse_count >= 0
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
