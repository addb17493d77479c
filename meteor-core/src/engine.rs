//! Recording controller (C7): the single event loop that orchestrates the
//! two alternating short buffers, the long post-trigger buffer, the
//! timelapse accumulator and the throttle, all driven from one
//! short-buffer-cycle clock. Grounded in the reference implementation's
//! `observe()`.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use meteor_config::MeteorConfig;
use meteor_frame::{DoubleBuffer, MaxMap, MedianHistogram, MedianMap, Stack, UtcSeconds};
use meteor_namer::{Category, Namer};
use meteor_sink::ArtifactSink;
use meteor_source::FrameSource;

use crate::composer;
use crate::constants::{
    self, FRAMES_SINCE_LAST_TRIGGER_ALLOWTRIGGER, FRAMES_SINCE_LAST_TRIGGER_REWIND,
    MEDIAN_REFRESH_CYCLES,
};
use crate::error::{Error, Result};
use crate::state::RunState;
use crate::throttle::Throttle;
use crate::trigger;

fn try_alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::Alloc { bytes: len })?;
    buf.resize(len, 0u8);
    Ok(buf)
}

/// Turn a `try_reserve`-style allocation result into the engine's one fatal
/// error variant, tagged with how many bytes the allocation would have
/// needed. Used for every startup allocation, not just the raw byte
/// buffers, so none of them can abort the process (§7.2).
fn alloc<T, E>(result: std::result::Result<T, E>, bytes: usize) -> Result<T> {
    result.map_err(|_| Error::Alloc { bytes })
}

/// The observation engine. Owns every buffer, stack, map and piece of run
/// state for the life of an observation window; nothing is allocated after
/// [Engine::new] returns.
pub struct Engine {
    width: u32,
    height: u32,
    frame_size: usize,
    nfrt: u32,
    nfrl: u32,
    nfrtl: u32,
    stack_gain: i32,

    namer: Namer,

    buffers: DoubleBuffer<Vec<u8>>,
    stacks: DoubleBuffer<Stack>,
    max_maps: DoubleBuffer<MaxMap>,

    buffer_l: Vec<u8>,
    stack_l: Stack,
    max_l: MaxMap,

    stack_t: Stack,

    median_hist: MedianHistogram,
    median_maps: DoubleBuffer<MedianMap>,

    state: RunState,
    throttle: Throttle,
    trigger_stub: Option<PathBuf>,
}

impl Engine {
    pub fn new(width: u32, height: u32, config: &MeteorConfig) -> Result<Self> {
        let frame_size = (width as usize) * (height as usize);
        let fps = config.video_fps as f64;
        let nfrt = constants::nfrt(fps);
        let nfrl = constants::nfrl(fps, nfrt);
        let nfrtl = constants::nfrtl(fps, nfrt);

        let buffer_a = try_alloc_zeroed(frame_size * nfrt as usize)?;
        let buffer_b = try_alloc_zeroed(frame_size * nfrt as usize)?;
        let buffer_l = try_alloc_zeroed(frame_size * nfrl as usize)?;

        let stack_bytes = frame_size * std::mem::size_of::<i32>();
        let max_map_bytes = frame_size;
        let median_map_bytes = frame_size;
        let median_hist_bytes = frame_size * 256;

        let stack_a = alloc(Stack::try_zeroed(width, height), stack_bytes)?;
        let stack_b = alloc(Stack::try_zeroed(width, height), stack_bytes)?;
        let stack_l = alloc(Stack::try_zeroed(width, height), stack_bytes)?;
        let stack_t = alloc(Stack::try_zeroed(width, height), stack_bytes)?;

        let max_a = alloc(MaxMap::try_zeroed(width, height), max_map_bytes)?;
        let max_b = alloc(MaxMap::try_zeroed(width, height), max_map_bytes)?;
        let max_l = alloc(MaxMap::try_zeroed(width, height), max_map_bytes)?;

        let median_hist = alloc(MedianHistogram::try_zeroed(width, height), median_hist_bytes)?;
        let median_map_a = alloc(MedianMap::try_zeroed(width, height), median_map_bytes)?;
        let median_map_b = alloc(MedianMap::try_zeroed(width, height), median_map_bytes)?;

        tracing::info!(
            width,
            height,
            fps = config.video_fps,
            nfrt,
            nfrl,
            nfrtl,
            label = %config.label,
            "engine buffers allocated"
        );

        Ok(Self {
            width,
            height,
            frame_size,
            nfrt,
            nfrl,
            nfrtl,
            stack_gain: config.stack_gain,
            namer: Namer::new(config.output_path.clone(), config.label.clone()),
            buffers: DoubleBuffer::new(buffer_a, buffer_b),
            stacks: DoubleBuffer::new(stack_a, stack_b),
            max_maps: DoubleBuffer::new(max_a, max_b),
            buffer_l,
            stack_l,
            max_l,
            stack_t,
            median_hist,
            median_maps: DoubleBuffer::new(median_map_a, median_map_b),
            state: RunState::new(),
            throttle: Throttle::new(
                config.trigger_throttle_period_minutes,
                config.trigger_throttle_max_events,
            ),
            trigger_stub: None,
        })
    }

    /// Run the observation loop until the source ends or wall-clock UTC
    /// (`now + utc_offset`) reaches `tstop`. Never returns an error for a
    /// source ending or a failed artifact write — those are §7.1/§7.3
    /// conditions, not engine failures.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &dyn ArtifactSink,
        utc_offset: i64,
        tstop: i64,
    ) {
        loop {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
                + utc_offset;
            if now >= tstop {
                tracing::info!("observation window elapsed, stopping");
                break;
            }

            if self.state.frames_since_last_trigger == FRAMES_SINCE_LAST_TRIGGER_REWIND {
                match source.rewind() {
                    Ok(utc) => {
                        self.state.frame_next_target_time = (utc / 60.0).ceil() * 60.0;
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "frame source could not rewind, stopping observation");
                        break;
                    }
                }
            }

            let utc = match self.read_cycle(source) {
                Ok(utc) => utc,
                Err(e) => {
                    tracing::info!(error = %e, "frame source ended, stopping observation");
                    break;
                }
            };

            self.state.frames_since_last_trigger += 1;
            if self.state.frames_since_last_trigger == FRAMES_SINCE_LAST_TRIGGER_ALLOWTRIGGER {
                tracing::debug!("camera is now able to trigger");
            }

            self.refresh_median_if_due();

            if self.state.is_recording() {
                self.advance_recording(sink);
            }

            self.advance_timelapse(sink, utc);

            self.throttle.tick();

            if !self.state.is_recording()
                && self.state.frames_since_last_trigger >= FRAMES_SINCE_LAST_TRIGGER_ALLOWTRIGGER
                && self.throttle.can_trigger()
            {
                self.attempt_trigger(sink, utc);
            }

            if !self.state.is_recording() {
                self.buffers.flip();
                self.stacks.flip();
                self.max_maps.flip();
                self.state.buffer_num = self.buffers.active_index();
            }
        }
    }

    /// Read the next short buffer into whichever raw slot the current
    /// state selects (one of the two alternating short buffers, or the
    /// next slot of the long post-trigger buffer while recording).
    fn read_cycle(&mut self, source: &mut dyn FrameSource) -> meteor_source::Result<UtcSeconds> {
        let nfrt = self.nfrt;
        let frame_size = self.frame_size;
        let recording = self.state.recording;
        let timelapse_active = self.state.is_accumulating_timelapse();

        let stack2 = if timelapse_active {
            Some(&mut self.stack_t)
        } else {
            None
        };

        if recording < 0 {
            crate::stacker::read_short_buffer(
                source,
                nfrt,
                self.buffers.active_mut(),
                self.stacks.active_mut(),
                stack2,
                self.max_maps.active_mut(),
                &mut self.median_hist,
            )
        } else {
            let offset = frame_size * nfrt as usize * recording as usize;
            let slot = &mut self.buffer_l[offset..offset + frame_size * nfrt as usize];
            crate::stacker::read_short_buffer(
                source,
                nfrt,
                slot,
                self.stacks.active_mut(),
                stack2,
                self.max_maps.active_mut(),
                &mut self.median_hist,
            )
        }
    }

    fn refresh_median_if_due(&mut self) {
        self.state.median_count += 1;
        if self.state.median_count == MEDIAN_REFRESH_CYCLES {
            let new_median = self.median_hist.compute_median();
            *self.median_maps.idle_mut() = new_median;
            self.median_maps.flip();
            self.median_hist.reset();
            self.state.median_count = 0;
            self.state.median_num = self.median_maps.active_index();
        }
    }

    fn advance_recording(&mut self, sink: &dyn ArtifactSink) {
        self.max_l.merge(self.max_maps.active());
        self.stack_l.accumulate_stack(self.stacks.active());
        self.state.recording += 1;

        if self.state.recording as u32 >= self.nfrl / self.nfrt {
            self.flush_post_event(sink);
            self.state.recording = -1;
            self.state.frames_since_last_trigger = 0;
        }
    }

    fn flush_post_event(&mut self, sink: &dyn ArtifactSink) {
        let Some(stub) = self.trigger_stub.clone() else {
            tracing::error!("recording completed with no trigger stub set, dropping artifacts");
            return;
        };
        let nfr = self.nfrt + self.nfrl;
        composer::flush_stack_triplet(
            sink,
            &stub,
            "3_",
            &self.stack_l,
            &self.max_l,
            nfr,
            self.stack_gain,
            self.median_maps.active(),
        );

        let mut video = Vec::with_capacity(self.frame_size * (2 * self.nfrt as usize + self.nfrl as usize));
        video.extend_from_slice(self.buffers.idle());
        video.extend_from_slice(self.buffers.active());
        video.extend_from_slice(&self.buffer_l);
        let frame_count = 2 * self.nfrt + self.nfrl;
        composer::flush_video(sink, &stub, frame_count, &video);
    }

    fn advance_timelapse(&mut self, sink: &dyn ArtifactSink, utc: UtcSeconds) {
        if self.state.is_accumulating_timelapse() {
            self.state.timelapse_count += 1;
        } else if utc > self.state.frame_next_target_time {
            self.stack_t.zero();
            self.state.timelapse_count = 0;
        }

        if self.state.is_accumulating_timelapse()
            && self.state.timelapse_count as u32 >= self.nfrtl / self.nfrt
        {
            match self.namer.generate(utc, "frame_", Category::TimelapseRaw) {
                Ok(stub) => composer::flush_timelapse(
                    sink,
                    &stub,
                    &self.stack_t,
                    self.nfrtl,
                    self.stack_gain,
                    self.median_maps.active(),
                ),
                Err(e) => tracing::error!(error = %e, "failed to generate timelapse stub"),
            }
            self.state.frame_next_target_time += 60.0;
            self.state.timelapse_count = -1;
        }
    }

    fn attempt_trigger(&mut self, sink: &dyn ArtifactSink, utc: UtcSeconds) {
        let outcome = trigger::test_trigger(
            self.width,
            self.height,
            self.stacks.active(),
            self.stacks.idle(),
            self.nfrt,
        );
        if !outcome.fired {
            return;
        }

        self.throttle.record_trigger();

        let stub = match self.namer.generate(utc, "trigger", Category::TriggersRaw) {
            Ok(stub) => stub,
            Err(e) => {
                tracing::error!(error = %e, "failed to generate trigger stub, dropping artifacts");
                return;
            }
        };
        self.trigger_stub = Some(stub.clone());

        composer::flush_stack_triplet(
            sink,
            &stub,
            "1_",
            self.stacks.idle(),
            self.max_maps.idle(),
            self.nfrt,
            self.stack_gain,
            self.median_maps.active(),
        );
        composer::flush_stack_triplet(
            sink,
            &stub,
            "2_",
            self.stacks.active(),
            self.max_maps.active(),
            self.nfrt,
            self.stack_gain,
            self.median_maps.active(),
        );
        composer::flush_diagnostic_map(sink, &stub, &outcome.diagnostic_rgb);

        self.max_l.zero();
        self.max_l.merge(self.max_maps.active());
        self.stack_l.zero();
        self.stack_l.accumulate_stack(self.stacks.active());
        self.state.recording = 0;
    }
}

/// Entry point matching §6's `observe(source, sink, config, utc_offset,
/// tstart, tstop)`. `tstart` is logged only; the loop itself is bounded by
/// `tstop` and by the source running out of frames.
pub fn observe(
    source: &mut dyn FrameSource,
    sink: &dyn ArtifactSink,
    config: &MeteorConfig,
    utc_offset: i64,
    tstart: i64,
    tstop: i64,
) -> Result<()> {
    tracing::info!(tstart, tstop, "starting observation run");
    let mut engine = Engine::new(source.width(), source.height(), config)?;
    engine.run(source, sink, utc_offset, tstop);
    Ok(())
}
