//! Command-line front end for the observation engine and its offline
//! utility modes.
//!
//! Grounded in the reference codebase's small `clap`+`anyhow` utility
//! binaries (e.g. `media-utils/dump-frame`): one `Cli` enum, one `main`
//! that installs a tracing subscriber and dispatches.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use meteor_config::MeteorConfig;
use meteor_frame::{MedianHistogram, Stack};
use meteor_sink::{ArtifactSink, FsArtifactSink};
use meteor_source::{FrameSource, RawFileFrameSource};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the observation loop against a raw frame file, writing triggered
    /// and timelapse artifacts to disk.
    Observe {
        /// Raw 8-bit luminance frames, concatenated, `width * height` bytes each.
        input: PathBuf,

        /// TOML configuration file; defaults are used for anything unset
        /// and when this flag is omitted entirely.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 720)]
        width: u32,

        #[arg(long, default_value_t = 480)]
        height: u32,

        /// Offset, in seconds, added to the local wall clock to obtain UTC.
        #[arg(long, default_value_t = 0)]
        utc_offset: i64,

        #[arg(long, default_value_t = 0)]
        tstart: i64,

        /// UTC second at which to stop; omit to run until the input ends.
        #[arg(long)]
        tstop: Option<i64>,
    },

    /// Stack 256 cycles of 25 frames from a raw frame file and write the
    /// resulting per-pixel median map as a plain `.rawimg`.
    MakeMedianMap {
        output: PathBuf,
        input: PathBuf,

        #[arg(long, default_value_t = 720)]
        width: u32,

        #[arg(long, default_value_t = 480)]
        height: u32,
    },

    /// Copy a fixed duration from a raw frame file into a `.rawvid`
    /// (frame-count header followed by the raw frames).
    VidRec {
        output: PathBuf,
        input: PathBuf,

        #[arg(long, default_value_t = 720)]
        width: u32,

        #[arg(long, default_value_t = 480)]
        height: u32,

        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        #[arg(long, default_value_t = 4.0)]
        duration_secs: f64,
    },
}

fn main() -> Result<()> {
    let _guard = env_tracing_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Observe {
            input,
            config,
            width,
            height,
            utc_offset,
            tstart,
            tstop,
        } => run_observe(input, config, width, height, utc_offset, tstart, tstop),
        Command::MakeMedianMap {
            output,
            input,
            width,
            height,
        } => run_make_median_map(output, input, width, height),
        Command::VidRec {
            output,
            input,
            width,
            height,
            fps,
            duration_secs,
        } => run_vid_rec(output, input, width, height, fps, duration_secs),
    }
}

fn run_observe(
    input: PathBuf,
    config: Option<PathBuf>,
    width: u32,
    height: u32,
    utc_offset: i64,
    tstart: i64,
    tstop: Option<i64>,
) -> Result<()> {
    let config = match config {
        Some(path) => MeteorConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MeteorConfig::default(),
    };

    let mut source = RawFileFrameSource::open(&input, width, height, config.video_fps as f64)
        .with_context(|| format!("opening frame source {}", input.display()))?;
    let sink = FsArtifactSink::new();
    let tstop = tstop.unwrap_or(i64::MAX);

    meteor_core::observe(&mut source, &sink, &config, utc_offset, tstart, tstop)
        .context("observation run failed")?;
    Ok(())
}

fn run_make_median_map(output: PathBuf, input: PathBuf, width: u32, height: u32) -> Result<()> {
    const CYCLES: u32 = 256;
    const FRAMES_PER_CYCLE: u32 = 25;

    let mut source = RawFileFrameSource::open(&input, width, height, 30.0)
        .with_context(|| format!("opening frame source {}", input.display()))?;

    let mut stack = Stack::zeroed(width, height);
    let mut hist = MedianHistogram::zeroed(width, height);
    let mut frame_buf = vec![0u8; (width as usize) * (height as usize)];

    for cycle in 0..CYCLES {
        stack.zero();
        for _ in 0..FRAMES_PER_CYCLE {
            match source.fetch(&mut frame_buf) {
                Ok(_) => stack.accumulate_slice(&frame_buf),
                Err(e) => {
                    tracing::warn!(cycle, error = %e, "frame source ended early, using cycles gathered so far");
                    let median = hist.compute_median();
                    FsArtifactSink::new()
                        .write_image(&output, &median.data)
                        .context("writing median map")?;
                    return Ok(());
                }
            }
        }
        hist.record(&stack);
    }

    let median = hist.compute_median();
    FsArtifactSink::new()
        .write_image(&output, &median.data)
        .context("writing median map")?;
    Ok(())
}

fn run_vid_rec(
    output: PathBuf,
    input: PathBuf,
    width: u32,
    height: u32,
    fps: f64,
    duration_secs: f64,
) -> Result<()> {
    let mut source = RawFileFrameSource::open(&input, width, height, fps)
        .with_context(|| format!("opening frame source {}", input.display()))?;

    let frame_size = (width as usize) * (height as usize);
    let n_frames = (fps * duration_secs).round().max(1.0) as u32;
    let mut data = Vec::with_capacity(frame_size * n_frames as usize);
    let mut frame_buf = vec![0u8; frame_size];
    let mut recorded = 0u32;

    for _ in 0..n_frames {
        match source.fetch(&mut frame_buf) {
            Ok(_) => {
                data.extend_from_slice(&frame_buf);
                recorded += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, "frame source ended before requested duration");
                break;
            }
        }
    }

    FsArtifactSink::new()
        .write_video(&output, recorded, &data)
        .context("writing raw video")?;
    Ok(())
}
