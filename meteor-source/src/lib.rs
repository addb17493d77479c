//! The video-capture source the observation engine pulls frames from.
//!
//! This is deliberately interface-only: out-of-scope collaborators (device
//! open, pixel-format conversion) live behind [FrameSource]. The engine
//! itself only ever calls [FrameSource::fetch] and [FrameSource::rewind],
//! mirroring the reference codebase's `ci2::Camera` trait, which similarly
//! separates "what acquisition looks like" from any particular camera
//! backend.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use meteor_frame::{Frame, UtcSeconds};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The source has no more frames to give. The engine treats this the
    /// same as any other fetch failure: terminate the observation loop
    /// cleanly between cycles.
    #[error("end of stream")]
    EndOfStream,

    #[error("could not read frame source {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frame source error: {0}")]
    Other(String),
}

/// Supplies one frame plus UTC timestamp per call; supports optional rewind.
pub trait FrameSource {
    /// Copy one frame's worth of 8-bit luminance into `out`, which must
    /// already be sized `width * height`. Blocks until a frame is available.
    fn fetch(&mut self, out: &mut [u8]) -> Result<UtcSeconds>;

    /// Position the source so the next `fetch` returns the earliest
    /// available frame, returning its timestamp.
    ///
    /// Live capture sources implement this as a no-op returning the current
    /// time; a source backed by recorded frames rewinds to the start.
    fn rewind(&mut self) -> Result<UtcSeconds>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// A [FrameSource] backed by a fixed, in-memory sequence of frames.
///
/// Used by tests and by the `make-median-map`/`vid-rec` utility binaries
/// when driven against pre-recorded data rather than a live camera.
pub struct FiniteFrameSource {
    width: u32,
    height: u32,
    frames: Vec<Frame>,
    next: usize,
}

impl FiniteFrameSource {
    pub fn new(width: u32, height: u32, frames: Vec<Frame>) -> Self {
        Self {
            width,
            height,
            frames,
            next: 0,
        }
    }
}

impl FrameSource for FiniteFrameSource {
    fn fetch(&mut self, out: &mut [u8]) -> Result<UtcSeconds> {
        if self.next >= self.frames.len() {
            return Err(Error::EndOfStream);
        }
        let frame = &self.frames[self.next];
        out.copy_from_slice(&frame.data);
        self.next += 1;
        Ok(frame.utc)
    }

    fn rewind(&mut self) -> Result<UtcSeconds> {
        self.next = 0;
        Ok(self.frames.first().map(|f| f.utc).unwrap_or(0.0))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// A [FrameSource] backed by a plain file of concatenated raw 8-bit
/// luminance frames (the same layout as one `.rawimg` artifact repeated
/// `n` times), used by the `meteor-cli` utility binaries when run against
/// pre-recorded data rather than a live camera.
pub struct RawFileFrameSource {
    width: u32,
    height: u32,
    frame_size: usize,
    fps: f64,
    reader: BufReader<File>,
    base_utc: UtcSeconds,
    frame_index: u64,
}

impl RawFileFrameSource {
    pub fn open(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_utc = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Ok(Self {
            width,
            height,
            frame_size: (width as usize) * (height as usize),
            fps,
            reader: BufReader::new(file),
            base_utc,
            frame_index: 0,
        })
    }

    fn utc_at(&self, frame_index: u64) -> UtcSeconds {
        self.base_utc + (frame_index as f64) / self.fps
    }
}

impl FrameSource for RawFileFrameSource {
    fn fetch(&mut self, out: &mut [u8]) -> Result<UtcSeconds> {
        debug_assert_eq!(out.len(), self.frame_size);
        match self.reader.read_exact(out) {
            Ok(()) => {
                let utc = self.utc_at(self.frame_index);
                self.frame_index += 1;
                Ok(utc)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::EndOfStream),
            Err(source) => Err(Error::Other(source.to_string())),
        }
    }

    fn rewind(&mut self) -> Result<UtcSeconds> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|source| Error::Other(source.to_string()))?;
        self.frame_index = 0;
        Ok(self.utc_at(0))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
