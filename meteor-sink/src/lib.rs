//! Persists the fixed set of artifacts the observation engine emits:
//! `.rawimg` (8-bit luminance), `.rawrgb` (packed RGB8 diagnostics) and
//! `.rawvid` (a frame-count header followed by a raw frame sequence).
//!
//! The distilled spec treats the artifact sink as an external collaborator;
//! this crate is the engine's one seam onto the filesystem, in the spirit of
//! the reference codebase's writer crates (e.g. `bg-movie-writer`), which
//! likewise keep "how bytes get encoded" inside the engine and "where bytes
//! land" behind a small trait.

use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists images, integer-stacks, and video buffers under a generated
/// path. Implementations must not panic; a failed write is reported via
/// `Result` so the caller can log and continue (§7: sink errors are never
/// fatal to the observation loop).
pub trait ArtifactSink {
    /// Write a plain 8-bit luminance image (`width * height` bytes).
    fn write_image(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Write a packed RGB8 diagnostic map (`width * height * 3` bytes).
    fn write_rgb(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Write a raw frame sequence, prefixed with a 32-bit little-endian
    /// frame-count header.
    fn write_video(&self, path: &Path, frame_count: u32, data: &[u8]) -> Result<()>;
}

/// The default, real collaborator: writes each artifact as a single file
/// under a root directory. Parent directories are created by the namer
/// (`meteor-namer`), not here; this sink only ever performs the final
/// write.
#[derive(Debug, Clone, Default)]
pub struct FsArtifactSink;

impl FsArtifactSink {
    pub fn new() -> Self {
        Self
    }

    fn write_all(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = std::fs::File::create(path).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
        file.write_all(data).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "wrote artifact");
        Ok(())
    }
}

impl ArtifactSink for FsArtifactSink {
    fn write_image(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.write_all(path, data)
    }

    fn write_rgb(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.write_all(path, data)
    }

    fn write_video(&self, path: &Path, frame_count: u32, data: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(4 + data.len());
        buf.write_u32::<LittleEndian>(frame_count)
            .expect("writing to a Vec cannot fail");
        buf.extend_from_slice(data);
        self.write_all(path, &buf)
    }
}

/// An in-memory recorder, standing in for the filesystem in tests: every
/// write is appended to a vector instead of touching disk, so integration
/// tests can assert on the exact set of artifacts a scenario produced.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: std::sync::Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every path written so far, in write order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// The bytes written to `path`, if any write targeted it.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, data)| data.clone())
    }

    fn record(&self, path: &Path, data: Vec<u8>) {
        self.writes.lock().unwrap().push((path.to_path_buf(), data));
    }
}

impl ArtifactSink for MemorySink {
    fn write_image(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.record(path, data.to_vec());
        Ok(())
    }

    fn write_rgb(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.record(path, data.to_vec());
        Ok(())
    }

    fn write_video(&self, path: &Path, frame_count: u32, data: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(4 + data.len());
        buf.write_u32::<LittleEndian>(frame_count)
            .expect("writing to a Vec cannot fail");
        buf.extend_from_slice(data);
        self.record(path, buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_video_header() {
        let sink = MemorySink::new();
        let path = PathBuf::from("/tmp/x.rawvid");
        sink.write_video(&path, 3, &[1, 2, 3, 4]).unwrap();
        let bytes = sink.contents(&path).unwrap();
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..], &[1, 2, 3, 4]);
    }

    #[test]
    fn fs_sink_writes_plain_bytes_for_images() {
        let dir = std::env::temp_dir().join(format!("meteor-sink-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("a.rawimg");
        let sink = FsArtifactSink::new();
        sink.write_image(&path, &[9, 8, 7]).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, vec![9, 8, 7]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
