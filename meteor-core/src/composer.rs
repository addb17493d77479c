//! Artifact composer (C10): emits the fixed set of files around each
//! trigger, and the two timelapse files, via the [ArtifactSink]. Every
//! write here is logged-and-ignored on failure (§7.3: no artifact is
//! critical enough to stop the observation loop).

use std::path::{Path, PathBuf};

use meteor_frame::{MaxMap, MedianMap, Stack};
use meteor_sink::ArtifactSink;

/// Build `<stub><suffix>`, matching the reference implementation's
/// `sprintf(fname, "%s%s", triggerstub, suffix)` string concatenation.
pub fn artifact_path(stub: &Path, suffix: &str) -> PathBuf {
    let mut joined = stub.as_os_str().to_os_string();
    joined.push(suffix);
    PathBuf::from(joined)
}

/// Write the `{prefix}BS0.rawimg`, `{prefix}BS1.rawimg` and
/// `{prefix}MAX.rawimg` triplet for one stack/max-map pair (used for the
/// `1_`, `2_` and `3_` artifact groups).
pub fn flush_stack_triplet(
    sink: &dyn ArtifactSink,
    stub: &Path,
    prefix: &str,
    stack: &Stack,
    max_map: &MaxMap,
    nfr: u32,
    stack_gain: i32,
    median: &MedianMap,
) {
    let bs0_path = artifact_path(stub, &format!("{prefix}BS0.rawimg"));
    if let Err(e) = sink.write_image(&bs0_path, &stack.encode_plain(nfr, 1)) {
        tracing::error!(error = %e, path = %bs0_path.display(), "failed to write BS0 artifact");
    }

    let bs1_path = artifact_path(stub, &format!("{prefix}BS1.rawimg"));
    if let Err(e) = sink.write_image(&bs1_path, &stack.encode_subtracted(nfr, stack_gain, &median.data)) {
        tracing::error!(error = %e, path = %bs1_path.display(), "failed to write BS1 artifact");
    }

    let max_path = artifact_path(stub, &format!("{prefix}MAX.rawimg"));
    if let Err(e) = sink.write_image(&max_path, &max_map.data) {
        tracing::error!(error = %e, path = %max_path.display(), "failed to write MAX artifact");
    }
}

/// Write the diagnostic `_MAP.rawrgb` produced by the trigger detector.
pub fn flush_diagnostic_map(sink: &dyn ArtifactSink, stub: &Path, diagnostic_rgb: &[u8]) {
    let path = artifact_path(stub, "_MAP.rawrgb");
    if let Err(e) = sink.write_rgb(&path, diagnostic_rgb) {
        tracing::error!(error = %e, path = %path.display(), "failed to write diagnostic map");
    }
}

/// Write the assembled pre+trigger+post video.
pub fn flush_video(sink: &dyn ArtifactSink, stub: &Path, frame_count: u32, data: &[u8]) {
    let path = artifact_path(stub, ".rawvid");
    if let Err(e) = sink.write_video(&path, frame_count, data) {
        tracing::error!(error = %e, path = %path.display(), "failed to write rawvid artifact");
    }
}

/// Write one timelapse exposure's `BS0.rawimg`/`BS1.rawimg` pair under a
/// namer-provided `frame_` stub (C8).
pub fn flush_timelapse(
    sink: &dyn ArtifactSink,
    stub: &Path,
    stack: &Stack,
    nfr: u32,
    stack_gain: i32,
    median: &MedianMap,
) {
    let bs0_path = artifact_path(stub, "BS0.rawimg");
    if let Err(e) = sink.write_image(&bs0_path, &stack.encode_plain(nfr, 1)) {
        tracing::error!(error = %e, path = %bs0_path.display(), "failed to write timelapse BS0 artifact");
    }

    let bs1_path = artifact_path(stub, "BS1.rawimg");
    if let Err(e) = sink.write_image(&bs1_path, &stack.encode_subtracted(nfr, stack_gain, &median.data)) {
        tracing::error!(error = %e, path = %bs1_path.display(), "failed to write timelapse BS1 artifact");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteor_sink::MemorySink;

    #[test]
    fn artifact_path_concatenates_without_separator() {
        let stub = PathBuf::from("/out/20250101120000_trigger");
        let path = artifact_path(&stub, "1_BS0.rawimg");
        assert_eq!(path, PathBuf::from("/out/20250101120000_trigger1_BS0.rawimg"));
    }

    #[test]
    fn flush_stack_triplet_writes_three_files() {
        let sink = MemorySink::new();
        let stub = PathBuf::from("/out/stub");
        let stack = Stack {
            width: 2,
            height: 1,
            data: vec![20, 20],
            n_frames: 1,
        };
        let max_map = MaxMap::zeroed(2, 1);
        let median = MedianMap::zeroed(2, 1);
        flush_stack_triplet(&sink, &stub, "2_", &stack, &max_map, 1, 4, &median);
        let paths = sink.paths();
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&PathBuf::from("/out/stub2_BS0.rawimg")));
        assert!(paths.contains(&PathBuf::from("/out/stub2_BS1.rawimg")));
        assert!(paths.contains(&PathBuf::from("/out/stub2_MAX.rawimg")));
    }
}
