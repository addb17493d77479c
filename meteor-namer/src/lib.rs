//! Maps a UTC second count to a timestamped output-path stub, per category.
//!
//! Grounded in the reference implementation's `fNameGenerate`, which builds
//! `{OUTPUT_PATH}/{dirname}_{label}/{YYYYMMDD}/{YYYYMMDDhhmmss}_{tag}` and
//! shells out to `mkdir -p` to ensure the day directory exists. This version
//! keeps the path format exactly but creates the directory with
//! [std::fs::create_dir_all] (§9 design notes: divergence from shelling out
//! is purely an implementation detail, not an observable behavior change).

use std::path::PathBuf;

use meteor_frame::utc_seconds_to_datetime;
use meteor_frame::UtcSeconds;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The two artifact categories the engine writes under `OUTPUT_PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    TriggersRaw,
    TimelapseRaw,
}

impl Category {
    fn dirname(self) -> &'static str {
        match self {
            Category::TriggersRaw => "triggers_raw",
            Category::TimelapseRaw => "timelapse_raw",
        }
    }
}

/// Generates timestamped filename stubs and ensures their parent directory
/// exists.
#[derive(Debug, Clone)]
pub struct Namer {
    output_path: PathBuf,
    label: String,
}

impl Namer {
    pub fn new(output_path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            label: label.into(),
        }
    }

    /// Build a stub `<outroot>/<category>_<label>/<YYYYMMDD>/<YYYYMMDDhhmmss>_<tag>`
    /// and create the day directory if it does not already exist.
    ///
    /// The day directory's calendar date is computed from `utc - 12h`, not
    /// `utc` itself, matching the reference implementation's `fNameGenerate`
    /// (`JD-0.5`, "days start at noon, not midnight"): an overnight run that
    /// crosses UTC midnight still lands under one day directory. The stub's
    /// own `hhmmss` timestamp uses the unshifted `utc`.
    pub fn generate(&self, utc: UtcSeconds, tag: &str, category: Category) -> Result<PathBuf> {
        const NOON_SHIFT_SECONDS: f64 = 12.0 * 3600.0;
        let dir_dt = utc_seconds_to_datetime(utc - NOON_SHIFT_SECONDS);
        let stub_dt = utc_seconds_to_datetime(utc);
        let day_dir = self.output_path.join(format!(
            "{}_{}",
            category.dirname(),
            self.label
        ));
        let day_dir = day_dir.join(dir_dt.format("%Y%m%d").to_string());
        std::fs::create_dir_all(&day_dir).map_err(|source| Error::CreateDir {
            path: day_dir.clone(),
            source,
        })?;
        let stub = day_dir.join(format!("{}_{}", stub_dt.format("%Y%m%d%H%M%S"), tag));
        Ok(stub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_format_matches_convention() {
        let dir = tempfile::tempdir().unwrap();
        let namer = Namer::new(dir.path(), "allsky1");
        // 2015-01-02T15:04:05Z: well after the noon boundary, so the day
        // directory and the stub's own date agree.
        let utc = 1420211045.0;
        let stub = namer.generate(utc, "trigger", Category::TriggersRaw).unwrap();
        let stub_str = stub.to_string_lossy();
        assert!(stub_str.ends_with("20150102150405_trigger"));
        assert!(stub_str.contains("triggers_raw_allsky1"));
        assert!(stub_str.contains("20150102/"));
    }

    #[test]
    fn day_directory_uses_noon_boundary_not_midnight() {
        let dir = tempfile::tempdir().unwrap();
        let namer = Namer::new(dir.path(), "allsky1");
        // 2015-01-02T03:04:05Z: before noon, so it belongs to the
        // observing night that started 2015-01-01, matching the reference
        // implementation's JD-0.5 day-directory shift.
        let utc = 1420167845.0;
        let stub = namer.generate(utc, "trigger", Category::TriggersRaw).unwrap();
        let stub_str = stub.to_string_lossy();
        assert!(stub_str.ends_with("20150102030405_trigger"));
        assert!(stub_str.contains("20150101/"));
    }

    #[test]
    fn day_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let namer = Namer::new(dir.path(), "cam0");
        let stub = namer
            .generate(1420167845.0, "frame_", Category::TimelapseRaw)
            .unwrap();
        assert!(stub.parent().unwrap().is_dir());
    }
}
