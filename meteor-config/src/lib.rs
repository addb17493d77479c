//! Loads the engine's startup constants from a TOML file.
//!
//! Grounded in the reference codebase's `braid-config-data` crate: a plain
//! `serde`-derived struct, `#[serde(default = ...)]` per field so a config
//! file need only override what differs from the reference C
//! implementation's `#define`s, and `shellexpand` applied to the one
//! filesystem path so `~` and `$VAR` work the way they do in the reference
//! config loader.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not expand output_path {raw:?}: {source}")]
    ShellExpand {
        raw: String,
        #[source]
        source: shellexpand::LookupError<std::env::VarError>,
    },
}

fn default_video_width() -> u32 {
    720
}

fn default_video_height() -> u32 {
    480
}

fn default_video_fps() -> u32 {
    30
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./meteor_data")
}

fn default_stack_gain() -> i32 {
    4
}

fn default_trigger_throttle_period_minutes() -> u32 {
    60
}

fn default_trigger_throttle_max_events() -> u32 {
    10
}

fn default_label() -> String {
    "allsky1".to_string()
}

/// Startup constants for one observation run.
///
/// Mirrors the reference C implementation's compile-time `#define`s
/// (`VIDEO_WIDTH`, `VIDEO_HEIGHT`, `VIDEO_FPS`, `OUTPUT_PATH`,
/// `STACK_GAIN`, `TRIGGER_THROTTLE_PERIOD`, `TRIGGER_THROTTLE_MAXEVT`) as a
/// loadable struct instead, so a deployment need only ship a config file
/// for what differs from the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeteorConfig {
    #[serde(default = "default_video_width")]
    pub video_width: u32,
    #[serde(default = "default_video_height")]
    pub video_height: u32,
    #[serde(default = "default_video_fps")]
    pub video_fps: u32,
    /// Output root directory. May contain `~` and `$VAR`/`${VAR}`
    /// references, expanded at load time.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_stack_gain")]
    pub stack_gain: i32,
    #[serde(default = "default_trigger_throttle_period_minutes")]
    pub trigger_throttle_period_minutes: u32,
    #[serde(default = "default_trigger_throttle_max_events")]
    pub trigger_throttle_max_events: u32,
    /// Camera label, used in artifact directory names
    /// (`triggers_raw_<label>`, `timelapse_raw_<label>`).
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for MeteorConfig {
    fn default() -> Self {
        Self {
            video_width: default_video_width(),
            video_height: default_video_height(),
            video_fps: default_video_fps(),
            output_path: default_output_path(),
            stack_gain: default_stack_gain(),
            trigger_throttle_period_minutes: default_trigger_throttle_period_minutes(),
            trigger_throttle_max_events: default_trigger_throttle_max_events(),
            label: default_label(),
        }
    }
}

impl MeteorConfig {
    /// Parse `toml_str`, applying defaults for any field left unset, then
    /// expand `output_path`.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut config: MeteorConfig =
            toml::from_str(toml_str).map_err(|source| Error::Parse {
                path: PathBuf::from("<string>"),
                source,
            })?;
        config.expand_output_path()?;
        Ok(config)
    }

    /// Load and parse a config file from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: MeteorConfig =
            toml::from_str(&raw).map_err(|source| Error::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.expand_output_path()?;
        Ok(config)
    }

    fn expand_output_path(&mut self) -> Result<()> {
        let raw = self.output_path.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw).map_err(|source| Error::ShellExpand {
            raw: raw.clone(),
            source,
        })?;
        self.output_path = PathBuf::from(expanded.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = MeteorConfig::default();
        assert_eq!(config.video_width, 720);
        assert_eq!(config.video_height, 480);
        assert_eq!(config.video_fps, 30);
        assert_eq!(config.stack_gain, 4);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = MeteorConfig::from_toml_str("video_fps = 25\nlabel = \"cam7\"\n").unwrap();
        assert_eq!(config.video_fps, 25);
        assert_eq!(config.label, "cam7");
        assert_eq!(config.video_width, 720);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = MeteorConfig::from_toml_str("bogus_field = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn output_path_expands_home_tilde() {
        std::env::set_var("HOME", "/home/meteor-test");
        let config = MeteorConfig::from_toml_str("output_path = \"~/data\"\n").unwrap();
        assert_eq!(config.output_path, PathBuf::from("/home/meteor-test/data"));
    }
}
