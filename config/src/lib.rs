// SPDX-License-Identifier: MPL-2.0-only

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const NAME: &str = "vidpaper";
pub const CONFIG_FILE: &str = "config.ron";

/// Errors raised while reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// How the render loop blocks for the remainder of a frame budget.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub enum WaitStrategy {
    /// Poll the high-resolution counter until the deadline.
    #[default]
    Spin,
    /// Sleep until `spin_margin_ms` before the deadline, then poll.
    Hybrid { spin_margin_ms: f64 },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Setters)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct Pacing {
    /// wait primitive used between frames
    pub wait: WaitStrategy,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Setters)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct Playback {
    /// restart the source when it reaches its end
    pub looping: bool,
    /// ignore the rate reported by the source and use this one
    #[setters(strip_option)]
    pub frame_rate_override: Option<f64>,
    /// rate used when the source reports none
    pub fallback_frame_rate: f64,
    /// number of frames between progress log records
    pub progress_interval: u64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            looping: false,
            frame_rate_override: None,
            fallback_frame_rate: 60.0,
            progress_interval: 300,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Setters)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct Config {
    pub pacing: Pacing,
    pub playback: Playback,
    /// `tracing` filter directive, used when `RUST_LOG` is unset
    #[setters(strip_option)]
    pub log_filter: Option<String>,
}

impl Config {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(NAME).join(CONFIG_FILE))
    }

    /// Load the configuration from the default location.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, Error> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no configuration directory on this system");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(why) if why.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        ron::from_str(&text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
