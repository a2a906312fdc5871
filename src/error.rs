// SPDX-License-Identifier: MPL-2.0

//! Fatal startup conditions and the process exit codes they map to.

/// Exit status for a missing argument or an unusable source.
pub const EXIT_USAGE: u8 = 1;
/// Exit status when the display or desktop surface cannot be discovered.
pub const EXIT_ENVIRONMENT: u8 = 2;
/// Exit status when no high-resolution clock is available.
pub const EXIT_CLOCK: u8 = 3;

/// Conditions that abort the process before the first frame is read.
///
/// None of these are retried: each reflects an environment precondition
/// that does not change within the lifetime of the process.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("a video file or URL must be passed: {0}")]
    Argument(String),

    #[error("the provided video file/URL was not valid: {location}: {reason}")]
    SourceOpen { location: String, reason: String },

    #[error("could not retrieve current display settings: {0}")]
    DisplayQuery(String),

    #[error("desktop background surface unavailable: {0}")]
    SurfaceDiscovery(String),

    #[error("desktop wallpaper rendering is not supported on this platform")]
    UnsupportedPlatform,

    #[error("no usable high-resolution clock: {0}")]
    ClockUnavailable(String),
}

impl StartupError {
    pub fn source_open(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SourceOpen {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Argument(_) | Self::SourceOpen { .. } => EXIT_USAGE,
            Self::DisplayQuery(_) | Self::SurfaceDiscovery(_) | Self::UnsupportedPlatform => {
                EXIT_ENVIRONMENT
            }
            Self::ClockUnavailable(_) => EXIT_CLOCK,
        }
    }
}
