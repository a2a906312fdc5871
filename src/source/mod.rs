// SPDX-License-Identifier: MPL-2.0

//! Decoders that turn a video resource into a sequence of raster frames.
//!
//! # Module Structure
//!
//! - [`detection`]: source classification by URI scheme and extension
//! - [`gif`]: CPU-decoded animated GIFs via the `image` crate
//! - `gst`: GStreamer `uridecodebin` playback (cargo feature `gstreamer`)
//!
//! | Source | Decoder |
//! |--------|---------|
//! | `.gif` | [`GifSource`] |
//! | `.mp4`, `.webm`, `.mkv`, `.avi`, `.mov`, `.m4v`, `.ogv`, `.wmv`, `.flv` | `GstSource` |
//! | `scheme://...` | `GstSource` |
//! | `.exe` | rejected |

pub mod detection;
mod gif;
#[cfg(feature = "gstreamer")]
mod gst;

use std::path::Path;

use tracing::{debug, info};

pub use detection::{SourceKind, classify};
pub use gif::GifSource;
#[cfg(feature = "gstreamer")]
pub use gst::GstSource;

use crate::{error::StartupError, frame::Frame, signals::CancelToken};

/// Result of asking a source for its next frame.
#[derive(Debug)]
pub enum Next {
    Frame(Frame),
    EndOfStream,
    Error(eyre::Report),
}

impl From<Frame> for Next {
    /// An empty frame signals the end of the stream.
    fn from(frame: Frame) -> Self {
        if frame.is_empty() {
            Self::EndOfStream
        } else {
            Self::Frame(frame)
        }
    }
}

/// The decoding collaborator driven by the render loop.
pub trait FrameSource {
    /// Native frame rate in frames per second as reported by the stream.
    /// May be zero or non-finite when the container does not say.
    fn frame_rate(&self) -> f64;

    /// Decode the next frame, blocking until one is available.
    fn next_frame(&mut self) -> Next;

    /// Restart the stream from its first frame.
    fn rewind(&mut self) -> eyre::Result<()>;

    /// Human-readable name of the resource for logs.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn frame_rate(&self) -> f64 {
        (**self).frame_rate()
    }

    fn next_frame(&mut self) -> Next {
        (**self).next_frame()
    }

    fn rewind(&mut self) -> eyre::Result<()> {
        (**self).rewind()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Open `location` with the decoder matching its kind.
///
/// Sources that block on I/O stop waiting once `cancel` fires.
pub fn open(location: &str, cancel: &CancelToken) -> Result<Box<dyn FrameSource>, StartupError> {
    if location.trim().is_empty() {
        return Err(StartupError::Argument("the source argument is empty".into()));
    }

    let kind = classify(location);
    debug!(location, ?kind, "Classified source");

    if kind == SourceKind::Executable {
        return Err(StartupError::source_open(
            location,
            "interactive wallpapers are not supported",
        ));
    }

    if kind != SourceKind::Uri && !Path::new(location).is_file() {
        return Err(StartupError::source_open(location, "no such file"));
    }

    let source = match kind {
        SourceKind::Gif => GifSource::open(Path::new(location))
            .map(|source| Box::new(source) as Box<dyn FrameSource>)
            .map_err(|e| StartupError::source_open(location, format!("{e:#}")))?,
        _ => open_stream(location, cancel)?,
    };

    info!(
        source = %source.describe(),
        fps = source.frame_rate(),
        "Opened video source"
    );
    Ok(source)
}

#[cfg(feature = "gstreamer")]
fn open_stream(location: &str, cancel: &CancelToken) -> Result<Box<dyn FrameSource>, StartupError> {
    GstSource::open(location, cancel.clone())
        .map(|source| Box::new(source) as Box<dyn FrameSource>)
        .map_err(|e| StartupError::source_open(location, format!("{e:#}")))
}

#[cfg(not(feature = "gstreamer"))]
fn open_stream(location: &str, _cancel: &CancelToken) -> Result<Box<dyn FrameSource>, StartupError> {
    Err(StartupError::source_open(
        location,
        "video playback requires a build with the `gstreamer` feature",
    ))
}
