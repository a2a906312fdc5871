// SPDX-License-Identifier: MPL-2.0

//! Classification of the source argument.
//!
//! Dispatch is by URI scheme and file extension only; whether a container
//! is actually decodable is left to the decoder that opens it.

use std::path::Path;

/// Video container extensions handed to the streaming decoder.
/// These are checked case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4",  // MPEG-4 container (typically H.264/H.265 codec)
    "webm", // WebM container (VP8/VP9/AV1)
    "mkv",  // Matroska container (any codec)
    "avi",  // AVI container (legacy format)
    "mov",  // QuickTime container (typically H.264)
    "m4v",  // MPEG-4 Video (Apple variant of MP4)
    "ogv",  // Ogg Video container (Theora codec)
    "wmv",  // Windows Media Video
    "flv",  // Flash Video
];

/// How a source argument will be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Animated GIF, decoded on the CPU.
    Gif,
    /// Local file with a known video container extension.
    Video,
    /// Network or other URI (`scheme://...`).
    Uri,
    /// Platform executable, i.e. an interactive wallpaper.
    Executable,
    /// Anything else; offered to the streaming decoder as-is.
    Other,
}

#[must_use]
pub fn classify(location: &str) -> SourceKind {
    if is_uri(location) {
        return SourceKind::Uri;
    }

    let path = Path::new(location);
    if is_gif_file(path) {
        SourceKind::Gif
    } else if is_video_file(path) {
        SourceKind::Video
    } else if is_executable(path) {
        SourceKind::Executable
    } else {
        SourceKind::Other
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// Check if a path points to a GIF file.
#[must_use]
pub fn is_gif_file(path: &Path) -> bool {
    has_extension(path, "gif")
}

/// Check if a path points to a video container.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    VIDEO_EXTENSIONS
        .iter()
        .any(|extension| has_extension(path, extension))
}

#[must_use]
pub fn is_executable(path: &Path) -> bool {
    has_extension(path, "exe")
}

/// True for `scheme://rest` where the scheme is at least two characters,
/// so drive letters such as `C:` never qualify.
#[must_use]
pub fn is_uri(location: &str) -> bool {
    let Some((scheme, _)) = location.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    scheme.len() >= 2
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
