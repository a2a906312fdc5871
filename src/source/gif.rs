// SPDX-License-Identifier: MPL-2.0

//! Animated GIF decoding.
//!
//! Frames are composited and decoded one at a time as the render loop asks
//! for them, so memory use does not grow with the length of the animation.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use eyre::WrapErr;
use image::{AnimationDecoder, Frames, codecs::gif::GifDecoder};
use tracing::debug;

use super::{FrameSource, Next};
use crate::frame::Frame;

/// Delay used for frames that declare none, as browsers do.
const DEFAULT_DELAY_MS: f64 = 100.0;

pub struct GifSource {
    path: PathBuf,
    frames: Frames<'static>,
    /// First frame, decoded at open time to learn the frame rate.
    pending: Option<Frame>,
    frame_rate: f64,
}

impl GifSource {
    pub fn open(path: &Path) -> eyre::Result<Self> {
        let mut frames = decode_frames(path)?;

        let first = frames
            .next()
            .ok_or_else(|| eyre::eyre!("GIF contains no frames"))?
            .wrap_err("failed to decode first GIF frame")?;

        let (numer, denom) = first.delay().numer_denom_ms();
        let delay_ms = if numer == 0 || denom == 0 {
            DEFAULT_DELAY_MS
        } else {
            f64::from(numer) / f64::from(denom)
        };

        let pending = to_bgra(first)?;
        debug!(
            path = %path.display(),
            width = pending.width(),
            height = pending.height(),
            delay_ms,
            "Decoded first GIF frame"
        );

        Ok(Self {
            path: path.to_path_buf(),
            frames,
            pending: Some(pending),
            frame_rate: 1000.0 / delay_ms,
        })
    }
}

fn decode_frames(path: &Path) -> eyre::Result<Frames<'static>> {
    let file = File::open(path).wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let decoder = GifDecoder::new(BufReader::new(file))
        .wrap_err_with(|| format!("{} is not a valid GIF", path.display()))?;
    Ok(decoder.into_frames())
}

/// Convert a composited RGBA frame into the blue-first layout of [`Frame`].
fn to_bgra(frame: image::Frame) -> eyre::Result<Frame> {
    let buffer = frame.into_buffer();
    let (width, height) = buffer.dimensions();
    let mut data = buffer.into_raw();
    for pixel in data.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    Frame::packed(width, height, 4, data)
}

impl FrameSource for GifSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Next {
        if let Some(frame) = self.pending.take() {
            return Next::Frame(frame);
        }

        match self.frames.next() {
            None => Next::EndOfStream,
            Some(Ok(frame)) => match to_bgra(frame) {
                Ok(frame) => frame.into(),
                Err(e) => Next::Error(e),
            },
            Some(Err(e)) => Next::Error(eyre::Report::new(e).wrap_err("failed to decode GIF frame")),
        }
    }

    fn rewind(&mut self) -> eyre::Result<()> {
        self.frames = decode_frames(&self.path)?;
        self.pending = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("gif:{}", self.path.display())
    }
}
