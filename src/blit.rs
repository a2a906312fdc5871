// SPDX-License-Identifier: MPL-2.0

//! Copies decoded frames onto the desktop surface.
//!
//! Each frame is described by a minimal device-independent bitmap header
//! and handed to a [`RasterTarget`] in one call, which stretches it over the
//! full display. There is no double-buffering: if a blit outlasts the frame
//! budget the partially drawn frame is what the desktop shows.

use rayon::prelude::*;

use crate::{
    display::DisplayGeometry,
    frame::{Frame, RowOrder},
};

/// Bitmap description passed alongside the pixel rows of one blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub width: i32,
    /// Negative: rows are ordered top-down.
    pub height: i32,
    pub bits_per_pixel: u16,
    pub dest_width: u32,
    pub dest_height: u32,
}

impl RasterHeader {
    #[must_use]
    pub fn for_frame(frame: &Frame, destination: &DisplayGeometry) -> Self {
        Self {
            width: frame.width() as i32,
            height: -(frame.height() as i32),
            bits_per_pixel: u16::from(frame.channels()) * 8,
            dest_width: destination.width,
            dest_height: destination.height,
        }
    }

    /// Number of scan lines in the source bitmap.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.height.unsigned_abs()
    }
}

/// A device context that accepts uncompressed bitmaps.
///
/// Implementations acquire their context when constructed and release it
/// when dropped.
pub trait RasterTarget {
    fn blit(&mut self, header: &RasterHeader, pixels: &[u8]) -> eyre::Result<()>;
}

/// Row length of an uncompressed bitmap, padded to a 4-byte boundary.
#[must_use]
pub fn dib_stride(width: u32, channels: u8) -> usize {
    (width as usize * usize::from(channels) + 3) & !3
}

#[derive(Debug)]
pub struct FrameBlitter<T> {
    target: T,
    destination: DisplayGeometry,
    scratch: Vec<u8>,
}

impl<T: RasterTarget> FrameBlitter<T> {
    pub fn new(target: T, destination: DisplayGeometry) -> Self {
        Self {
            target,
            destination,
            scratch: Vec::new(),
        }
    }

    #[must_use]
    pub fn destination(&self) -> DisplayGeometry {
        self.destination
    }

    /// Draw `frame` over the whole destination surface.
    pub fn render(&mut self, frame: &Frame) -> eyre::Result<()> {
        if frame.is_empty() {
            eyre::bail!("refusing to blit an empty frame");
        }

        let header = RasterHeader::for_frame(frame, &self.destination);
        let pixels = adapt_rows(frame, &mut self.scratch);
        self.target.blit(&header, pixels)
    }
}

/// Returns `frame`'s rows as a top-down bitmap with 4-byte aligned rows,
/// repacking into `scratch` only when the frame's layout differs.
fn adapt_rows<'a>(frame: &'a Frame, scratch: &'a mut Vec<u8>) -> &'a [u8] {
    let stride = dib_stride(frame.width(), frame.channels());
    let rows = frame.height() as usize;

    if frame.row_order() == RowOrder::TopDown && frame.stride() == stride {
        return &frame.data()[..stride * rows];
    }

    tracing::trace!(
        from_stride = frame.stride(),
        to_stride = stride,
        row_order = ?frame.row_order(),
        "repacking frame rows"
    );

    let row_bytes = frame.row_bytes();
    scratch.clear();
    scratch.resize(stride * rows, 0);
    scratch
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, dest)| {
            let stored = match frame.row_order() {
                RowOrder::TopDown => y,
                RowOrder::BottomUp => rows - 1 - y,
            };
            dest[..row_bytes].copy_from_slice(frame.stored_row(stored));
        });

    &scratch[..]
}
