// SPDX-License-Identifier: MPL-2.0

//! Decoded raster frames handed from a source to the blitter.

/// Vertical order of the rows in a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// First row in memory is the top of the image.
    #[default]
    TopDown,
    /// First row in memory is the bottom of the image.
    BottomUp,
}

/// A decoded raster image.
///
/// Channels are stored blue-first (BGR for 3 channels, BGRx/BGRA for 4),
/// which is the layout GDI device-independent bitmaps expect. The buffer
/// always covers `height` rows of `stride` bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    stride: usize,
    row_order: RowOrder,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer, checking that it covers `height` rows of `stride` bytes.
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        stride: usize,
        row_order: RowOrder,
        data: Vec<u8>,
    ) -> eyre::Result<Self> {
        if !matches!(channels, 3 | 4) {
            eyre::bail!("unsupported channel count {channels}");
        }

        let row_bytes = width as usize * usize::from(channels);
        if stride < row_bytes {
            eyre::bail!("stride {stride} is shorter than a {width}px row ({row_bytes} bytes)");
        }

        let needed = stride * height as usize;
        if data.len() < needed {
            eyre::bail!(
                "frame buffer too small: {} < {needed} bytes for {width}x{height}",
                data.len()
            );
        }

        Ok(Self {
            width,
            height,
            channels,
            stride,
            row_order,
            data,
        })
    }

    /// Tightly packed top-down frame.
    pub fn packed(width: u32, height: u32, channels: u8, data: Vec<u8>) -> eyre::Result<Self> {
        let stride = width as usize * usize::from(channels);
        Self::new(width, height, channels, stride, RowOrder::TopDown, data)
    }

    /// The frame a source returns once it has nothing left to give.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Bytes between the starts of two consecutive rows.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// The pixel buffer, `stride * height` bytes or more.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Meaningful bytes in each row, excluding stride padding.
    #[must_use]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * usize::from(self.channels)
    }

    /// Bytes of row `y` as stored in memory (memory order, not image order).
    #[must_use]
    pub fn stored_row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.row_bytes()]
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("stride", &self.stride)
            .field("row_order", &self.row_order)
            .field("data", &format_args!("{} bytes", self.data.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_channel_counts() {
        assert!(Frame::packed(2, 2, 1, vec![0; 4]).is_err());
        assert!(Frame::packed(2, 2, 2, vec![0; 8]).is_err());
        assert!(Frame::packed(2, 2, 3, vec![0; 12]).is_ok());
        assert!(Frame::packed(2, 2, 4, vec![0; 16]).is_ok());
    }

    #[test]
    fn rejects_short_buffers_and_strides() {
        assert!(Frame::packed(4, 4, 4, vec![0; 63]).is_err());
        assert!(Frame::new(4, 1, 3, 11, RowOrder::TopDown, vec![0; 12]).is_err());
        assert!(Frame::new(4, 2, 3, 16, RowOrder::BottomUp, vec![0; 32]).is_ok());
    }

    #[test]
    fn empty_frame() {
        assert!(Frame::empty().is_empty());
        assert!(!Frame::packed(1, 1, 4, vec![1, 2, 3, 4]).unwrap().is_empty());
    }

    #[test]
    fn stored_row_skips_padding() {
        let data = vec![1, 2, 3, 0, 4, 5, 6, 0];
        let frame = Frame::new(1, 2, 3, 4, RowOrder::TopDown, data).unwrap();
        assert_eq!(frame.stored_row(0), &[1, 2, 3]);
        assert_eq!(frame.stored_row(1), &[4, 5, 6]);
    }

    #[test]
    fn accessors_expose_validated_layout() {
        let frame = Frame::new(2, 3, 3, 8, RowOrder::BottomUp, vec![0; 24]).unwrap();
        assert_eq!((frame.width(), frame.height(), frame.channels()), (2, 3, 3));
        assert_eq!(frame.stride(), 8);
        assert_eq!(frame.row_order(), RowOrder::BottomUp);
        assert!(frame.data().len() >= frame.stride() * frame.height() as usize);
    }
}
