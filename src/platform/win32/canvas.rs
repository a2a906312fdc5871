// SPDX-License-Identifier: MPL-2.0

//! GDI device context of the desktop background window.

use std::ffi::c_void;

use tracing::{debug, info};
use windows::Win32::{
    Foundation::HWND,
    Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, DCX_CACHE, DCX_LOCKWINDOWUPDATE, DCX_WINDOW,
        DIB_RGB_COLORS, GetDCEx, HDC, ReleaseDC, SRCCOPY, StretchDIBits,
    },
};

use crate::{
    blit::{RasterHeader, RasterTarget},
    error::StartupError,
    surface::SurfaceHandle,
};

/// A device context held for the lifetime of the value.
///
/// Acquired once by [`DesktopCanvas::acquire`] and released once on drop.
#[derive(Debug)]
pub struct DesktopCanvas {
    window: HWND,
    device: HDC,
}

impl DesktopCanvas {
    pub fn acquire(surface: SurfaceHandle) -> Result<Self, StartupError> {
        let window = HWND(surface.raw() as *mut c_void);
        let device = unsafe {
            GetDCEx(
                Some(window),
                None,
                DCX_WINDOW | DCX_CACHE | DCX_LOCKWINDOWUPDATE,
            )
        };
        if device.is_invalid() {
            return Err(StartupError::SurfaceDiscovery(format!(
                "GetDCEx failed for {surface:?}"
            )));
        }

        info!(?surface, "Acquired desktop device context");
        Ok(Self { window, device })
    }
}

impl RasterTarget for DesktopCanvas {
    fn blit(&mut self, header: &RasterHeader, pixels: &[u8]) -> eyre::Result<()> {
        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: header.width,
                biHeight: header.height,
                biPlanes: 1,
                biBitCount: header.bits_per_pixel,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let lines = unsafe {
            StretchDIBits(
                self.device,
                0,
                0,
                header.dest_width as i32,
                header.dest_height as i32,
                0,
                0,
                header.width,
                header.rows() as i32,
                Some(pixels.as_ptr() as *const c_void),
                &info,
                DIB_RGB_COLORS,
                SRCCOPY,
            )
        };
        if lines == 0 {
            eyre::bail!(
                "StretchDIBits drew nothing for a {}x{} frame",
                header.width,
                header.rows()
            );
        }
        Ok(())
    }
}

impl Drop for DesktopCanvas {
    fn drop(&mut self) {
        let released = unsafe { ReleaseDC(Some(self.window), self.device) };
        debug!(released, "Released desktop device context");
    }
}
