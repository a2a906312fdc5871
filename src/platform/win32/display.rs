// SPDX-License-Identifier: MPL-2.0

use windows::{
    Win32::Graphics::Gdi::{DEVMODEW, ENUM_CURRENT_SETTINGS, EnumDisplaySettingsW},
    core::PCWSTR,
};

use crate::{
    display::{DisplayConfigQuery, DisplayGeometry},
    error::StartupError,
};

/// Current mode of the display the calling thread runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopDisplay;

impl DisplayConfigQuery for DesktopDisplay {
    fn query_active_display(&self) -> Result<DisplayGeometry, StartupError> {
        let mut mode = DEVMODEW {
            dmSize: std::mem::size_of::<DEVMODEW>() as u16,
            ..Default::default()
        };

        let found = unsafe { EnumDisplaySettingsW(PCWSTR::null(), ENUM_CURRENT_SETTINGS, &mut mode) };
        if !found.as_bool() {
            return Err(StartupError::DisplayQuery(
                "EnumDisplaySettingsW returned no current settings".into(),
            ));
        }

        if mode.dmPelsWidth == 0 || mode.dmPelsHeight == 0 {
            return Err(StartupError::DisplayQuery(format!(
                "display reports a {}x{} mode",
                mode.dmPelsWidth, mode.dmPelsHeight
            )));
        }

        let geometry = DisplayGeometry {
            width: mode.dmPelsWidth,
            height: mode.dmPelsHeight,
            // 0 and 1 mean "hardware default".
            refresh_rate_hz: if mode.dmDisplayFrequency > 1 {
                mode.dmDisplayFrequency
            } else {
                0
            },
        };
        tracing::info!(
            width = geometry.width,
            height = geometry.height,
            refresh_rate_hz = geometry.refresh_rate_hz,
            "Queried active display"
        );
        Ok(geometry)
    }
}
