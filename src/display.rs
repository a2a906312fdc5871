// SPDX-License-Identifier: MPL-2.0

use crate::error::StartupError;

/// Resolution and refresh rate of the active display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    pub refresh_rate_hz: u32,
}

/// Reads the current mode of the primary display.
pub trait DisplayConfigQuery {
    /// Fails when the OS reports no current display settings.
    fn query_active_display(&self) -> Result<DisplayGeometry, StartupError>;
}
