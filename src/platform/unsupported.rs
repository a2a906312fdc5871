// SPDX-License-Identifier: MPL-2.0

//! Stand-ins for platforms without a paintable desktop surface.

use tracing::debug;

use crate::{
    blit::{RasterHeader, RasterTarget},
    display::{DisplayConfigQuery, DisplayGeometry},
    error::StartupError,
    surface::{DesktopSurfaceProvider, SurfaceHandle},
    timer::MonotonicClock,
};

pub fn system_clock() -> Result<MonotonicClock, StartupError> {
    Ok(MonotonicClock::new())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopDisplay;

impl DisplayConfigQuery for DesktopDisplay {
    fn query_active_display(&self) -> Result<DisplayGeometry, StartupError> {
        debug!(os = std::env::consts::OS, "No display query for this platform");
        Err(StartupError::UnsupportedPlatform)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerWLocator;

impl DesktopSurfaceProvider for WorkerWLocator {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn locate(&self) -> Result<SurfaceHandle, StartupError> {
        Err(StartupError::UnsupportedPlatform)
    }
}

/// Cannot be constructed on this platform.
#[derive(Debug)]
pub enum DesktopCanvas {}

impl DesktopCanvas {
    pub fn acquire(_surface: SurfaceHandle) -> Result<Self, StartupError> {
        Err(StartupError::UnsupportedPlatform)
    }
}

impl RasterTarget for DesktopCanvas {
    fn blit(&mut self, _header: &RasterHeader, _pixels: &[u8]) -> eyre::Result<()> {
        match *self {}
    }
}
