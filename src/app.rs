// SPDX-License-Identifier: MPL-2.0

//! Startup sequencing.
//!
//! Every fatal condition is detected here, before the first frame is drawn:
//! the display mode, then the desktop surface, then its device context,
//! then the clock. Only when all of them are in hand does the render loop
//! start.

use tracing::info;
use vidpaper_config::Config;

use crate::{
    blit::{FrameBlitter, RasterTarget},
    display::DisplayConfigQuery,
    error::StartupError,
    platform,
    render_loop::{PlaybackOptions, PlaybackSummary, RenderLoop},
    signals::CancelToken,
    source::{self, FrameSource},
    surface::{DesktopSurfaceProvider, SurfaceHandle},
    timer::{Pacer, Timer},
};

/// Discover the environment and play `source` on the desktop.
pub fn run<S, T, P>(
    source: S,
    display: &dyn DisplayConfigQuery,
    surfaces: &dyn DesktopSurfaceProvider,
    acquire_target: impl FnOnce(SurfaceHandle) -> Result<T, StartupError>,
    open_pacer: impl FnOnce() -> Result<P, StartupError>,
    options: PlaybackOptions,
    cancel: CancelToken,
) -> Result<PlaybackSummary, StartupError>
where
    S: FrameSource,
    T: RasterTarget,
    P: Pacer,
{
    let geometry = display.query_active_display()?;
    let surface = surfaces.locate()?;
    let target = acquire_target(surface)?;
    let pacer = open_pacer()?;

    info!(
        source = %source.describe(),
        provider = surfaces.name(),
        width = geometry.width,
        height = geometry.height,
        refresh_rate_hz = geometry.refresh_rate_hz,
        "Environment ready"
    );

    let blitter = FrameBlitter::new(target, geometry);
    Ok(RenderLoop::new(source, blitter, pacer, options, cancel).run())
}

/// Open `location` and play it with this platform's display, surface and clock.
pub fn launch(
    location: &str,
    config: &Config,
    cancel: CancelToken,
) -> Result<PlaybackSummary, StartupError> {
    let source = source::open(location, &cancel)?;
    let wait = config.pacing.wait;
    let timer_cancel = cancel.clone();

    run(
        source,
        &platform::DesktopDisplay,
        &platform::WorkerWLocator,
        platform::DesktopCanvas::acquire,
        || {
            Timer::with_strategy(platform::system_clock()?, wait)
                .map(|timer| timer.cancel_on(timer_cancel))
        },
        PlaybackOptions::from(&config.playback),
        cancel,
    )
}
