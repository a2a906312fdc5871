// SPDX-License-Identifier: MPL-2.0

mod app;
mod blit;
mod display;
mod error;
mod frame;
mod platform;
mod render_loop;
mod signals;
mod source;
mod surface;
mod timer;

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, error::ErrorKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vidpaper_config::{Config, WaitStrategy};

use crate::{
    error::{EXIT_USAGE, StartupError},
    render_loop::Termination,
    signals::CancelToken,
};

/// Play a video on the desktop background, behind the icons.
#[derive(Debug, Parser)]
#[command(name = "vidpaper", version)]
struct Cli {
    /// Video file, animated GIF or URI to play
    source: Option<String>,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Restart the video when it ends
    #[arg(long = "loop")]
    looping: bool,

    /// Play at this frame rate instead of the one reported by the video
    #[arg(long, value_name = "FPS", value_parser = parse_frame_rate)]
    fps: Option<f64>,

    /// Sleep between frames and busy-wait only the last MS milliseconds
    #[arg(long, value_name = "MS")]
    hybrid_wait: Option<f64>,
}

impl Cli {
    /// Command-line flags take precedence over the configuration file.
    fn apply(&self, config: &mut Config) {
        if self.looping {
            config.playback.looping = true;
        }
        if let Some(fps) = self.fps {
            config.playback.frame_rate_override = Some(fps);
        }
        if let Some(spin_margin_ms) = self.hybrid_wait {
            config.pacing.wait = WaitStrategy::Hybrid { spin_margin_ms };
        }
    }
}

fn parse_frame_rate(value: &str) -> Result<f64, String> {
    let fps: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if fps.is_finite() && fps > 0.0 {
        Ok(fps)
    } else {
        Err(format!("frame rate must be a positive number, got {value}"))
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config, vidpaper_config::Error> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn init_tracing(config_filter: Option<&str>) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config_filter.unwrap_or("info"))
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    let (mut config, config_error) = match load_config(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_tracing(config.log_filter.as_deref());

    if let Err(e) = color_eyre::install() {
        warn!(error = %e, "Failed to install error report handler");
    }

    if let Some(e) = config_error {
        warn!(error = %e, "Config file error, falling back to defaults");
    }
    cli.apply(&mut config);

    let Some(location) = cli.source.as_deref() else {
        return fail(&StartupError::Argument(
            "usage: vidpaper <SOURCE> (try --help)".into(),
        ));
    };

    let cancel = CancelToken::new();
    if let Err(e) = signals::install_ctrlc_handler(&cancel) {
        warn!(error = %e, "Failed to install Ctrl+C handler");
    }

    match app::launch(location, &config, cancel) {
        Ok(summary) => {
            if let Termination::DecodeError(reason) = &summary.termination {
                warn!(%reason, "Playback ended early on a decode error");
            }
            info!(frames = summary.frames_rendered, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fail(e: &StartupError) -> ExitCode {
    error!(exit_code = e.exit_code(), "{e}");
    ExitCode::from(e.exit_code())
}
