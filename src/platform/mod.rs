// SPDX-License-Identifier: MPL-2.0

//! OS bindings for display discovery, the desktop surface and the clock.
//!
//! Only Windows exposes a desktop background surface this crate knows how to
//! paint. Elsewhere the same names resolve to implementations that fail with
//! [`StartupError::UnsupportedPlatform`](crate::error::StartupError) so the
//! portable core still builds and tests.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{DesktopCanvas, DesktopDisplay, WorkerWLocator, system_clock};

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use unsupported::{DesktopCanvas, DesktopDisplay, WorkerWLocator, system_clock};
