// SPDX-License-Identifier: MPL-2.0

//! Win32 implementations of the platform seams.

mod canvas;
mod clock;
mod desktop;
mod display;

pub use canvas::DesktopCanvas;
pub use clock::system_clock;
pub use desktop::WorkerWLocator;
pub use display::DesktopDisplay;
