// SPDX-License-Identifier: MPL-2.0

//! Discovery of the window that paints the desktop background.
//!
//! The window hierarchy behind the desktop icons is undocumented and changes
//! between OS releases, so discovery sits behind [`DesktopSurfaceProvider`]
//! and each supported shell layout gets its own implementation.

use std::fmt;

use crate::error::StartupError;

/// Opaque OS handle of the desktop background surface.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(isize);

impl SurfaceHandle {
    #[must_use]
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> isize {
        self.0
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({:#x})", self.0)
    }
}

/// Locates the drawing surface that sits behind the desktop icons.
pub trait DesktopSurfaceProvider {
    /// Short name of the shell layout this provider understands.
    fn name(&self) -> &'static str;

    /// Returns the first matching surface, or fails when the shell does not
    /// match the expected composition model.
    fn locate(&self) -> Result<SurfaceHandle, StartupError>;
}
