// SPDX-License-Identifier: MPL-2.0

//! Locates the `WorkerW` window that paints the desktop background.
//!
//! Explorer only creates this window after Progman receives the
//! undocumented `0x052C` message. Afterwards the top-level window that owns
//! `SHELLDLL_DefView` (the icon layer) is followed in z-order by the
//! `WorkerW` sibling drawn behind the icons.

use tracing::{debug, info, warn};
use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, WPARAM},
        UI::WindowsAndMessaging::{
            EnumWindows, FindWindowExW, FindWindowW, SMTO_NORMAL, SendMessageTimeoutW,
        },
    },
    core::{BOOL, PCWSTR, w},
};

use crate::{
    error::StartupError,
    surface::{DesktopSurfaceProvider, SurfaceHandle},
};

/// Asks Progman to spawn the background `WorkerW`.
const SPAWN_WORKERW: u32 = 0x052C;
const SPAWN_TIMEOUT_MS: u32 = 1000;

/// Desktop layout with a `WorkerW` sibling behind the icon view.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerWLocator;

impl DesktopSurfaceProvider for WorkerWLocator {
    fn name(&self) -> &'static str {
        "progman-workerw"
    }

    fn locate(&self) -> Result<SurfaceHandle, StartupError> {
        let progman = unsafe { FindWindowW(w!("Progman"), PCWSTR::null()) }
            .map_err(|e| StartupError::SurfaceDiscovery(format!("Progman window not found: {e}")))?;

        let mut result = 0usize;
        let sent = unsafe {
            SendMessageTimeoutW(
                progman,
                SPAWN_WORKERW,
                WPARAM(0),
                LPARAM(0),
                SMTO_NORMAL,
                SPAWN_TIMEOUT_MS,
                Some(&mut result as *mut usize),
            )
        };
        if sent.0 == 0 {
            warn!("Progman did not answer the WorkerW request in time");
        }

        let mut worker: Option<HWND> = None;
        // Stopping the enumeration early makes EnumWindows report an error.
        let _ = unsafe {
            EnumWindows(
                Some(find_worker),
                LPARAM(&mut worker as *mut Option<HWND> as isize),
            )
        };

        let worker = worker.ok_or_else(|| {
            StartupError::SurfaceDiscovery(
                "no WorkerW window behind SHELLDLL_DefView; the desktop shell uses an unknown layout"
                    .into(),
            )
        })?;

        info!(hwnd = ?worker.0, provider = self.name(), "Located desktop background surface");
        Ok(SurfaceHandle::from_raw(worker.0 as isize))
    }
}

unsafe extern "system" fn find_worker(top_level: HWND, lparam: LPARAM) -> BOOL {
    let icon_view = unsafe {
        FindWindowExW(
            Some(top_level),
            None,
            w!("SHELLDLL_DefView"),
            PCWSTR::null(),
        )
    };
    if icon_view.is_err() {
        return true.into();
    }

    debug!(owner = ?top_level.0, "Found SHELLDLL_DefView owner");
    match unsafe { FindWindowExW(None, Some(top_level), w!("WorkerW"), PCWSTR::null()) } {
        Ok(worker) => {
            let slot = unsafe { &mut *(lparam.0 as *mut Option<HWND>) };
            *slot = Some(worker);
            false.into()
        }
        Err(_) => true.into(),
    }
}
