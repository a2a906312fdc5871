// SPDX-License-Identifier: MPL-2.0

//! Cooperative shutdown of the render loop.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Exit status when a second Ctrl+C arrives before playback has stopped.
const FORCED_EXIT_CODE: i32 = 130;

/// Shared flag polled by the render loop, its timer and blocking sources.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Cancel the token, returning whether it was already cancelled.
    pub fn cancel_again(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cancel `token` when the console receives Ctrl+C.
///
/// The loop abandons its current wait and exits; the desktop keeps showing
/// the last frame drawn. A second Ctrl+C terminates the process.
pub fn install_ctrlc_handler(token: &CancelToken) -> eyre::Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        if token.cancel_again() {
            tracing::warn!("Second Ctrl+C received, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
        tracing::info!("Ctrl+C received, stopping playback");
    })?;
    Ok(())
}
