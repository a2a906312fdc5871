// SPDX-License-Identifier: MPL-2.0

use windows::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};

use crate::{error::StartupError, timer::TickSource};

/// The Win32 high-resolution performance counter.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceCounter {
    frequency: u64,
}

impl PerformanceCounter {
    pub fn new() -> Result<Self, StartupError> {
        let mut frequency = 0i64;
        unsafe { QueryPerformanceFrequency(&mut frequency) }
            .map_err(|e| StartupError::ClockUnavailable(e.to_string()))?;

        let frequency = u64::try_from(frequency)
            .ok()
            .filter(|&f| f > 0)
            .ok_or_else(|| {
                StartupError::ClockUnavailable(format!("invalid counter frequency {frequency}"))
            })?;

        tracing::debug!(frequency, "Performance counter available");
        Ok(Self { frequency })
    }
}

impl TickSource for PerformanceCounter {
    fn ticks(&self) -> i64 {
        let mut now = 0i64;
        // Cannot fail once the frequency query has succeeded.
        let _ = unsafe { QueryPerformanceCounter(&mut now) };
        now
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}

pub fn system_clock() -> Result<PerformanceCounter, StartupError> {
    PerformanceCounter::new()
}
