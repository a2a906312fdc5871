// SPDX-License-Identifier: MPL-2.0

//! High-resolution interval measurement and blocking waits for frame pacing.
//!
//! [`Timer`] reads raw ticks from a [`TickSource`] and converts them with a
//! ticks-per-millisecond factor cached at construction. Waiting polls the same
//! counter until the deadline tick is reached, because OS sleep primitives
//! resolve to roughly 1-15 ms, which is too coarse to hold a frame cadence.
//! [`WaitStrategy::Hybrid`] sleeps through most of the interval first and only
//! polls the tail.
//!
//! A timer given a [`CancelToken`] checks it while waiting and returns as soon
//! as it is cancelled.

use std::time::{Duration, Instant};

use vidpaper_config::WaitStrategy;

use crate::{error::StartupError, signals::CancelToken};

/// A monotonic hardware counter.
pub trait TickSource {
    /// Current counter value.
    fn ticks(&self) -> i64;
    /// Counter increments per second.
    fn frequency(&self) -> u64;
}

/// Portable counter backed by [`Instant`], ticking in nanoseconds.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn ticks(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

/// Measurement and wait operations the render loop paces itself with.
pub trait Pacer {
    /// Mark the beginning of a measured interval.
    fn start(&mut self);
    /// Mark the end of a measured interval.
    fn stop(&mut self);
    /// Milliseconds between the last `start`/`stop` pair.
    fn elapsed_ms(&self) -> f64;
    /// Block for `duration_ms`. Non-positive durations return immediately,
    /// and so does any wait once the pacer's cancel token fires.
    fn wait_ms(&mut self, duration_ms: f64);
}

impl<P: Pacer + ?Sized> Pacer for Box<P> {
    fn start(&mut self) {
        (**self).start();
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn elapsed_ms(&self) -> f64 {
        (**self).elapsed_ms()
    }

    fn wait_ms(&mut self, duration_ms: f64) {
        (**self).wait_ms(duration_ms);
    }
}

/// Longest single sleep in hybrid mode, so cancellation is noticed promptly.
const MAX_SLEEP_SLICE_MS: f64 = 10.0;

#[derive(Debug)]
pub struct Timer<C> {
    clock: C,
    ticks_per_ms: f64,
    begin: i64,
    end: i64,
    spin_margin_ms: Option<f64>,
    cancel: Option<CancelToken>,
}

impl<C: TickSource> Timer<C> {
    /// Busy-waiting timer over `clock`.
    pub fn new(clock: C) -> Result<Self, StartupError> {
        Self::with_strategy(clock, WaitStrategy::Spin)
    }

    /// Timer over `clock` using the given wait strategy.
    ///
    /// Fails when the clock reports no frequency.
    pub fn with_strategy(clock: C, strategy: WaitStrategy) -> Result<Self, StartupError> {
        let frequency = clock.frequency();
        if frequency == 0 {
            return Err(StartupError::ClockUnavailable(
                "counter frequency is zero".into(),
            ));
        }

        let spin_margin_ms = match strategy {
            WaitStrategy::Spin => None,
            WaitStrategy::Hybrid { spin_margin_ms } if spin_margin_ms.is_finite() => {
                Some(spin_margin_ms.max(0.0))
            }
            WaitStrategy::Hybrid { .. } => Some(0.0),
        };

        let begin = clock.ticks();
        Ok(Self {
            clock,
            ticks_per_ms: frequency as f64 / 1000.0,
            begin,
            end: begin,
            spin_margin_ms,
            cancel: None,
        })
    }

    /// Abandon waits once `token` is cancelled.
    #[must_use]
    pub fn cancel_on(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn sleep_until(&self, deadline: i64, margin_ms: f64) {
        loop {
            let remaining_ms = (deadline - self.clock.ticks()) as f64 / self.ticks_per_ms;
            if remaining_ms <= margin_ms || self.cancelled() {
                return;
            }
            let slice_ms = (remaining_ms - margin_ms).min(MAX_SLEEP_SLICE_MS);
            std::thread::sleep(Duration::from_secs_f64(slice_ms / 1000.0));
        }
    }

    fn spin_until(&self, deadline: i64) {
        while self.clock.ticks() < deadline {
            if self.cancelled() {
                return;
            }
            std::hint::spin_loop();
        }
    }
}

impl<C: TickSource> Pacer for Timer<C> {
    fn start(&mut self) {
        self.begin = self.clock.ticks();
    }

    fn stop(&mut self) {
        self.end = self.clock.ticks();
    }

    fn elapsed_ms(&self) -> f64 {
        (self.end - self.begin) as f64 / self.ticks_per_ms
    }

    fn wait_ms(&mut self, duration_ms: f64) {
        // Also rejects NaN.
        if !(duration_ms > 0.0) {
            return;
        }

        let span = (self.ticks_per_ms * duration_ms) as i64;
        let deadline = self.clock.ticks().saturating_add(span);

        if let Some(margin_ms) = self.spin_margin_ms {
            self.sleep_until(deadline, margin_ms);
        }
        self.spin_until(deadline);
    }
}
