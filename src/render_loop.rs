// SPDX-License-Identifier: MPL-2.0

//! The frame-paced compositing loop.
//!
//! ```text
//! Priming ──first frame──▶ Playing ──end of stream / error / cancel──▶ Draining ──▶ Terminated
//!                           │    ▲
//!                           └────┘ start, render, stop, wait(remaining), next frame
//! ```
//!
//! The loop owns the source, the blitter and the pacer for its whole run, so
//! dropping it at the end of [`RenderLoop::run`] releases the device context
//! exactly once however playback ended.

use tracing::{debug, info, trace, warn};
use vidpaper_config::Playback;

use crate::{
    blit::{FrameBlitter, RasterTarget},
    frame::Frame,
    signals::CancelToken,
    source::{FrameSource, Next},
    timer::Pacer,
};

/// Rate used when neither the source nor the fallback setting is usable.
const LAST_RESORT_FRAME_RATE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Priming,
    Playing,
    Draining,
    Terminated,
}

/// Per-iteration timing quantities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingState {
    pub target_interval_ms: f64,
    pub render_cost_ms: f64,
}

impl PacingState {
    /// Budget left in the current frame, never negative.
    #[must_use]
    pub fn remaining_ms(&self) -> f64 {
        (self.target_interval_ms - self.render_cost_ms).max(0.0)
    }

    #[must_use]
    pub fn overran(&self) -> bool {
        self.render_cost_ms > self.target_interval_ms
    }
}

fn usable_rate(rate: f64) -> Option<f64> {
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Milliseconds per frame for a stream reporting `reported_fps`.
///
/// `override_fps` wins when set and usable; otherwise an unusable reported
/// rate falls back to `fallback_fps`.
#[must_use]
pub fn target_interval_ms(reported_fps: f64, override_fps: Option<f64>, fallback_fps: f64) -> f64 {
    let rate = override_fps
        .and_then(usable_rate)
        .or_else(|| usable_rate(reported_fps))
        .or_else(|| usable_rate(fallback_fps))
        .unwrap_or(LAST_RESORT_FRAME_RATE);
    1000.0 / rate
}

/// Why playback stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    EndOfStream,
    DecodeError(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames_rendered: u64,
    /// Frames whose render cost exceeded the frame interval.
    pub overruns: u64,
    pub blit_failures: u64,
    pub loops: u64,
    pub termination: Termination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    pub looping: bool,
    pub frame_rate_override: Option<f64>,
    pub fallback_frame_rate: f64,
    /// Frames between progress records; 0 disables them.
    pub progress_interval: u64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self::from(&Playback::default())
    }
}

impl From<&Playback> for PlaybackOptions {
    fn from(playback: &Playback) -> Self {
        Self {
            looping: playback.looping,
            frame_rate_override: playback.frame_rate_override,
            fallback_frame_rate: playback.fallback_frame_rate,
            progress_interval: playback.progress_interval,
        }
    }
}

pub struct RenderLoop<S, T, P> {
    source: S,
    blitter: FrameBlitter<T>,
    pacer: P,
    options: PlaybackOptions,
    cancel: CancelToken,
    state: LoopState,
    summary: PlaybackSummary,
}

impl<S, T, P> RenderLoop<S, T, P>
where
    S: FrameSource,
    T: RasterTarget,
    P: Pacer,
{
    pub fn new(
        source: S,
        blitter: FrameBlitter<T>,
        pacer: P,
        options: PlaybackOptions,
        cancel: CancelToken,
    ) -> Self {
        Self {
            source,
            blitter,
            pacer,
            options,
            cancel,
            state: LoopState::Priming,
            summary: PlaybackSummary {
                frames_rendered: 0,
                overruns: 0,
                blit_failures: 0,
                loops: 0,
                termination: Termination::EndOfStream,
            },
        }
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "Render loop state change");
        self.state = next;
    }

    /// Play the source to completion and report how it went.
    pub fn run(mut self) -> PlaybackSummary {
        let termination = match self.prime() {
            Ok((first, pacing)) => {
                self.transition(LoopState::Playing);
                self.play(first, pacing)
            }
            Err(termination) => termination,
        };

        self.transition(LoopState::Draining);
        self.summary.termination = termination;
        self.transition(LoopState::Terminated);

        info!(
            frames = self.summary.frames_rendered,
            overruns = self.summary.overruns,
            blit_failures = self.summary.blit_failures,
            loops = self.summary.loops,
            termination = ?self.summary.termination,
            "Playback finished"
        );
        self.summary
    }

    fn prime(&mut self) -> Result<(Frame, PacingState), Termination> {
        let first = self.pull()?;

        let reported = self.source.frame_rate();
        let target_interval_ms = target_interval_ms(
            reported,
            self.options.frame_rate_override,
            self.options.fallback_frame_rate,
        );
        let fps = 1000.0 / target_interval_ms;
        let override_fps = self.options.frame_rate_override;
        if let Some(requested) = override_fps.filter(|rate| usable_rate(*rate).is_none()) {
            warn!(requested, "Ignoring unusable frame rate override");
        }
        if usable_rate(reported).is_none() && override_fps.and_then(usable_rate).is_none() {
            warn!(reported, fps, "Source reported no usable frame rate, using fallback");
        }

        let refresh = self.blitter.destination().refresh_rate_hz;
        if refresh > 0 && fps > f64::from(refresh) {
            warn!(
                fps,
                refresh_rate_hz = refresh,
                "Source frame rate exceeds the display refresh rate; frames will be drawn between refreshes"
            );
        }

        info!(
            fps,
            interval_ms = target_interval_ms,
            width = first.width(),
            height = first.height(),
            "Starting playback"
        );

        Ok((
            first,
            PacingState {
                target_interval_ms,
                render_cost_ms: 0.0,
            },
        ))
    }

    fn play(&mut self, mut current: Frame, mut pacing: PacingState) -> Termination {
        loop {
            if self.cancel.is_cancelled() {
                return Termination::Cancelled;
            }

            self.pacer.start();
            let rendered = self.blitter.render(&current);
            self.pacer.stop();

            pacing.render_cost_ms = self.pacer.elapsed_ms();
            match rendered {
                Ok(()) => self.summary.frames_rendered += 1,
                Err(e) => self.record_blit_failure(&e),
            }
            if pacing.overran() {
                self.summary.overruns += 1;
            }

            let remaining_ms = pacing.remaining_ms();
            trace!(cost_ms = pacing.render_cost_ms, remaining_ms, "Frame rendered");
            self.pacer.wait_ms(remaining_ms);

            self.report_progress(&pacing);
            if self.cancel.is_cancelled() {
                return Termination::Cancelled;
            }

            current = match self.pull() {
                Ok(frame) => frame,
                Err(termination) => return termination,
            };
        }
    }

    fn record_blit_failure(&mut self, error: &eyre::Report) {
        self.summary.blit_failures += 1;
        if self.summary.blit_failures == 1 {
            warn!(error = %format!("{error:#}"), "Failed to draw frame on the desktop");
        } else {
            debug!(
                error = %format!("{error:#}"),
                failures = self.summary.blit_failures,
                "Failed to draw frame on the desktop"
            );
        }
    }

    fn report_progress(&self, pacing: &PacingState) {
        let interval = self.options.progress_interval;
        let frames = self.summary.frames_rendered + self.summary.blit_failures;
        if interval > 0 && frames > 0 && frames % interval == 0 {
            info!(
                frames = self.summary.frames_rendered,
                overruns = self.summary.overruns,
                last_cost_ms = pacing.render_cost_ms,
                "Playback progress"
            );
        }
    }

    /// Next frame to render, or the reason playback must end.
    fn pull(&mut self) -> Result<Frame, Termination> {
        match self.source.next_frame() {
            Next::Frame(frame) if !frame.is_empty() => return Ok(frame),
            Next::Frame(_) | Next::EndOfStream => {}
            Next::Error(e) => return Err(decode_error(&e)),
        }

        // Blocking sources give up early when cancelled.
        if self.cancel.is_cancelled() {
            return Err(Termination::Cancelled);
        }

        if !self.options.looping {
            debug!(source = %self.source.describe(), "End of stream");
            return Err(Termination::EndOfStream);
        }

        if let Err(e) = self.source.rewind() {
            return Err(decode_error(&e.wrap_err("failed to restart source")));
        }
        self.summary.loops += 1;
        debug!(loops = self.summary.loops, "Restarted source");

        match self.source.next_frame() {
            Next::Frame(frame) if !frame.is_empty() => Ok(frame),
            Next::Error(e) => Err(decode_error(&e)),
            Next::Frame(_) | Next::EndOfStream => {
                warn!("Source produced no frames after restarting");
                Err(Termination::EndOfStream)
            }
        }
    }
}

fn decode_error(error: &eyre::Report) -> Termination {
    let message = format!("{error:#}");
    warn!(error = %message, "Decoding failed, ending playback");
    Termination::DecodeError(message)
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        rc::Rc,
        time::Instant,
    };

    use super::*;
    use crate::{
        blit::RasterHeader,
        display::DisplayGeometry,
        timer::{MonotonicClock, Timer},
    };

    struct NullTarget;

    impl RasterTarget for NullTarget {
        fn blit(&mut self, _header: &RasterHeader, _pixels: &[u8]) -> eyre::Result<()> {
            Ok(())
        }
    }

    const DISPLAY: DisplayGeometry = DisplayGeometry {
        width: 640,
        height: 480,
        refresh_rate_hz: 60,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Pull,
        Start,
        Render,
        Stop,
        Wait(f64),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    enum Step {
        Frame,
        Empty,
        Eos,
        Error,
    }

    /// Source replaying a fixed script; `rewind` starts it over.
    struct ScriptedSource {
        script: Vec<Step>,
        queue: VecDeque<usize>,
        frame_rate: f64,
        rewinds: Rc<Cell<usize>>,
        log: Log,
    }

    impl ScriptedSource {
        fn new(script: Vec<Step>, frame_rate: f64, log: &Log) -> Self {
            Self {
                queue: (0..script.len()).collect(),
                script,
                frame_rate,
                rewinds: Rc::default(),
                log: Rc::clone(log),
            }
        }

        fn frames(count: usize, frame_rate: f64, log: &Log) -> Self {
            let mut script: Vec<Step> = (0..count).map(|_| Step::Frame).collect();
            script.push(Step::Eos);
            Self::new(script, frame_rate, log)
        }
    }

    impl FrameSource for ScriptedSource {
        fn frame_rate(&self) -> f64 {
            self.frame_rate
        }

        fn next_frame(&mut self) -> Next {
            self.log.borrow_mut().push(Event::Pull);
            let Some(index) = self.queue.pop_front() else {
                return Next::EndOfStream;
            };
            match self.script[index] {
                Step::Frame => Next::Frame(Frame::packed(2, 2, 4, vec![index as u8; 16]).unwrap()),
                Step::Empty => Next::Frame(Frame::empty()),
                Step::Eos => Next::EndOfStream,
                Step::Error => Next::Error(eyre::eyre!("corrupt packet")),
            }
        }

        fn rewind(&mut self) -> eyre::Result<()> {
            self.rewinds.set(self.rewinds.get() + 1);
            self.queue = (0..self.script.len()).collect();
            Ok(())
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    #[derive(Default)]
    struct DcCounter {
        acquired: Cell<usize>,
        released: Cell<usize>,
    }

    /// Target that acquires on construction and releases on drop, like a
    /// device context.
    struct CountingTarget {
        counter: Rc<DcCounter>,
        log: Log,
        fail_every: Option<usize>,
        blits: usize,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl CountingTarget {
        fn acquire(counter: &Rc<DcCounter>, log: &Log) -> Self {
            counter.acquired.set(counter.acquired.get() + 1);
            Self {
                counter: Rc::clone(counter),
                log: Rc::clone(log),
                fail_every: None,
                blits: 0,
                cancel_after: None,
            }
        }
    }

    impl RasterTarget for CountingTarget {
        fn blit(&mut self, _header: &RasterHeader, _pixels: &[u8]) -> eyre::Result<()> {
            self.log.borrow_mut().push(Event::Render);
            self.blits += 1;
            if let Some((after, token)) = &self.cancel_after {
                if self.blits >= *after {
                    token.cancel();
                }
            }
            match self.fail_every {
                Some(n) if self.blits % n == 0 => eyre::bail!("blit rejected"),
                _ => Ok(()),
            }
        }
    }

    impl Drop for CountingTarget {
        fn drop(&mut self) {
            self.counter.released.set(self.counter.released.get() + 1);
        }
    }

    /// Pacer reporting a fixed render cost and recording every call.
    struct RecordingPacer {
        cost_ms: f64,
        log: Log,
    }

    impl Pacer for RecordingPacer {
        fn start(&mut self) {
            self.log.borrow_mut().push(Event::Start);
        }

        fn stop(&mut self) {
            self.log.borrow_mut().push(Event::Stop);
        }

        fn elapsed_ms(&self) -> f64 {
            self.cost_ms
        }

        fn wait_ms(&mut self, duration_ms: f64) {
            self.log.borrow_mut().push(Event::Wait(duration_ms));
        }
    }

    struct Harness {
        log: Log,
        counter: Rc<DcCounter>,
        cancel: CancelToken,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                log: Log::default(),
                counter: Rc::default(),
                cancel: CancelToken::new(),
            }
        }

        fn target(&self) -> CountingTarget {
            CountingTarget::acquire(&self.counter, &self.log)
        }

        fn pacer(&self, cost_ms: f64) -> RecordingPacer {
            RecordingPacer {
                cost_ms,
                log: Rc::clone(&self.log),
            }
        }

        fn run(
            &self,
            source: ScriptedSource,
            target: CountingTarget,
            cost_ms: f64,
            options: PlaybackOptions,
        ) -> PlaybackSummary {
            let blitter = FrameBlitter::new(target, DISPLAY);
            RenderLoop::new(source, blitter, self.pacer(cost_ms), options, self.cancel.clone())
                .run()
        }

        fn count(&self, wanted: fn(&Event) -> bool) -> usize {
            self.log.borrow().iter().filter(|e| wanted(e)).count()
        }

        fn waits(&self) -> Vec<f64> {
            self.log
                .borrow()
                .iter()
                .filter_map(|e| match e {
                    Event::Wait(ms) => Some(*ms),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn thirty_fps_targets_33_ms() {
        let interval = target_interval_ms(30.0, None, 60.0);
        assert!((interval - 33.333_333).abs() < 1e-3, "{interval}");
    }

    #[test]
    fn unusable_rates_fall_back() {
        assert!((target_interval_ms(0.0, None, 25.0) - 40.0).abs() < 1e-9);
        assert!((target_interval_ms(f64::NAN, None, 25.0) - 40.0).abs() < 1e-9);
        assert!((target_interval_ms(-24.0, None, 25.0) - 40.0).abs() < 1e-9);
        assert!((target_interval_ms(f64::INFINITY, None, 0.0) - 1000.0 / 60.0).abs() < 1e-9);
        assert!((target_interval_ms(30.0, Some(50.0), 25.0) - 20.0).abs() < 1e-9);
        assert!((target_interval_ms(30.0, Some(0.0), 25.0) - 1000.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn remaining_budget_is_clamped() {
        let pacing = PacingState {
            target_interval_ms: 33.33,
            render_cost_ms: 50.0,
        };
        assert_eq!(pacing.remaining_ms(), 0.0);
        assert!(pacing.overran());

        let pacing = PacingState {
            target_interval_ms: 33.33,
            render_cost_ms: 3.33,
        };
        assert!((pacing.remaining_ms() - 30.0).abs() < 1e-9);
        assert!(!pacing.overran());
    }

    #[test]
    fn overrun_waits_zero_not_negative() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(4, 30.0, &harness.log);
        let summary = harness.run(source, harness.target(), 50.0, PlaybackOptions::default());

        assert_eq!(harness.waits(), vec![0.0; 4]);
        assert_eq!(summary.overruns, 4);
        assert_eq!(summary.frames_rendered, 4);
    }

    #[test]
    fn waits_for_remaining_budget() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(2, 50.0, &harness.log);
        harness.run(source, harness.target(), 5.0, PlaybackOptions::default());

        for wait in harness.waits() {
            assert!((wait - 15.0).abs() < 1e-9, "{wait}");
        }
    }

    #[test]
    fn end_of_stream_stops_rendering_and_waiting() {
        use Event::*;

        let harness = Harness::new();
        let mut script: Vec<Step> = vec![Step::Frame, Step::Frame, Step::Eos];
        // Never reached.
        script.push(Step::Frame);
        let source = ScriptedSource::new(script, 25.0, &harness.log);
        let summary = harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert_eq!(
            *harness.log.borrow(),
            vec![
                Pull,
                Start,
                Render,
                Stop,
                Wait(39.0),
                Pull,
                Start,
                Render,
                Stop,
                Wait(39.0),
                Pull,
            ]
        );
        assert_eq!(summary.termination, Termination::EndOfStream);
        assert_eq!(summary.frames_rendered, 2);
    }

    #[test]
    fn empty_frame_is_end_of_stream() {
        let harness = Harness::new();
        let script = vec![Step::Frame, Step::Empty, Step::Frame];
        let source = ScriptedSource::new(script, 25.0, &harness.log);
        let summary = harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert_eq!(summary.termination, Termination::EndOfStream);
        assert_eq!(summary.frames_rendered, 1);
    }

    #[test]
    fn empty_stream_never_renders() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(0, 25.0, &harness.log);
        let summary = harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert_eq!(summary.frames_rendered, 0);
        assert_eq!(harness.count(|e| matches!(e, Event::Render)), 0);
        assert_eq!(harness.count(|e| matches!(e, Event::Wait(_))), 0);
    }

    #[test]
    fn device_context_released_once_at_end_of_stream() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(3, 30.0, &harness.log);
        harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert_eq!(harness.counter.acquired.get(), 1);
        assert_eq!(harness.counter.released.get(), 1);
    }

    #[test]
    fn decode_error_ends_like_end_of_stream() {
        let harness = Harness::new();
        let script = vec![Step::Frame, Step::Frame, Step::Error, Step::Frame];
        let source = ScriptedSource::new(script, 30.0, &harness.log);
        let summary = harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert!(
            matches!(&summary.termination, Termination::DecodeError(m) if m.contains("corrupt packet"))
        );
        assert_eq!(summary.frames_rendered, 2);
        assert_eq!(harness.count(|e| matches!(e, Event::Render)), 2);
        assert_eq!(harness.counter.acquired.get(), 1);
        assert_eq!(harness.counter.released.get(), 1);
    }

    #[test]
    fn decode_error_on_first_frame() {
        let harness = Harness::new();
        let source = ScriptedSource::new(vec![Step::Error], 30.0, &harness.log);
        let summary = harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert!(matches!(summary.termination, Termination::DecodeError(_)));
        assert_eq!(summary.frames_rendered, 0);
        assert_eq!(harness.counter.released.get(), 1);
    }

    #[test]
    fn blit_failures_are_counted_and_playback_continues() {
        let harness = Harness::new();
        let mut target = harness.target();
        target.fail_every = Some(2);
        let source = ScriptedSource::frames(5, 30.0, &harness.log);
        let summary = harness.run(source, target, 1.0, PlaybackOptions::default());

        assert_eq!(summary.blit_failures, 2);
        assert_eq!(summary.frames_rendered, 3);
        assert_eq!(harness.count(|e| matches!(e, Event::Wait(_))), 5);
        assert_eq!(summary.termination, Termination::EndOfStream);
    }

    #[test]
    fn cancellation_before_first_frame() {
        let harness = Harness::new();
        harness.cancel.cancel();
        let source = ScriptedSource::frames(3, 30.0, &harness.log);
        let summary = harness.run(source, harness.target(), 1.0, PlaybackOptions::default());

        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(summary.frames_rendered, 0);
        assert_eq!(harness.counter.released.get(), 1);
    }

    #[test]
    fn cancellation_is_polled_between_frames() {
        let harness = Harness::new();
        let mut target = harness.target();
        target.cancel_after = Some((2, harness.cancel.clone()));
        let source = ScriptedSource::frames(10, 30.0, &harness.log);
        let summary = harness.run(source, target, 1.0, PlaybackOptions::default());

        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(summary.frames_rendered, 2);
    }

    #[test]
    fn looping_restarts_the_source() {
        let harness = Harness::new();
        let mut target = harness.target();
        target.cancel_after = Some((7, harness.cancel.clone()));
        let source = ScriptedSource::frames(3, 30.0, &harness.log);
        let rewinds = Rc::clone(&source.rewinds);
        let options = PlaybackOptions {
            looping: true,
            ..Default::default()
        };
        let summary = harness.run(source, target, 1.0, options);

        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(summary.frames_rendered, 7);
        assert_eq!(rewinds.get(), 2);
        assert_eq!(summary.loops, 2);
    }

    #[test]
    fn looping_an_empty_source_terminates() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(0, 30.0, &harness.log);
        let rewinds = Rc::clone(&source.rewinds);
        let options = PlaybackOptions {
            looping: true,
            ..Default::default()
        };
        let summary = harness.run(source, harness.target(), 1.0, options);

        assert_eq!(summary.termination, Termination::EndOfStream);
        assert_eq!(rewinds.get(), 1);
        assert_eq!(summary.frames_rendered, 0);
    }

    #[test]
    fn frame_rate_override_sets_interval() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(1, 30.0, &harness.log);
        let options = PlaybackOptions {
            frame_rate_override: Some(100.0),
            ..Default::default()
        };
        harness.run(source, harness.target(), 2.0, options);

        assert_eq!(harness.waits(), vec![8.0]);
    }

    #[test]
    fn new_loop_starts_priming() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(1, 30.0, &harness.log);
        let blitter = FrameBlitter::new(harness.target(), DISPLAY);
        let render_loop = RenderLoop::new(
            source,
            blitter,
            harness.pacer(1.0),
            PlaybackOptions::default(),
            harness.cancel.clone(),
        );
        assert_eq!(render_loop.state(), LoopState::Priming);
        assert_eq!(render_loop.run().frames_rendered, 1);
    }

    #[test]
    fn play_through_matches_frame_rate_in_wall_time() {
        const FRAMES: usize = 20;
        const FPS: f64 = 100.0;

        let log = Log::default();
        let source = ScriptedSource::frames(FRAMES, FPS, &log);
        let blitter = FrameBlitter::new(NullTarget, DISPLAY);
        let timer = Timer::new(MonotonicClock::new()).unwrap();

        let started = Instant::now();
        let summary = RenderLoop::new(
            source,
            blitter,
            timer,
            PlaybackOptions::default(),
            CancelToken::new(),
        )
        .run();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let expected_ms = FRAMES as f64 * 1000.0 / FPS;
        assert_eq!(summary.frames_rendered, FRAMES as u64);
        assert!(
            elapsed_ms >= expected_ms * 0.95 && elapsed_ms <= expected_ms * 1.15,
            "{FRAMES} frames at {FPS} fps took {elapsed_ms:.2} ms, expected ~{expected_ms} ms"
        );
    }

    #[test]
    fn cancellation_interrupts_a_long_frame_wait() {
        let log = Log::default();
        // Two seconds per frame.
        let source = ScriptedSource::frames(3, 0.5, &log);
        let blitter = FrameBlitter::new(NullTarget, DISPLAY);
        let cancel = CancelToken::new();
        let timer = Timer::new(MonotonicClock::new())
            .unwrap()
            .cancel_on(cancel.clone());

        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(50));
                cancel.cancel();
            })
        };
        let started = Instant::now();
        let summary =
            RenderLoop::new(source, blitter, timer, PlaybackOptions::default(), cancel).run();
        canceller.join().unwrap();

        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(summary.frames_rendered, 1);
        assert!(
            started.elapsed().as_secs_f64() < 1.0,
            "run returned after {:?}",
            started.elapsed()
        );
        // The second frame is never pulled.
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn end_of_stream_after_cancellation_does_not_loop() {
        /// Gives up its blocking pull when cancelled, like a stalled stream.
        struct StalledSource {
            cancel: CancelToken,
            pulls: usize,
            rewinds: Rc<Cell<usize>>,
        }

        impl FrameSource for StalledSource {
            fn frame_rate(&self) -> f64 {
                1000.0
            }

            fn next_frame(&mut self) -> Next {
                self.pulls += 1;
                if self.pulls == 1 {
                    return Next::Frame(Frame::packed(1, 1, 4, vec![0; 4]).unwrap());
                }
                self.cancel.cancel();
                Next::EndOfStream
            }

            fn rewind(&mut self) -> eyre::Result<()> {
                self.rewinds.set(self.rewinds.get() + 1);
                Ok(())
            }

            fn describe(&self) -> String {
                "stalled".into()
            }
        }

        let cancel = CancelToken::new();
        let rewinds = Rc::new(Cell::new(0));
        let source = StalledSource {
            cancel: cancel.clone(),
            pulls: 0,
            rewinds: Rc::clone(&rewinds),
        };
        let log = Log::default();
        let pacer = RecordingPacer {
            cost_ms: 0.0,
            log: Rc::clone(&log),
        };
        let options = PlaybackOptions {
            looping: true,
            ..Default::default()
        };
        let summary = RenderLoop::new(
            source,
            FrameBlitter::new(NullTarget, DISPLAY),
            pacer,
            options,
            cancel,
        )
        .run();

        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(summary.frames_rendered, 1);
        assert_eq!(summary.loops, 0);
        assert_eq!(rewinds.get(), 0);
    }

    #[test]
    fn unusable_override_falls_back_to_reported_rate() {
        let harness = Harness::new();
        let source = ScriptedSource::frames(1, 50.0, &harness.log);
        let options = PlaybackOptions {
            frame_rate_override: Some(0.0),
            ..Default::default()
        };
        harness.run(source, harness.target(), 5.0, options);

        assert_eq!(harness.waits(), vec![15.0]);
    }
}
