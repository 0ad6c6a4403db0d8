// ------------------------------------------------------------
// Playback engine (animation mode)
// ------------------------------------------------------------
//
// The engine owns everything a frame callback needs: the borrowed trace, the
// frame counter, the fps meter and the drawable primitives. A host pulls
// frames from it one at a time and decides when to stop.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use crate::error::{PlaybackError, Result};
use crate::fps::FpsMeter;
use crate::geometry::{bob_position, Point2};
use crate::trace::SimulationTrace;

/// Animation parameters taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    /// Samples skipped per frame.
    pub render_dt: usize,
    /// Frames per fps measurement window.
    pub frames_count_fps: u64,
    /// Pivot of the pendulum in plot coordinates.
    pub anchor: Point2,
    /// Height of the elapsed-time label, in pendulum lengths.
    pub text_y: f64,
}

/// Timing of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub frame_index: u64,
    pub sample_index: usize,
    pub sim_time: f64,
}

impl FrameState {
    /// Timing of `frame_index`, or `None` if the sample index overflows.
    pub fn at(frame_index: u64, render_dt: usize, dt: f64) -> Option<Self> {
        let frame = usize::try_from(frame_index).ok()?;
        let sample_index = render_dt.checked_mul(frame)?;
        Some(Self {
            frame_index,
            sample_index,
            sim_time: sample_index as f64 * dt,
        })
    }

    // Stand-in for a frame whose sample index no longer fits; it stays past the end.
    fn saturated(frame_index: u64, dt: f64) -> Self {
        Self {
            frame_index,
            sample_index: usize::MAX,
            sim_time: usize::MAX as f64 * dt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Initializing,
    Running,
    /// Past the last sample; the scene no longer changes.
    Ended,
}

/// Drawable primitives of the animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub anchor: Point2,
    /// Empty until the first sample is drawn, then `[anchor, bob]`.
    pub line: Vec<Point2>,
    pub bob: Option<Point2>,
    pub label: String,
    pub label_position: Point2,
}

impl Scene {
    fn empty(anchor: Point2, label_position: Point2) -> Self {
        Self {
            anchor,
            line: Vec::new(),
            bob: None,
            label: String::new(),
            label_position,
        }
    }
}

/// Elapsed-time label text.
pub fn time_label(sim_time: f64) -> String {
    format!("{sim_time:.2}s")
}

/// Result of one engine step.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub state: FrameState,
    pub phase: PlaybackPhase,
    pub scene: Scene,
    /// Set on frames that close an fps measurement window.
    pub fps: Option<f64>,
}

pub struct PlaybackEngine<'t> {
    trace: &'t SimulationTrace,
    settings: AnimationSettings,
    phase: PlaybackPhase,
    next_frame: u64,
    fps: FpsMeter,
    scene: Scene,
}

impl<'t> PlaybackEngine<'t> {
    pub fn new(trace: &'t SimulationTrace, settings: AnimationSettings) -> Self {
        let label_position = Point2::new(0.0, settings.text_y * trace.header.pendulum_length);
        Self {
            trace,
            settings,
            phase: PlaybackPhase::Initializing,
            next_frame: 0,
            fps: FpsMeter::new(settings.frames_count_fps),
            scene: Scene::empty(settings.anchor, label_position),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Run the callback for the next frame, observed at wall-clock `now`.
    pub fn advance(&mut self, now: Instant) -> Result<Frame> {
        let frame_index = self.next_frame;
        let sample_count = self.trace.sample_count();

        if self.phase == PlaybackPhase::Initializing {
            debug!(
                samples = sample_count,
                render_dt = self.settings.render_dt,
                "playback started"
            );
            self.phase = PlaybackPhase::Running;
        }

        let fps = self.fps.observe(frame_index, now);

        let out_of_range = |sample_index| PlaybackError::FrameOutOfRange {
            frame: frame_index,
            sample_index,
            sample_count,
        };
        let dt = self.trace.header.dt;
        let state = match FrameState::at(frame_index, self.settings.render_dt, dt) {
            Some(state) => state,
            None if self.phase == PlaybackPhase::Ended => FrameState::saturated(frame_index, dt),
            None => return Err(out_of_range(usize::MAX)),
        };
        self.next_frame += 1;

        if state.sample_index >= sample_count {
            if self.phase != PlaybackPhase::Ended {
                info!(frame = frame_index, "end of trace reached");
                self.phase = PlaybackPhase::Ended;
            }
        } else {
            // The header promised this sample; a short series is a broken contract.
            let alpha = *self
                .trace
                .alpha
                .get(state.sample_index)
                .ok_or_else(|| out_of_range(state.sample_index))?;

            let bob = bob_position(self.scene.anchor, self.trace.header.pendulum_length, alpha);
            self.scene.bob = Some(bob);
            self.scene.line = vec![self.scene.anchor, bob];
            self.scene.label = time_label(state.sim_time);
        }

        Ok(Frame {
            state,
            phase: self.phase,
            scene: self.scene.clone(),
            fps,
        })
    }

    /// Turn the engine into its frame sequence: `sample_count` frames, pulled lazily.
    pub fn into_frames(self) -> Frames<'t> {
        let budget = self.trace.sample_count() as u64;
        Frames {
            engine: self,
            budget,
            failed: false,
        }
    }
}

/// Finite, non-restartable sequence of frames. Stops after the first error.
pub struct Frames<'t> {
    engine: PlaybackEngine<'t>,
    budget: u64,
    failed: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.engine.next_frame >= self.budget {
            return None;
        }
        let frame = self.engine.advance(Instant::now());
        self.failed = frame.is_err();
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let left = self.budget.saturating_sub(self.engine.next_frame);
        let left = usize::try_from(left).unwrap_or(usize::MAX);
        (0, Some(left))
    }
}

// ------------------------------------------------------------
// Host loop
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Continue,
    Closed,
}

/// What a rendering host must provide to play an animation.
pub trait AnimationSurface {
    /// Show the primitives of one frame.
    fn draw_frame(&mut self, scene: &Scene) -> anyhow::Result<HostSignal>;

    /// Keep the last frame on screen after the frames ran out.
    fn hold(&mut self) -> anyhow::Result<HostSignal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every frame was shown and the window was closed afterwards.
    Completed,
    /// The window was closed while frames were still pending.
    Closed,
    /// The operator interrupted the process.
    Interrupted,
}

/// Pull frames into `surface` until it closes or `stop` is raised.
///
/// fps readings go to `status` as `fps = N` lines.
pub fn run_animation<I, S, W>(
    frames: I,
    surface: &mut S,
    stop: &AtomicBool,
    status: &mut W,
) -> anyhow::Result<RunOutcome>
where
    I: IntoIterator<Item = Result<Frame>>,
    S: AnimationSurface + ?Sized,
    W: Write,
{
    let mut frames = frames.into_iter();
    let mut exhausted = false;

    loop {
        if stop.load(Ordering::Relaxed) {
            info!("playback interrupted");
            return Ok(RunOutcome::Interrupted);
        }

        if exhausted {
            if surface.hold()? == HostSignal::Closed {
                return Ok(RunOutcome::Completed);
            }
            continue;
        }

        let Some(frame) = frames.next() else {
            debug!("frame budget exhausted");
            exhausted = true;
            continue;
        };
        let frame = frame.context("animation aborted")?;

        if let Some(fps) = frame.fps {
            writeln!(status, "fps = {fps:.2}")?;
            debug!(frame = frame.state.frame_index, fps, "frame rate");
        }

        if surface.draw_frame(&frame.scene)? == HostSignal::Closed {
            info!(frame = frame.state.frame_index, "window closed");
            return Ok(RunOutcome::Closed);
        }
    }
}
