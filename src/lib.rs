//! # pendulum-playback
//!
//! Playback of pre-computed pendulum simulation traces.
//!
//! A trace file written by an external numerical model is loaded into a
//! [`SimulationTrace`]. It is then either animated frame by frame through a
//! [`PlaybackEngine`], or plotted as angle-vs-time curves from a [`CurvePlan`].

pub mod config;
pub mod curves;
pub mod error;
pub mod fps;
pub mod geometry;
pub mod playback;
pub mod render;
pub mod trace;

pub use config::{FigureGeometry, PlaybackConfig, RenderMode};
pub use curves::{CurvePlan, CurveSelection};
pub use error::PlaybackError;
pub use playback::{
    run_animation, AnimationSettings, AnimationSurface, Frame, FrameState, HostSignal,
    PlaybackEngine, PlaybackPhase, RunOutcome, Scene,
};
pub use trace::{load_trace, parse_trace, write_trace, SimulationTrace, TraceFlags};
