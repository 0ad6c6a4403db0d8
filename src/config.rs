// ------------------------------------------------------------
// Playback configuration
// ------------------------------------------------------------

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::curves::CurveSelection;
use crate::error::{PlaybackError, Result};
use crate::geometry::Point2;
use crate::playback::AnimationSettings;
use crate::trace::TraceFlags;

/// Pixels per figure inch.
pub const FIGURE_DPI: f64 = 100.0;

/// Largest window edge a figure may ask for, in pixels.
pub const MAX_FIGURE_PX: f64 = 8192.0;

/// Every recognized configuration key. Missing keys take their defaults,
/// unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    pub plot_animation: bool,
    pub plot_alpha: bool,
    /// The trace carries a theoretical comparison series.
    pub calculate_theoretical: bool,
    /// The trace carries extremum points.
    pub calculate_extremums: bool,
    /// Samples skipped per animation frame.
    pub render_dt: usize,
    /// Frames between fps reports.
    pub frames_count_fps: u64,
    /// Figure edge, inches.
    pub figsize: f64,
    /// Half-width of the animation axes, in pendulum lengths.
    pub plot_lims: f64,
    /// Height of the time label, in pendulum lengths.
    pub text_y: f64,
    pub pendulum_axis_x: f64,
    pub pendulum_axis_y: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            plot_animation: true,
            plot_alpha: false,
            calculate_theoretical: false,
            calculate_extremums: false,
            render_dt: 1,
            frames_count_fps: 30,
            figsize: 7.0,
            plot_lims: 1.2,
            text_y: 1.1,
            pendulum_axis_x: 0.0,
            pendulum_axis_y: 0.0,
        }
    }
}

/// What a single invocation draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Animation,
    Curves,
}

/// Window geometry shared by both modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureGeometry {
    /// Square window edge in pixels.
    pub size_px: u32,
    pub plot_lims: f64,
}

impl PlaybackConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| PlaybackError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PlaybackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PlaybackError::Configuration(msg));

        if self.render_dt == 0 {
            return invalid("render_dt must be at least 1".into());
        }
        if self.frames_count_fps == 0 {
            return invalid("frames_count_fps must be at least 1".into());
        }
        for (key, value) in [("figsize", self.figsize), ("plot_lims", self.plot_lims)] {
            if !value.is_finite() || value <= 0.0 {
                return invalid(format!("{key} must be a positive number, got {value}"));
            }
        }
        if self.figsize * FIGURE_DPI > MAX_FIGURE_PX {
            return invalid(format!(
                "figsize {} is too large: the window edge may not exceed {MAX_FIGURE_PX} px",
                self.figsize
            ));
        }
        for (key, value) in [
            ("text_y", self.text_y),
            ("pendulum_axis_x", self.pendulum_axis_x),
            ("pendulum_axis_y", self.pendulum_axis_y),
        ] {
            if !value.is_finite() {
                return invalid(format!("{key} must be finite, got {value}"));
            }
        }
        Ok(())
    }

    /// Decide what this invocation draws. Animation and curves are exclusive.
    pub fn render_mode(&self) -> Result<RenderMode> {
        let curves = self.plot_alpha || self.calculate_theoretical;
        match (self.plot_animation, self.plot_alpha, curves) {
            (true, true, _) => Err(PlaybackError::Configuration(
                "plot_animation and plot_alpha cannot be combined in one run".into(),
            )),
            (true, false, _) => Ok(RenderMode::Animation),
            (false, _, true) => Ok(RenderMode::Curves),
            (false, _, false) => Err(PlaybackError::Configuration(
                "nothing to render: enable plot_animation, plot_alpha or calculate_theoretical"
                    .into(),
            )),
        }
    }

    pub fn trace_flags(&self) -> TraceFlags {
        TraceFlags {
            calculate_extremums: self.calculate_extremums,
            calculate_theoretical: self.calculate_theoretical,
        }
    }

    pub fn animation_settings(&self) -> AnimationSettings {
        AnimationSettings {
            render_dt: self.render_dt,
            frames_count_fps: self.frames_count_fps,
            anchor: Point2::new(self.pendulum_axis_x, self.pendulum_axis_y),
            text_y: self.text_y,
        }
    }

    pub fn curve_selection(&self) -> CurveSelection {
        CurveSelection {
            simulation: self.plot_alpha,
            theoretical: self.calculate_theoretical,
            extremums: self.calculate_extremums,
        }
    }

    pub fn figure(&self) -> FigureGeometry {
        FigureGeometry {
            size_px: (self.figsize * FIGURE_DPI).round().max(100.0) as u32,
            plot_lims: self.plot_lims,
        }
    }
}
