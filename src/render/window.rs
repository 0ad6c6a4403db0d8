// ------------------------------------------------------------
// On-screen hosts (minifb)
// ------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use image::RgbImage;
use minifb::{Key, Window, WindowOptions};
use tracing::{debug, info};

use super::plot::{draw_curves, draw_label, draw_pendulum_axes, font_px};
use super::raster::{draw_scene, to_minifb_buffer, Strokes};
use crate::config::FigureGeometry;
use crate::curves::CurvePlan;
use crate::geometry::{Point2, Viewport};
use crate::playback::{AnimationSurface, HostSignal, RunOutcome, Scene};

const ANIMATION_TITLE: &str = "Numerical model of a pendulum";
const CURVES_TITLE: &str = "Pendulum angle";

// Refresh rate once nothing moves any more.
const IDLE_FPS: usize = 30;

fn open_window(title: &str, size: u32) -> Result<Window> {
    Window::new(title, size as usize, size as usize, WindowOptions::default())
        .with_context(|| format!("Failed to create window '{title}'"))
}

fn closing(window: &Window) -> bool {
    !window.is_open() || window.is_key_down(Key::Escape)
}

/// Animation window. Axes are drawn once; every frame starts from a copy.
pub struct PendulumWindow {
    window: Window,
    background: RgbImage,
    viewport: Viewport,
    strokes: Strokes,
    label_px: u32,
    size: u32,
    idle: bool,
}

impl PendulumWindow {
    pub fn open(figure: FigureGeometry, pendulum_length: f64, anchor: Point2) -> Result<Self> {
        let size = figure.size_px;
        let lims = (figure.plot_lims * pendulum_length.abs()).max(1e-9);

        let mut background = RgbImage::new(size, size);
        let viewport = draw_pendulum_axes(&mut background, lims, anchor)
            .context("Failed to draw animation axes")?;

        let mut window = open_window(ANIMATION_TITLE, size)?;
        // No frame pacing: play as fast as the host allows.
        window.set_target_fps(0);
        debug!(size, lims, "animation window opened");

        Ok(Self {
            window,
            background,
            viewport,
            strokes: Strokes::for_size(size),
            label_px: font_px(size, 28.0),
            size,
            idle: false,
        })
    }
}

impl AnimationSurface for PendulumWindow {
    fn draw_frame(&mut self, scene: &Scene) -> Result<HostSignal> {
        if closing(&self.window) {
            return Ok(HostSignal::Closed);
        }

        let mut img = self.background.clone();
        draw_scene(&mut img, scene, &self.viewport, self.strokes);
        draw_label(
            &mut img,
            &scene.label,
            self.viewport.to_pixel(scene.label_position),
            self.label_px,
        )?;

        let buffer = to_minifb_buffer(&img);
        self.window
            .update_with_buffer(&buffer, self.size as usize, self.size as usize)
            .context("Failed to update animation window")?;
        Ok(HostSignal::Continue)
    }

    fn hold(&mut self) -> Result<HostSignal> {
        if !self.idle {
            self.window.set_target_fps(IDLE_FPS);
            self.idle = true;
        }
        if closing(&self.window) {
            return Ok(HostSignal::Closed);
        }
        self.window.update();
        Ok(HostSignal::Continue)
    }
}

/// Show the curve figure and block until it is closed or `stop` is raised.
pub fn show_curves(plan: &CurvePlan, figure: FigureGeometry, stop: &AtomicBool) -> Result<RunOutcome> {
    let size = figure.size_px;
    let mut img = RgbImage::new(size, size);
    draw_curves(&mut img, plan).context("Failed to draw angle curves")?;
    let buffer = to_minifb_buffer(&img);

    let mut window = open_window(CURVES_TITLE, size)?;
    window.set_target_fps(IDLE_FPS);
    info!(curves = plan.series.len(), "showing angle curves");

    while !closing(&window) {
        if stop.load(Ordering::Relaxed) {
            return Ok(RunOutcome::Interrupted);
        }
        window
            .update_with_buffer(&buffer, size as usize, size as usize)
            .context("Failed to update curve window")?;
    }
    Ok(RunOutcome::Completed)
}
