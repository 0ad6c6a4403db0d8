// ------------------------------------------------------------
// CPU rasterization of the moving primitives
// ------------------------------------------------------------

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::geometry::Viewport;
use crate::playback::Scene;

pub const ARM_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
pub const BOB_COLOR: Rgb<u8> = Rgb([214, 39, 40]);

/// Pixel sizes of the pendulum primitives.
#[derive(Debug, Clone, Copy)]
pub struct Strokes {
    pub arm_px: i32,
    pub bob_radius_px: i32,
}

impl Strokes {
    pub fn for_size(size_px: u32) -> Self {
        let scale = f64::from(size_px) / 700.0;
        Self {
            arm_px: (3.0 * scale).round().max(1.0) as i32,
            bob_radius_px: (6.0 * scale).round().max(2.0) as i32,
        }
    }
}

// Widen the arm with whole-pixel copies across its minor axis, so neighbouring
// copies always touch.
fn draw_arm(img: &mut RgbImage, from: (f32, f32), to: (f32, f32), width_px: i32) {
    let half = width_px.max(1) / 2;
    let steep = (to.1 - from.1).abs() > (to.0 - from.0).abs();

    for k in -half..=half {
        let k = k as f32;
        let (ox, oy) = if steep { (k, 0.0) } else { (0.0, k) };
        draw_line_segment_mut(img, (from.0 + ox, from.1 + oy), (to.0 + ox, to.1 + oy), ARM_COLOR);
    }
}

/// Draw the arm and bob of `scene`. Primitives that are still empty are skipped.
pub fn draw_scene(img: &mut RgbImage, scene: &Scene, viewport: &Viewport, strokes: Strokes) {
    if let [from, to] = scene.line.as_slice() {
        draw_arm(
            img,
            viewport.to_pixel(*from),
            viewport.to_pixel(*to),
            strokes.arm_px,
        );
    }

    if let Some(bob) = scene.bob {
        // Same rounding as the arm end so the bob sits on the tip.
        let (x, y) = viewport.to_pixel(bob);
        draw_filled_circle_mut(
            img,
            (x.round() as i32, y.round() as i32),
            strokes.bob_radius_px,
            BOB_COLOR,
        );
    }
}

// RGB image to the 0RGB words minifb expects.
pub fn to_minifb_buffer(img: &RgbImage) -> Vec<u32> {
    img.pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
        })
        .collect()
}
