// ------------------------------------------------------------
// Plot-space geometry
// ------------------------------------------------------------

use std::f64::consts::FRAC_PI_2;

/// The model reports angles in [0, 2π) from its reference axis. Rendering
/// works in a frame rotated by -π/2 so that a hanging pendulum swings around
/// the bottom of the plot.
pub const ANGLE_OFFSET: f64 = FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Polar (rho, phi) to cartesian (x, y).
pub fn polar_to_cartesian(rho: f64, phi: f64) -> (f64, f64) {
    (rho * phi.cos(), rho * phi.sin())
}

/// Absolute bob position for a raw model angle.
pub fn bob_position(anchor: Point2, length: f64, alpha_raw: f64) -> Point2 {
    let (x, y) = polar_to_cartesian(length, alpha_raw - ANGLE_OFFSET);
    anchor.offset(x, y)
}

/// Affine map from plot coordinates to pixel coordinates.
///
/// Built from two reference points (normally two opposite corners of the
/// plotting area) so it stays independent of the chart library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    x0: f64,
    sx: f64,
    y0: f64,
    sy: f64,
}

impl Viewport {
    pub fn from_corners(data_a: Point2, px_a: (i32, i32), data_b: Point2, px_b: (i32, i32)) -> Self {
        let span_x = data_b.x - data_a.x;
        let span_y = data_b.y - data_a.y;
        let sx = if span_x.abs() > f64::EPSILON {
            f64::from(px_b.0 - px_a.0) / span_x
        } else {
            0.0
        };
        let sy = if span_y.abs() > f64::EPSILON {
            f64::from(px_b.1 - px_a.1) / span_y
        } else {
            0.0
        };
        Self {
            x0: f64::from(px_a.0) - sx * data_a.x,
            sx,
            y0: f64::from(px_a.1) - sy * data_a.y,
            sy,
        }
    }

    pub fn to_pixel(&self, p: Point2) -> (f32, f32) {
        ((self.x0 + self.sx * p.x) as f32, (self.y0 + self.sy * p.y) as f32)
    }

    /// Pixels per plot unit along x.
    pub fn scale_x(&self) -> f64 {
        self.sx.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-12;

    #[test]
    fn quarter_turn_points_along_positive_x() {
        let anchor = Point2::new(0.5, -0.25);
        let p = bob_position(anchor, 2.0, PI / 2.0);
        assert!((p.x - 2.5).abs() < EPS);
        assert!((p.y + 0.25).abs() < EPS);
    }

    #[test]
    fn three_quarter_turn_points_along_negative_x() {
        let anchor = Point2::new(0.0, 0.0);
        let p = bob_position(anchor, 1.0, 3.0 * PI / 2.0);
        assert!((p.x + 1.0).abs() < EPS);
        assert!(p.y.abs() < EPS);
    }

    #[test]
    fn zero_angle_hangs_below_the_anchor() {
        let p = bob_position(Point2::new(1.0, 1.0), 1.0, 0.0);
        assert!((p.x - 1.0).abs() < EPS);
        assert!(p.y.abs() < EPS);
    }

    #[test]
    fn viewport_maps_corners_and_flips_y() {
        let vp = Viewport::from_corners(
            Point2::new(-1.0, -1.0),
            (100, 500),
            Point2::new(1.0, 1.0),
            (500, 100),
        );
        assert_eq!(vp.to_pixel(Point2::new(-1.0, -1.0)), (100.0, 500.0));
        assert_eq!(vp.to_pixel(Point2::new(0.0, 0.0)), (300.0, 300.0));
        assert_eq!(vp.to_pixel(Point2::new(0.5, 1.0)), (400.0, 100.0));
        assert_eq!(vp.scale_x(), 200.0);
    }
}
