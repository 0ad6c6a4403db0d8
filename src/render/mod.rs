//! Rendering host. Static chart parts are drawn with Plotters; the moving
//! pendulum is rasterized with imageproc and shown through minifb.

pub mod plot;
pub mod raster;
pub mod window;

pub use window::{show_curves, PendulumWindow};
