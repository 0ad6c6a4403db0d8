// ------------------------------------------------------------
// Chart drawing (Plotters)
// ------------------------------------------------------------
//
// Everything is drawn into in-memory RGB images; the window module puts them
// on screen. Nothing is written to disk.

use anyhow::Result;
use image::RgbImage;
use plotters::coord::CoordTranslate;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::curves::CurvePlan;
use crate::geometry::{Point2, Viewport};

const PIVOT_COLOR: RGBColor = RGBColor(214, 39, 40);

// Same ordering as the usual matplotlib cycle.
const PALETTE: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(148, 103, 189),
];

pub fn palette(slot: usize) -> RGBColor {
    PALETTE[slot % PALETTE.len()]
}

/// Font size scaled from a 700 px reference figure.
pub fn font_px(size_px: u32, base: f64) -> u32 {
    (f64::from(size_px) / 700.0 * base).round().max(8.0) as u32
}

/// Draw the static part of the animation: axes, grid and pivot.
///
/// Returns the plot-to-pixel mapping of the plotting area so moving
/// primitives can be drawn on copies of the image.
pub fn draw_pendulum_axes(img: &mut RgbImage, lims: f64, anchor: Point2) -> Result<Viewport> {
    let (w, h) = img.dimensions();
    let root = BitMapBackend::with_buffer(&mut **img, (w, h)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(font_px(w, 14.0))
        .caption("Numerical model of a pendulum", ("sans-serif", font_px(w, 22.0)))
        .x_label_area_size(font_px(w, 45.0))
        .y_label_area_size(font_px(w, 55.0))
        .build_cartesian_2d(-lims..lims, -lims..lims)?;

    chart
        .configure_mesh()
        .x_desc("x, m")
        .y_desc("y, m")
        .axis_desc_style(("sans-serif", font_px(w, 16.0)))
        .label_style(("sans-serif", font_px(w, 12.0)))
        .x_labels(9)
        .y_labels(9)
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .bold_line_style(RGBColor(200, 200, 200).stroke_width(1))
        .light_line_style(RGBColor(240, 240, 240).stroke_width(1))
        .draw()?;

    chart.draw_series(std::iter::once(Circle::new(
        (anchor.x, anchor.y),
        font_px(w, 5.0),
        PIVOT_COLOR.filled(),
    )))?;

    let coords = chart.as_coord_spec();
    let viewport = Viewport::from_corners(
        Point2::new(-lims, -lims),
        coords.translate(&(-lims, -lims)),
        Point2::new(lims, lims),
        coords.translate(&(lims, lims)),
    );

    root.present()?;
    Ok(viewport)
}

/// Draw `text` with its top-left corner at pixel `at`.
pub fn draw_label(img: &mut RgbImage, text: &str, at: (f32, f32), size: u32) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let (w, h) = img.dimensions();
    let root = BitMapBackend::with_buffer(&mut **img, (w, h)).into_drawing_area();
    root.draw(&Text::new(
        text,
        (at.0.round() as i32, at.1.round() as i32),
        ("sans-serif", f64::from(size)).into_font().color(&BLACK),
    ))?;
    root.present()?;
    Ok(())
}

/// Draw angle-vs-time curves with their extremum markers and guides.
pub fn draw_curves(img: &mut RgbImage, plan: &CurvePlan) -> Result<()> {
    let (w, h) = img.dimensions();
    let root = BitMapBackend::with_buffer(&mut **img, (w, h)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(font_px(w, 14.0))
        .x_label_area_size(font_px(w, 45.0))
        .y_label_area_size(font_px(w, 60.0))
        .build_cartesian_2d(plan.x_range.clone(), plan.y_range.clone())?;

    chart
        .configure_mesh()
        .x_desc("t, s")
        .y_desc("alpha, rad")
        .axis_desc_style(("sans-serif", font_px(w, 16.0)))
        .label_style(("sans-serif", font_px(w, 12.0)))
        .x_labels(10)
        .y_labels(10)
        .x_label_formatter(&|v| format!("{:.1}", v))
        .y_label_formatter(&|v| format!("{:.2}", v))
        .bold_line_style(RGBColor(200, 200, 200).stroke_width(1))
        .light_line_style(RGBColor(240, 240, 240).stroke_width(1))
        .draw()?;

    let (y_lo, y_hi) = (plan.y_range.start, plan.y_range.end);
    let marker_px = font_px(w, 4.0);

    for series in &plan.series {
        let color = palette(series.color_slot);

        chart
            .draw_series(LineSeries::new(
                series.points.iter().copied(),
                color.stroke_width(2),
            ))?
            .label(series.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart.draw_series(
            series
                .markers
                .iter()
                .map(|&(x, y)| Circle::new((x, y), marker_px, color.filled())),
        )?;

        for &t in &series.guides {
            chart.draw_series(DashedLineSeries::new(
                vec![(t, y_lo), (t, y_hi)],
                6,
                4,
                color.stroke_width(1),
            ))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", font_px(w, 13.0)))
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
