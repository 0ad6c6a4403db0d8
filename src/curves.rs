// ------------------------------------------------------------
// Static angle-vs-time curves
// ------------------------------------------------------------
//
// The plan is computed separately from drawing so the overlay rules can be
// checked without a window.

use std::ops::Range;

use crate::error::{PlaybackError, Result};
use crate::trace::{ExtremumPoints, SimulationTrace};

/// Which curves a curve-mode run draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurveSelection {
    /// The simulated angle series.
    pub simulation: bool,
    /// The theoretical comparison series.
    pub theoretical: bool,
    /// Extremum markers and guide lines for every drawn curve.
    pub extremums: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveSeries {
    pub label: &'static str,
    /// Index into the plot palette, shared by the curve and its overlays.
    pub color_slot: usize,
    pub points: Vec<(f64, f64)>,
    pub markers: Vec<(f64, f64)>,
    /// Times of the dashed vertical guides.
    pub guides: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurvePlan {
    pub series: Vec<CurveSeries>,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
}

fn overlay(points: Option<&ExtremumPoints>, label: &str) -> Result<(Vec<(f64, f64)>, Vec<f64>)> {
    let points = points.ok_or_else(|| {
        PlaybackError::Configuration(format!("extremums requested but the {label} curve has none"))
    })?;
    Ok((points.iter().collect(), points.x.clone()))
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

impl CurvePlan {
    pub fn build(trace: &SimulationTrace, selection: CurveSelection) -> Result<Self> {
        let mut series = Vec::new();

        if selection.simulation {
            let (markers, guides) = if selection.extremums {
                overlay(trace.extremums.as_ref(), "simulation")?
            } else {
                (Vec::new(), Vec::new())
            };
            series.push(CurveSeries {
                label: "simulation",
                color_slot: series.len(),
                points: trace.time.iter().copied().zip(trace.alpha.iter().copied()).collect(),
                markers,
                guides,
            });
        }

        if selection.theoretical {
            let theory = trace.theoretical_alpha.as_ref().ok_or_else(|| {
                PlaybackError::Configuration("theoretical curve requested but the trace has none".into())
            })?;
            let (markers, guides) = if selection.extremums {
                overlay(trace.theoretical_extremums.as_ref(), "theory")?
            } else {
                (Vec::new(), Vec::new())
            };
            series.push(CurveSeries {
                label: "theory",
                color_slot: series.len(),
                points: trace.time.iter().copied().zip(theory.iter().copied()).collect(),
                markers,
                guides,
            });
        }

        if series.is_empty() {
            return Err(PlaybackError::Configuration(
                "no curve selected: enable plot_alpha or calculate_theoretical".into(),
            ));
        }

        let x_range = match span(trace.time.iter().copied()) {
            Some((lo, hi)) if hi > lo => lo..hi,
            Some((lo, _)) => (lo - 0.5)..(lo + 0.5),
            None => 0.0..1.0,
        };

        let ys = series
            .iter()
            .flat_map(|s| s.points.iter().chain(s.markers.iter()).map(|&(_, y)| y));
        let y_range = match span(ys) {
            Some((lo, hi)) => {
                // 5% padding so markers at the extremes are not clipped.
                let pad = 0.05 * (hi - lo).abs().max(1e-9);
                (lo - pad)..(hi + pad)
            }
            None => 0.0..1.0,
        };

        Ok(Self {
            series,
            x_range,
            y_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceHeader;

    fn trace() -> SimulationTrace {
        SimulationTrace {
            header: TraceHeader {
                dt: 0.5,
                pendulum_length: 1.0,
                t_max: 1.5,
                sample_count: 4,
            },
            time: vec![0.0, 0.5, 1.0, 1.5],
            alpha: vec![0.0, 1.0, 0.0, -1.0],
            extremums: Some(ExtremumPoints {
                x: vec![0.5, 1.5],
                y: vec![1.0, -1.0],
            }),
            theoretical_alpha: Some(vec![0.0, 0.9, 0.0, -0.9]),
            theoretical_extremums: Some(ExtremumPoints {
                x: vec![0.5],
                y: vec![0.9],
            }),
        }
    }

    #[test]
    fn primary_curve_only() {
        let plan = CurvePlan::build(
            &trace(),
            CurveSelection {
                simulation: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plan.series.len(), 1);
        let s = &plan.series[0];
        assert_eq!(s.label, "simulation");
        assert_eq!(s.color_slot, 0);
        assert_eq!(s.points[1], (0.5, 1.0));
        assert!(s.markers.is_empty());
        assert!(s.guides.is_empty());
        assert_eq!(plan.x_range, 0.0..1.5);
    }

    #[test]
    fn overlays_follow_their_own_extremum_lists() {
        let plan = CurvePlan::build(
            &trace(),
            CurveSelection {
                simulation: true,
                theoretical: true,
                extremums: true,
            },
        )
        .unwrap();
        let [sim, theory] = &plan.series[..] else {
            panic!("expected two curves");
        };
        assert_eq!(sim.markers, vec![(0.5, 1.0), (1.5, -1.0)]);
        assert_eq!(sim.guides, vec![0.5, 1.5]);
        assert_eq!(theory.label, "theory");
        assert_eq!(theory.color_slot, 1);
        assert_eq!(theory.markers, vec![(0.5, 0.9)]);
        assert_eq!(theory.guides, vec![0.5]);
    }

    #[test]
    fn theory_only_curve_takes_the_first_colour() {
        let plan = CurvePlan::build(
            &trace(),
            CurveSelection {
                simulation: false,
                theoretical: true,
                extremums: true,
            },
        )
        .unwrap();
        assert_eq!(plan.series.len(), 1);
        assert_eq!(plan.series[0].label, "theory");
        assert_eq!(plan.series[0].color_slot, 0);
        assert_eq!(plan.series[0].guides, vec![0.5]);
    }

    #[test]
    fn y_range_is_padded() {
        let plan = CurvePlan::build(
            &trace(),
            CurveSelection {
                simulation: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!((plan.y_range.start + 1.1).abs() < 1e-12);
        assert!((plan.y_range.end - 1.1).abs() < 1e-12);
    }

    #[test]
    fn missing_series_are_configuration_errors() {
        let mut tr = trace();
        tr.theoretical_alpha = None;
        let err = CurvePlan::build(
            &tr,
            CurveSelection {
                theoretical: true,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PlaybackError::Configuration(_)));

        let mut tr = trace();
        tr.extremums = None;
        assert!(CurvePlan::build(
            &tr,
            CurveSelection {
                simulation: true,
                extremums: true,
                ..Default::default()
            },
        )
        .is_err());

        assert!(CurvePlan::build(&trace(), CurveSelection::default()).is_err());
    }
}
