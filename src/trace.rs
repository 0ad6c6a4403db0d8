// ------------------------------------------------------------
// Trace loader
// ------------------------------------------------------------
//
// The trace file is written by the external numerical model. It is a plain,
// line-oriented text file without field names or a version tag, so the reader
// has to be told out-of-band which optional blocks were produced:
//
//   line 1..4  dt, pendulum_length, t_max, sample_count (one float each)
//   line 5     time samples
//   line 6     angle samples
//   [extremums]    extremum x, extremum y
//   [theoretical]  theoretical angle samples
//     [extremums]  theoretical extremum x, theoretical extremum y
//
// Anything after the last expected line is ignored.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{PlaybackError, Result};

/// Which optional blocks the upstream producer wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceFlags {
    pub calculate_extremums: bool,
    pub calculate_theoretical: bool,
}

/// Scalar header of a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHeader {
    /// Simulated seconds per sample.
    pub dt: f64,
    /// Arm length (m).
    pub pendulum_length: f64,
    /// Total simulated duration (s).
    pub t_max: f64,
    /// Declared as a float in the file, truncated on read.
    pub sample_count: usize,
}

/// Coordinates of local angle extrema on the angle-vs-time curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtremumPoints {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ExtremumPoints {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// A fully loaded simulation trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationTrace {
    pub header: TraceHeader,
    pub time: Vec<f64>,
    /// Angle in radians, 0 at the reference axis.
    pub alpha: Vec<f64>,
    pub extremums: Option<ExtremumPoints>,
    pub theoretical_alpha: Option<Vec<f64>>,
    pub theoretical_extremums: Option<ExtremumPoints>,
}

impl SimulationTrace {
    pub fn sample_count(&self) -> usize {
        self.header.sample_count
    }

    /// Flags that would reproduce this trace's optional blocks.
    pub fn flags(&self) -> TraceFlags {
        TraceFlags {
            calculate_extremums: self.extremums.is_some(),
            calculate_theoretical: self.theoretical_alpha.is_some(),
        }
    }
}

// ------------------------------------------------------------
// Parse stages
// ------------------------------------------------------------

/// Blocks of the trace file, in the order they appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Header,
    Primary,
    Extremum,
    Theoretical,
    TheoreticalExtremum,
    Done,
}

impl ParseStage {
    /// Stage that follows `self` for the given flags. Disabled blocks are skipped.
    pub fn next(self, flags: TraceFlags) -> ParseStage {
        match self {
            ParseStage::Header => ParseStage::Primary,
            ParseStage::Primary if flags.calculate_extremums => ParseStage::Extremum,
            ParseStage::Primary | ParseStage::Extremum if flags.calculate_theoretical => {
                ParseStage::Theoretical
            }
            ParseStage::Theoretical if flags.calculate_extremums => {
                ParseStage::TheoreticalExtremum
            }
            _ => ParseStage::Done,
        }
    }

    fn line_span(self) -> usize {
        match self {
            ParseStage::Header => 4,
            ParseStage::Primary | ParseStage::Extremum | ParseStage::TheoreticalExtremum => 2,
            ParseStage::Theoretical => 1,
            ParseStage::Done => 0,
        }
    }

    /// Stage that reads the 1-based `line` for the given flags.
    pub fn at_line(line: usize, flags: TraceFlags) -> ParseStage {
        let mut stage = ParseStage::Header;
        let mut end = 0;
        while stage != ParseStage::Done {
            end += stage.line_span();
            if line <= end {
                return stage;
            }
            stage = stage.next(flags);
        }
        stage
    }
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStage::Header => "header",
            ParseStage::Primary => "time/angle series",
            ParseStage::Extremum => "extremum points",
            ParseStage::Theoretical => "theoretical angle series",
            ParseStage::TheoreticalExtremum => "theoretical extremum points",
            ParseStage::Done => "end of trace",
        };
        f.write_str(name)
    }
}

// ------------------------------------------------------------
// Line cursor
// ------------------------------------------------------------

struct LineCursor<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
        }
    }

    fn next_line(&mut self, stage: ParseStage, field: &str) -> Result<(usize, &'a str)> {
        self.line_no += 1;
        match self.lines.next() {
            Some(line) => Ok((self.line_no, line)),
            None => Err(PlaybackError::malformed(
                self.line_no,
                stage,
                format!("missing line for {field}"),
            )),
        }
    }

    fn scalar(&mut self, stage: ParseStage, field: &str) -> Result<f64> {
        let (line_no, line) = self.next_line(stage, field)?;
        let mut tokens = line.split_whitespace();
        let value = match (tokens.next(), tokens.next()) {
            (Some(token), None) => parse_float(token, line_no, stage, field)?,
            (None, _) => {
                return Err(PlaybackError::malformed(
                    line_no,
                    stage,
                    format!("{field} is empty"),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(PlaybackError::malformed(
                    line_no,
                    stage,
                    format!("{field} must be a single value"),
                ))
            }
        };
        Ok(value)
    }

    fn series(&mut self, stage: ParseStage, field: &str) -> Result<(usize, Vec<f64>)> {
        let (line_no, line) = self.next_line(stage, field)?;
        let values = line
            .split_whitespace()
            .map(|token| parse_float(token, line_no, stage, field))
            .collect::<Result<Vec<_>>>()?;
        Ok((line_no, values))
    }

    fn points(&mut self, stage: ParseStage, field: &str) -> Result<ExtremumPoints> {
        let (_, x) = self.series(stage, &format!("{field} x"))?;
        let (line_no, y) = self.series(stage, &format!("{field} y"))?;
        if x.len() != y.len() {
            return Err(PlaybackError::malformed(
                line_no,
                stage,
                format!("{field} has {} x values but {} y values", x.len(), y.len()),
            ));
        }
        Ok(ExtremumPoints { x, y })
    }
}

fn parse_float(token: &str, line_no: usize, stage: ParseStage, field: &str) -> Result<f64> {
    token.parse::<f64>().map_err(|_| {
        PlaybackError::malformed(line_no, stage, format!("{field}: '{token}' is not a number"))
    })
}

fn check_series_len(
    values: &[f64],
    expected: usize,
    line_no: usize,
    stage: ParseStage,
    field: &str,
) -> Result<()> {
    if values.len() != expected {
        return Err(PlaybackError::malformed(
            line_no,
            stage,
            format!(
                "{field} holds {} values, expected {expected}",
                values.len()
            ),
        ));
    }
    Ok(())
}

// ------------------------------------------------------------
// Loading
// ------------------------------------------------------------

/// Parse trace text produced by the upstream model.
pub fn parse_trace(text: &str, flags: TraceFlags) -> Result<SimulationTrace> {
    let mut cursor = LineCursor::new(text);
    let mut stage = ParseStage::Header;

    let mut header = None;
    let mut series = None;
    let mut extremums = None;
    let mut theoretical_alpha = None;
    let mut theoretical_extremums = None;

    while stage != ParseStage::Done {
        debug!(%stage, line = cursor.line_no + 1, "parsing trace block");
        match stage {
            ParseStage::Header => {
                let dt = cursor.scalar(stage, "dt")?;
                let pendulum_length = cursor.scalar(stage, "pendulum_length")?;
                let t_max = cursor.scalar(stage, "t_max")?;
                let raw_count = cursor.scalar(stage, "sample_count")?;
                if !raw_count.is_finite() || raw_count < 0.0 {
                    return Err(PlaybackError::malformed(
                        cursor.line_no,
                        stage,
                        format!("sample_count {raw_count} is not a valid count"),
                    ));
                }
                header = Some(TraceHeader {
                    dt,
                    pendulum_length,
                    t_max,
                    sample_count: raw_count.trunc() as usize,
                });
            }
            ParseStage::Primary => {
                let expected = header.map_or(0, |h| h.sample_count);
                let (time_line, time) = cursor.series(stage, "time")?;
                let (alpha_line, alpha) = cursor.series(stage, "alpha")?;
                if time.len() != alpha.len() {
                    return Err(PlaybackError::malformed(
                        alpha_line,
                        stage,
                        format!(
                            "alpha holds {} values but time holds {}",
                            alpha.len(),
                            time.len()
                        ),
                    ));
                }
                check_series_len(&time, expected, time_line, stage, "time")?;
                series = Some((time, alpha));
            }
            ParseStage::Extremum => {
                extremums = Some(cursor.points(stage, "extremum")?);
            }
            ParseStage::Theoretical => {
                let expected = header.map_or(0, |h| h.sample_count);
                let (line_no, values) = cursor.series(stage, "theoretical alpha")?;
                check_series_len(&values, expected, line_no, stage, "theoretical alpha")?;
                theoretical_alpha = Some(values);
            }
            ParseStage::TheoreticalExtremum => {
                theoretical_extremums = Some(cursor.points(stage, "theoretical extremum")?);
            }
            ParseStage::Done => {}
        }
        stage = stage.next(flags);
    }

    // Both are always produced by the first two stages.
    let (Some(header), Some((time, alpha))) = (header, series) else {
        return Err(PlaybackError::malformed(
            cursor.line_no,
            ParseStage::Primary,
            "trace ended before the angle series",
        ));
    };

    Ok(SimulationTrace {
        header,
        time,
        alpha,
        extremums,
        theoretical_alpha,
        theoretical_extremums,
    })
}

/// Read and parse a trace file. The whole file is read before parsing starts.
pub fn load_trace(path: &Path, flags: TraceFlags) -> Result<SimulationTrace> {
    let bytes = fs::read(path).map_err(|source| PlaybackError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        let stage = ParseStage::at_line(line, flags);
        PlaybackError::malformed(line, stage, "line is not valid UTF-8")
    })?;

    let trace = parse_trace(&text, flags)?;
    info!(
        path = %path.display(),
        samples = trace.sample_count(),
        dt = trace.header.dt,
        length = trace.header.pendulum_length,
        extremums = trace.extremums.is_some(),
        theoretical = trace.theoretical_alpha.is_some(),
        "trace loaded"
    );
    Ok(trace)
}

// ------------------------------------------------------------
// Writing
// ------------------------------------------------------------

fn write_series<W: Write>(out: &mut W, values: &[f64]) -> io::Result<()> {
    let mut first = true;
    for v in values {
        if !first {
            out.write_all(b" ")?;
        }
        write!(out, "{v}")?;
        first = false;
    }
    out.write_all(b"\n")
}

/// Write `trace` in the upstream line format.
///
/// Floats are printed in shortest round-trip form, so `parse_trace` with
/// `trace.flags()` yields the same values back.
pub fn write_trace<W: Write>(mut out: W, trace: &SimulationTrace) -> io::Result<()> {
    let h = &trace.header;
    writeln!(out, "{}", h.dt)?;
    writeln!(out, "{}", h.pendulum_length)?;
    writeln!(out, "{}", h.t_max)?;
    writeln!(out, "{}", h.sample_count)?;
    write_series(&mut out, &trace.time)?;
    write_series(&mut out, &trace.alpha)?;

    if let Some(ext) = &trace.extremums {
        write_series(&mut out, &ext.x)?;
        write_series(&mut out, &ext.y)?;
    }

    if let Some(theory) = &trace.theoretical_alpha {
        write_series(&mut out, theory)?;
        if trace.extremums.is_some() {
            let ext = trace.theoretical_extremums.as_ref().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "trace has extremums and theory but no theoretical extremums",
                )
            })?;
            write_series(&mut out, &ext.x)?;
            write_series(&mut out, &ext.y)?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "0.01\n1.5\n0.03\n3\n0 0.01 0.02\n1.0 1.1 1.2\n";

    fn all_flags() -> TraceFlags {
        TraceFlags {
            calculate_extremums: true,
            calculate_theoretical: true,
        }
    }

    fn malformed_line(err: PlaybackError) -> (usize, ParseStage) {
        match err {
            PlaybackError::MalformedTrace { line, stage, .. } => (line, stage),
            other => panic!("expected MalformedTrace, got {other:?}"),
        }
    }

    #[test]
    fn parses_header_and_primary_series() {
        let trace = parse_trace(BASIC, TraceFlags::default()).unwrap();
        assert_eq!(trace.header.dt, 0.01);
        assert_eq!(trace.header.pendulum_length, 1.5);
        assert_eq!(trace.header.t_max, 0.03);
        assert_eq!(trace.sample_count(), 3);
        assert_eq!(trace.time, vec![0.0, 0.01, 0.02]);
        assert_eq!(trace.alpha, vec![1.0, 1.1, 1.2]);
        assert!(trace.extremums.is_none());
        assert!(trace.theoretical_alpha.is_none());
        assert!(trace.theoretical_extremums.is_none());
    }

    #[test]
    fn truncates_fractional_sample_count() {
        let text = "0.01\n1\n0.02\n2.9\n0  0.01\n3 4\n";
        let trace = parse_trace(text, TraceFlags::default()).unwrap();
        assert_eq!(trace.sample_count(), 2);
    }

    #[test]
    fn stage_machine_follows_flags() {
        let none = TraceFlags::default();
        assert_eq!(ParseStage::Header.next(none), ParseStage::Primary);
        assert_eq!(ParseStage::Primary.next(none), ParseStage::Done);

        let ext = TraceFlags {
            calculate_extremums: true,
            calculate_theoretical: false,
        };
        assert_eq!(ParseStage::Primary.next(ext), ParseStage::Extremum);
        assert_eq!(ParseStage::Extremum.next(ext), ParseStage::Done);

        let theory = TraceFlags {
            calculate_extremums: false,
            calculate_theoretical: true,
        };
        assert_eq!(ParseStage::Primary.next(theory), ParseStage::Theoretical);
        assert_eq!(ParseStage::Theoretical.next(theory), ParseStage::Done);

        let both = all_flags();
        assert_eq!(ParseStage::Extremum.next(both), ParseStage::Theoretical);
        assert_eq!(
            ParseStage::Theoretical.next(both),
            ParseStage::TheoreticalExtremum
        );
        assert_eq!(ParseStage::TheoreticalExtremum.next(both), ParseStage::Done);
        assert_eq!(ParseStage::Done.next(both), ParseStage::Done);
    }

    #[test]
    fn reads_every_optional_block_in_order() {
        let text = concat!(
            "0.5\n2\n1.5\n3\n",
            "0 0.5 1\n",
            "0.1 0.2 0.1\n",
            "0.5\n",
            "0.2\n",
            "0.1 0.25 0.1\n",
            "0.5 1\n",
            "0.25 0.1\n",
        );
        let trace = parse_trace(text, all_flags()).unwrap();
        let ext = trace.extremums.as_ref().unwrap();
        assert_eq!(ext.x, vec![0.5]);
        assert_eq!(ext.y, vec![0.2]);
        assert_eq!(trace.theoretical_alpha, Some(vec![0.1, 0.25, 0.1]));
        let theory_ext = trace.theoretical_extremums.as_ref().unwrap();
        assert_eq!(theory_ext.iter().collect::<Vec<_>>(), vec![(0.5, 0.25), (1.0, 0.1)]);
    }

    #[test]
    fn ignores_lines_the_flags_do_not_ask_for() {
        let text = format!("{BASIC}0.01\n1.1\n");
        let trace = parse_trace(&text, TraceFlags::default()).unwrap();
        assert!(trace.extremums.is_none());
        assert_eq!(trace.alpha.len(), 3);
    }

    #[test]
    fn missing_extremum_lines_are_rejected() {
        let flags = TraceFlags {
            calculate_extremums: true,
            calculate_theoretical: false,
        };
        let err = parse_trace(BASIC, flags).unwrap_err();
        assert_eq!(malformed_line(err), (7, ParseStage::Extremum));
    }

    #[test]
    fn missing_theoretical_extremum_lines_are_rejected() {
        let text = format!("{BASIC}\n\n1 1 1\n");
        let err = parse_trace(&text, all_flags()).unwrap_err();
        assert_eq!(malformed_line(err), (10, ParseStage::TheoreticalExtremum));
    }

    #[test]
    fn empty_extremum_lines_mean_no_extrema() {
        let text = format!("{BASIC}\n\n");
        let flags = TraceFlags {
            calculate_extremums: true,
            calculate_theoretical: false,
        };
        let trace = parse_trace(&text, flags).unwrap();
        assert!(trace.extremums.unwrap().is_empty());
    }

    #[test]
    fn rejects_mismatched_series_lengths() {
        let text = "0.01\n1\n0.03\n3\n0 0.01 0.02\n1.0 1.1\n";
        let err = parse_trace(text, TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (6, ParseStage::Primary));
    }

    #[test]
    fn rejects_series_shorter_than_sample_count() {
        let text = "0.01\n1\n0.03\n4\n0 0.01 0.02\n1.0 1.1 1.2\n";
        let err = parse_trace(text, TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (5, ParseStage::Primary));
    }

    #[test]
    fn rejects_short_theoretical_series() {
        let text = format!("{BASIC}1 1\n");
        let flags = TraceFlags {
            calculate_extremums: false,
            calculate_theoretical: true,
        };
        let err = parse_trace(&text, flags).unwrap_err();
        assert_eq!(malformed_line(err), (7, ParseStage::Theoretical));
    }

    #[test]
    fn rejects_uneven_extremum_pairs() {
        let text = format!("{BASIC}0.1 0.2\n1.0\n");
        let flags = TraceFlags {
            calculate_extremums: true,
            calculate_theoretical: false,
        };
        let err = parse_trace(&text, flags).unwrap_err();
        assert_eq!(malformed_line(err), (8, ParseStage::Extremum));
    }

    #[test]
    fn rejects_bad_header_lines() {
        let err = parse_trace("0.01 0.02\n1\n1\n1\n0\n0\n", TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (1, ParseStage::Header));

        let err = parse_trace("0.01\nabc\n1\n1\n0\n0\n", TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (2, ParseStage::Header));

        let err = parse_trace("0.01\n1\n1\n-1\n0\n0\n", TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (4, ParseStage::Header));

        let err = parse_trace("0.01\n1\n", TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (3, ParseStage::Header));
    }

    #[test]
    fn rejects_non_numeric_samples() {
        let text = "0.01\n1\n0.03\n3\n0 0.01 0.02\n1.0 x 1.2\n";
        let err = parse_trace(text, TraceFlags::default()).unwrap_err();
        assert!(err.to_string().contains("'x' is not a number"));
    }

    #[test]
    fn line_numbers_map_to_their_stage() {
        let flags = all_flags();
        assert_eq!(ParseStage::at_line(1, flags), ParseStage::Header);
        assert_eq!(ParseStage::at_line(4, flags), ParseStage::Header);
        assert_eq!(ParseStage::at_line(6, flags), ParseStage::Primary);
        assert_eq!(ParseStage::at_line(7, flags), ParseStage::Extremum);
        assert_eq!(ParseStage::at_line(9, flags), ParseStage::Theoretical);
        assert_eq!(ParseStage::at_line(11, flags), ParseStage::TheoreticalExtremum);
        assert_eq!(ParseStage::at_line(12, flags), ParseStage::Done);

        let theory_only = TraceFlags {
            calculate_extremums: false,
            calculate_theoretical: true,
        };
        assert_eq!(ParseStage::at_line(7, theory_only), ParseStage::Theoretical);
        assert_eq!(ParseStage::at_line(7, TraceFlags::default()), ParseStage::Done);
    }

    #[test]
    fn invalid_utf8_is_malformed_at_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");
        fs::write(&path, b"0.01\n1\n1\n1\n0\n\xff\n").unwrap();

        let err = load_trace(&path, TraceFlags::default()).unwrap_err();
        assert_eq!(malformed_line(err), (6, ParseStage::Primary));
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_trace(&dir.path().join("missing.txt"), TraceFlags::default()).unwrap_err();
        assert!(matches!(err, PlaybackError::Io { .. }));
    }

    #[test]
    fn written_trace_loads_back_identically() {
        let trace = SimulationTrace {
            header: TraceHeader {
                dt: 0.1,
                pendulum_length: 0.75,
                t_max: 0.3,
                sample_count: 3,
            },
            time: vec![0.0, 0.1, 0.2],
            alpha: vec![1.0471975511965976, 1.2, 1e-7],
            extremums: Some(ExtremumPoints {
                x: vec![0.1],
                y: vec![1.2],
            }),
            theoretical_alpha: Some(vec![1.0471975511965976, 1.19, -0.3333333333333333]),
            theoretical_extremums: Some(ExtremumPoints::default()),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.txt");
        write_trace(fs::File::create(&path).unwrap(), &trace).unwrap();

        let loaded = load_trace(&path, trace.flags()).unwrap();
        assert_eq!(loaded, trace);
    }

    #[test]
    fn writer_refuses_incomplete_optional_blocks() {
        let trace = SimulationTrace {
            header: TraceHeader {
                dt: 0.1,
                pendulum_length: 1.0,
                t_max: 0.1,
                sample_count: 1,
            },
            time: vec![0.0],
            alpha: vec![0.0],
            extremums: Some(ExtremumPoints::default()),
            theoretical_alpha: Some(vec![0.0]),
            theoretical_extremums: None,
        };
        let err = write_trace(Vec::new(), &trace).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
