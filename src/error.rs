// ------------------------------------------------------------
// Library error type
// ------------------------------------------------------------

use std::path::PathBuf;

use thiserror::Error;

use crate::trace::ParseStage;

/// Errors raised while loading a trace or stepping the playback engine.
///
/// None of these are transient, so nothing is retried.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A trace or configuration file could not be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The trace file does not match the expected line protocol.
    #[error("malformed trace at line {line} ({stage}): {reason}")]
    MalformedTrace {
        line: usize,
        stage: ParseStage,
        reason: String,
    },

    /// The configuration requests nothing renderable or holds invalid values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A frame addressed a sample the trace cannot supply.
    #[error(
        "frame {frame} addresses sample {sample_index}, but the trace holds {sample_count} samples"
    )]
    FrameOutOfRange {
        frame: u64,
        sample_index: usize,
        sample_count: usize,
    },
}

impl PlaybackError {
    pub(crate) fn malformed(line: usize, stage: ParseStage, reason: impl Into<String>) -> Self {
        Self::MalformedTrace {
            line,
            stage,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = PlaybackError> = std::result::Result<T, E>;
