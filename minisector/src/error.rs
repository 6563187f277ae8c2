use thiserror::Error;

use crate::competitor::{Competitor, Event};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinisectorError {
    #[error("trace for {0} has no samples")]
    EmptyTrace(Competitor),
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
    #[error("invalid segment count {0}: expected at least 1")]
    InvalidSegmentCount(i64),
    #[error("segment count {requested} outside {min}..={max} (step {step})")]
    SegmentCountOutOfRange {
        requested: i64,
        min: usize,
        max: usize,
        step: usize,
    },
    #[error("unknown competitor '{0}'")]
    UnknownCompetitor(String),
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("no trace available for {competitor} at {event}: {reason}")]
    TraceUnavailable {
        event: Event,
        competitor: Competitor,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = MinisectorError> = std::result::Result<T, E>;
