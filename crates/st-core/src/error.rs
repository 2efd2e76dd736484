//! Engine error taxonomy.
//!
//! [`RecordError`] describes a single malformed record. Aggregations never
//! return it: the record is logged, skipped and counted. [`EngineError`] is
//! for structural failures that stop a computation.

use thiserror::Error;

use crate::clock::ClockError;
use crate::status::UnknownStatus;

/// A single record failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record carries a status string outside the known set.
    #[error("invalid status on {record_id}: {source}")]
    InvalidStatus {
        record_id: String,
        #[source]
        source: UnknownStatus,
    },
    /// An attempt score outside 0..=100.
    #[error("invalid score on {record_id}: {score}")]
    InvalidScore { record_id: String, score: i64 },
    /// A missing or unparseable clock time, or an empty window.
    #[error("invalid time on {record_id}: {value}")]
    InvalidTime { record_id: String, value: String },
    /// An attendance value outside the known set.
    #[error("invalid attendance on {record_id}: {source}")]
    InvalidAttendance {
        record_id: String,
        #[source]
        source: UnknownStatus,
    },
}

/// Structural failures that propagate to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// "Now" could not be obtained.
    #[error(transparent)]
    Clock(#[from] ClockError),
    /// No session with this id or label exists for the venue on the date.
    #[error("no session {session} for venue {venue_id} on {date}")]
    UnknownSession {
        venue_id: String,
        session: String,
        date: chrono::NaiveDate,
    },
}
