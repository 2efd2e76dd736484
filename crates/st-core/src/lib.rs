//! Core domain logic for skill and attendance standings.
//!
//! This crate turns raw timestamped records into derived statuses and rollups:
//! - Session windows: whether today's session has started, is running or closed
//! - Attempts: validated attempt status and the sticky best-attempt rule
//! - Aggregation: attendance and skill tallies that merge with `+`
//! - Queries: search, filter, stable sort and pagination over view rows
//!
//! Nothing here performs I/O. Records come in as a [`VenueSnapshot`] and the
//! current time comes from an injected [`Clock`].

pub mod aggregate;
pub mod attempt;
pub mod clock;
mod error;
pub mod query;
pub mod record;
pub mod scope;
pub mod status;
pub mod types;
pub mod views;
pub mod window;

pub use aggregate::{AttendanceTally, SkillTally};
pub use attempt::{SkillStanding, select_best};
pub use clock::{Clock, ClockError, FixedClock, SystemClock};
pub use error::{EngineError, RecordError};
pub use query::{Page, PageLimits, Pagination, QueryParams, QueryRow, SortKey, SortOrder};
pub use record::{AttendanceMark, Session, Skill, SkillAttempt, Subject, Venue, VenueSnapshot};
pub use scope::Scope;
pub use status::{
    AttemptStatus, AttendanceState, SessionState, SkillStatus, SlotAttendance, UnknownStatus,
};
pub use types::{AttemptId, GroupId, SessionId, SkillId, SubjectId, ValidationError, VenueId};
