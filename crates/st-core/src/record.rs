//! Raw records as handed over by the storage collaborator.
//!
//! Status, attendance and clock-time fields are kept as the strings that were
//! captured. The resolvers turn them into typed values and reject bad data
//! one record at a time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{AttemptId, GroupId, SessionId, SkillId, SubjectId, VenueId};

/// A physical or logical grouping of subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub venue_id: VenueId,
    pub name: String,
}

/// A student enrolled at a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: SubjectId,
    pub venue_id: VenueId,
    pub name: String,
    /// Roll number shown next to the name.
    pub roll: String,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An assessable course unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub skill_id: SkillId,
    pub name: String,
}

impl Skill {
    /// Matches a course filter against the id exactly or the name ignoring case.
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.trim();
        self.skill_id.as_str() == filter || self.name.eq_ignore_ascii_case(filter)
    }
}

/// A scheduled attendance block at a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub venue_id: VenueId,
    pub date: NaiveDate,
    /// Local clock time, e.g. `09:00`.
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub label: String,
}

/// One subject's recorded outcome for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub state: String,
}

impl AttendanceMark {
    /// Identifier used when logging a rejected mark.
    pub fn record_id(&self) -> String {
        format!("{}/{}", self.session_id, self.subject_id)
    }
}

/// One sitting of a skill assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillAttempt {
    pub attempt_id: AttemptId,
    pub subject_id: SubjectId,
    pub skill_id: SkillId,
    /// 1-based, increasing per (subject, skill).
    pub attempt_number: u32,
    pub score: i64,
    /// Attendance at the proctoring slot (`Present` or `Absent`).
    pub attendance: String,
    #[serde(default)]
    pub slot_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Status as recorded at capture time.
    pub raw_status: String,
}

/// Everything the engine needs to answer queries about one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueSnapshot {
    pub venue: Venue,
    pub subjects: Vec<Subject>,
    /// Skills offered at the venue.
    pub skills: Vec<Skill>,
    pub sessions: Vec<Session>,
    pub marks: Vec<AttendanceMark>,
    pub attempts: Vec<SkillAttempt>,
    /// Sessions storage could not decode. They are absent from `sessions`.
    #[serde(default)]
    pub skipped_sessions: usize,
    /// Attempts storage could not decode. They are absent from `attempts`.
    #[serde(default)]
    pub skipped_attempts: usize,
}
