//! Attempt status resolution and best-attempt selection.
//!
//! Two rules decide a subject's standing for a skill, and they deliberately
//! differ:
//!
//! - **Status**: clearing is sticky. Any cleared attempt makes the skill
//!   `Cleared`, whatever happened on later re-attempts.
//! - **Best score**: the maximum score over every attempt, cleared or not.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::RecordError;
use crate::record::SkillAttempt;
use crate::status::{AttemptStatus, SkillStatus, SlotAttendance};
use crate::types::AttemptId;

/// Highest score an attempt can carry.
pub const MAX_SCORE: u8 = 100;

/// An attempt whose status and score passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAttempt<'a> {
    pub attempt: &'a SkillAttempt,
    pub status: AttemptStatus,
    pub score: u8,
    pub attendance: SlotAttendance,
}

/// Parses the recorded status of an attempt.
pub fn resolve_attempt(attempt: &SkillAttempt) -> Result<AttemptStatus, RecordError> {
    attempt
        .raw_status
        .parse()
        .map_err(|source| RecordError::InvalidStatus {
            record_id: attempt.attempt_id.to_string(),
            source,
        })
}

/// Validates the score of an attempt.
pub fn attempt_score(attempt: &SkillAttempt) -> Result<u8, RecordError> {
    u8::try_from(attempt.score)
        .ok()
        .filter(|score| *score <= MAX_SCORE)
        .ok_or_else(|| RecordError::InvalidScore {
            record_id: attempt.attempt_id.to_string(),
            score: attempt.score,
        })
}

/// Parses the proctoring-slot attendance of an attempt.
///
/// Only `Present` and `Absent` are accepted; session-only states such as
/// `Late` are rejected.
pub fn attempt_attendance(attempt: &SkillAttempt) -> Result<SlotAttendance, RecordError> {
    attempt
        .attendance
        .parse()
        .map_err(|source| RecordError::InvalidAttendance {
            record_id: attempt.attempt_id.to_string(),
            source,
        })
}

/// Classifies an attempt and validates its score and slot attendance.
pub fn resolve(attempt: &SkillAttempt) -> Result<ResolvedAttempt<'_>, RecordError> {
    Ok(ResolvedAttempt {
        attempt,
        status: resolve_attempt(attempt)?,
        score: attempt_score(attempt)?,
        attendance: attempt_attendance(attempt)?,
    })
}

/// A subject's derived standing for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStanding {
    pub status: SkillStatus,
    /// Maximum score over all valid attempts.
    pub best_score: Option<u8>,
    /// The attempt that produced `best_score`.
    pub best_attempt_id: Option<AttemptId>,
    /// The canonical clearing attempt, when the skill is cleared.
    pub cleared_attempt_id: Option<AttemptId>,
    /// Slot date of the best-score attempt.
    pub best_slot_date: Option<NaiveDate>,
    /// Slot attendance of the best-score attempt.
    pub best_attendance: Option<SlotAttendance>,
    pub attempt_count: usize,
}

impl SkillStanding {
    /// Standing for a subject with no attempts.
    pub const fn not_attempted() -> Self {
        Self {
            status: SkillStatus::NotAttempted,
            best_score: None,
            best_attempt_id: None,
            cleared_attempt_id: None,
            best_slot_date: None,
            best_attendance: None,
            attempt_count: 0,
        }
    }
}

/// Result of best-attempt selection including rejected records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub standing: SkillStanding,
    /// Attempts excluded because they failed validation.
    pub skipped: usize,
}

/// Higher score wins, then the earlier attempt number.
fn rank(a: &ResolvedAttempt<'_>, b: &ResolvedAttempt<'_>) -> Ordering {
    a.score
        .cmp(&b.score)
        .then_with(|| b.attempt.attempt_number.cmp(&a.attempt.attempt_number))
}

/// Picks the representative attempt for one (subject, skill) pair.
///
/// Invalid attempts are logged and left out; see [`select_best_counted`] for
/// the skip count.
pub fn select_best<'a, I>(attempts: I) -> SkillStanding
where
    I: IntoIterator<Item = &'a SkillAttempt>,
{
    select_best_counted(attempts).standing
}

/// [`select_best`], also reporting how many attempts were rejected.
pub fn select_best_counted<'a, I>(attempts: I) -> Selection
where
    I: IntoIterator<Item = &'a SkillAttempt>,
{
    let mut skipped = 0;
    let resolved: Vec<ResolvedAttempt<'a>> = attempts
        .into_iter()
        .filter_map(|attempt| match resolve(attempt) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                tracing::warn!(%err, "skipping attempt");
                skipped += 1;
                None
            }
        })
        .collect();

    let Some(best) = resolved.iter().copied().max_by(rank) else {
        return Selection {
            standing: SkillStanding::not_attempted(),
            skipped,
        };
    };

    let cleared = resolved
        .iter()
        .copied()
        .filter(|r| r.status == AttemptStatus::Cleared)
        .max_by(rank);

    let status = if cleared.is_some() {
        SkillStatus::Cleared
    } else if resolved.iter().any(|r| r.status == AttemptStatus::Ongoing) {
        SkillStatus::Ongoing
    } else {
        SkillStatus::NotCleared
    };

    Selection {
        standing: SkillStanding {
            status,
            best_score: Some(best.score),
            best_attempt_id: Some(best.attempt.attempt_id.clone()),
            cleared_attempt_id: cleared.map(|r| r.attempt.attempt_id.clone()),
            best_slot_date: best.attempt.slot_date,
            best_attendance: Some(best.attendance),
            attempt_count: resolved.len(),
        },
        skipped,
    }
}
