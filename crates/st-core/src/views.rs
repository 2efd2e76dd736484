//! Query operations consumed by the venue, course and student screens.
//!
//! Every operation is a pure function of a [`VenueSnapshot`] plus, for the
//! attendance views, a [`Clock`]. Rows are flat so they can be exported as-is.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{
    AttendanceTally, SkillTally, fold_attendance, par_fold_attendance, par_fold_skills,
};
use crate::clock::Clock;
use crate::error::EngineError;
use crate::query::{Page, PageLimits, QueryParams, QueryRow, apply};
use crate::record::{AttendanceMark, Session, VenueSnapshot};
use crate::scope::{Scope, standings};
use crate::status::{AttendanceState, SessionState, SkillStatus, SlotAttendance};
use crate::types::{GroupId, SessionId, SubjectId, VenueId};
use crate::window::{parse_clock_time, resolve_window};

// ========== Skill Summary ==========

/// Venue-level skill rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub venue_id: VenueId,
    /// Distinct subjects in scope. This is a headcount, not the denominator
    /// of the status buckets: with several courses in scope each subject
    /// contributes one standing per course.
    pub total_students: usize,
    /// (subject, skill) standings folded. The four status buckets always sum
    /// to this, and `completion_rate` is `cleared / total_standings`. Equals
    /// `total_students` when the scope names a single course.
    pub total_standings: usize,
    pub cleared: usize,
    pub not_cleared: usize,
    pub ongoing: usize,
    pub not_attempted: usize,
    pub average_best_score: f64,
    pub completion_rate: f64,
    pub skipped_count: usize,
}

/// Rolls every standing in `scope` into one summary.
pub fn summary(snapshot: &VenueSnapshot, scope: &Scope) -> Summary {
    let set = standings(snapshot, scope);
    let tally = par_fold_skills(set.rows.iter().map(|row| &row.standing).collect::<Vec<_>>());
    let total_students = snapshot
        .subjects
        .iter()
        .filter(|subject| scope.includes_subject(subject))
        .count();

    Summary {
        venue_id: snapshot.venue.venue_id.clone(),
        total_students,
        total_standings: tally.total_subjects,
        cleared: tally.cleared,
        not_cleared: tally.not_cleared,
        ongoing: tally.ongoing,
        not_attempted: tally.not_attempted,
        average_best_score: tally.average_best_score(),
        completion_rate: tally.completion_rate(),
        skipped_count: set.skipped,
    }
}

// ========== Course Breakdown ==========

/// Rollup for one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBreakdown {
    pub course_id: String,
    pub course_name: String,
    pub total_students: usize,
    pub total_attempted: usize,
    pub cleared_count: usize,
    pub not_cleared_count: usize,
    pub ongoing_count: usize,
    pub not_attempted_count: usize,
    pub avg_best_score: f64,
    pub completion_rate: f64,
}

impl CourseBreakdown {
    fn from_tally(course_id: String, course_name: String, tally: &SkillTally) -> Self {
        Self {
            course_id,
            course_name,
            total_students: tally.total_subjects,
            total_attempted: tally.attempted(),
            cleared_count: tally.cleared,
            not_cleared_count: tally.not_cleared,
            ongoing_count: tally.ongoing,
            not_attempted_count: tally.not_attempted,
            avg_best_score: tally.average_best_score(),
            completion_rate: tally.completion_rate(),
        }
    }
}

/// Per-course rollups in catalogue order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseReport {
    pub courses: Vec<CourseBreakdown>,
    pub skipped_count: usize,
}

/// Breaks the venue's standings down by course.
pub fn course_breakdown(snapshot: &VenueSnapshot, group_id: Option<&GroupId>) -> CourseReport {
    let scope = Scope {
        group_id: group_id.cloned(),
        course_filter: None,
    };
    let set = standings(snapshot, &scope);

    let mut tallies: HashMap<&str, SkillTally> = HashMap::new();
    for row in &set.rows {
        tallies
            .entry(row.skill.skill_id.as_str())
            .or_default()
            .record(&row.standing);
    }

    let courses = snapshot
        .skills
        .iter()
        .map(|skill| {
            let tally = tallies
                .get(skill.skill_id.as_str())
                .copied()
                .unwrap_or_default();
            CourseBreakdown::from_tally(skill.skill_id.to_string(), skill.name.clone(), &tally)
        })
        .collect();

    CourseReport {
        courses,
        skipped_count: set.skipped,
    }
}

// ========== Student Skill Status ==========

/// One (student, course) row, flat and export-ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSkillRow {
    pub student_id: String,
    pub name: String,
    pub roll: String,
    pub email: Option<String>,
    pub group_id: Option<String>,
    pub course_id: String,
    pub course_name: String,
    pub status: SkillStatus,
    pub best_score: Option<u8>,
    pub best_attempt_id: Option<String>,
    pub attempt_count: usize,
    /// Slot date of the best-score attempt.
    pub slot_date: Option<NaiveDate>,
    /// Slot attendance of the best-score attempt.
    pub attendance: Option<SlotAttendance>,
}

impl QueryRow for StudentSkillRow {
    type Status = SkillStatus;

    fn name(&self) -> &str {
        &self.name
    }

    fn roll(&self) -> &str {
        &self.roll
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.roll.as_str(), self.student_id.as_str()];
        if let Some(email) = &self.email {
            fields.push(email);
        }
        fields
    }

    fn status(&self) -> SkillStatus {
        self.status
    }

    fn course(&self) -> Option<&str> {
        Some(&self.course_name)
    }

    fn score(&self) -> Option<u8> {
        self.best_score
    }

    fn date(&self) -> Option<NaiveDate> {
        self.slot_date
    }
}

/// A page of student rows plus the number of rejected attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSkillStatus {
    #[serde(flatten)]
    pub page: Page<StudentSkillRow>,
    pub skipped_count: usize,
}

/// Builds all student rows in scope, before any query shaping.
pub fn student_skill_rows(snapshot: &VenueSnapshot, scope: &Scope) -> (Vec<StudentSkillRow>, usize) {
    let set = standings(snapshot, scope);
    let rows = set
        .rows
        .iter()
        .map(|row| StudentSkillRow {
            student_id: row.subject.subject_id.to_string(),
            name: row.subject.name.clone(),
            roll: row.subject.roll.clone(),
            email: row.subject.email.clone(),
            group_id: row.subject.group_id.as_ref().map(ToString::to_string),
            course_id: row.skill.skill_id.to_string(),
            course_name: row.skill.name.clone(),
            status: row.standing.status,
            best_score: row.standing.best_score,
            best_attempt_id: row.standing.best_attempt_id.as_ref().map(ToString::to_string),
            attempt_count: row.standing.attempt_count,
            slot_date: row.standing.best_slot_date,
            attendance: row.standing.best_attendance,
        })
        .collect();
    (rows, set.skipped)
}

/// Student rows in scope, searched, filtered, sorted and paged.
pub fn student_skill_status(
    snapshot: &VenueSnapshot,
    scope: &Scope,
    params: &QueryParams<SkillStatus>,
    limits: PageLimits,
) -> StudentSkillStatus {
    let (rows, skipped_count) = student_skill_rows(snapshot, scope);
    StudentSkillStatus {
        page: apply(&rows, params, limits),
        skipped_count,
    }
}

// ========== Attendance ==========

/// Attendance counts in wire form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub ps: usize,
    pub unmarked: usize,
    pub attendance_rate: f64,
}

impl From<&AttendanceTally> for AttendanceSummary {
    fn from(tally: &AttendanceTally) -> Self {
        Self {
            total: tally.total(),
            present: tally.present,
            absent: tally.absent,
            late: tally.late,
            ps: tally.permission_slip,
            unmarked: tally.unmarked,
            attendance_rate: tally.attendance_rate(),
        }
    }
}

/// One student's attendance in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub student_id: String,
    pub name: String,
    pub roll: String,
    pub group_id: Option<String>,
    /// `None` when unmarked or the mark was rejected.
    pub status: Option<AttendanceState>,
    /// A mark exists but its state did not parse.
    pub mark_rejected: bool,
    pub session_state: SessionState,
}

/// Attendance for one session on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetail {
    pub venue_id: VenueId,
    pub date: NaiveDate,
    pub session_id: SessionId,
    pub session_label: String,
    pub session_state: SessionState,
    pub summary: AttendanceSummary,
    pub students: Vec<AttendanceRow>,
    pub skipped_count: usize,
}

/// Finds a session on `date` by id, or by label ignoring case.
fn find_session<'a>(
    snapshot: &'a VenueSnapshot,
    date: NaiveDate,
    session: &str,
) -> Result<&'a Session, EngineError> {
    let wanted = session.trim();
    snapshot
        .sessions
        .iter()
        .filter(|s| s.date == date)
        .find(|s| s.session_id.as_str() == wanted || s.label.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| EngineError::UnknownSession {
            venue_id: snapshot.venue.venue_id.to_string(),
            session: wanted.to_string(),
            date,
        })
}

/// Marks for one session keyed by subject. Invalid marks map to `Err`.
fn marks_by_subject<'a>(
    marks: &'a [AttendanceMark],
    session_id: &SessionId,
) -> HashMap<&'a SubjectId, Result<AttendanceState, ()>> {
    marks
        .iter()
        .filter(|mark| &mark.session_id == session_id)
        .map(|mark| (&mark.subject_id, mark.state.parse::<AttendanceState>().map_err(drop)))
        .collect()
}

/// Attendance roster for one session.
///
/// Only subjects on the roster (and in `group_id`, if given) are listed and
/// counted. Subjects without a mark count as unmarked, not absent.
pub fn attendance_detail<C: Clock>(
    snapshot: &VenueSnapshot,
    date: NaiveDate,
    session: &str,
    group_id: Option<&GroupId>,
    clock: &C,
) -> Result<AttendanceDetail, EngineError> {
    let now = clock.now()?;
    let session = find_session(snapshot, date, session)?;
    let session_state = resolve_window(session, date, now);

    let scope = Scope {
        group_id: group_id.cloned(),
        course_filter: None,
    };
    let roster: Vec<_> = snapshot
        .subjects
        .iter()
        .filter(|subject| scope.includes_subject(subject))
        .collect();

    let in_scope_marks: Vec<&AttendanceMark> = snapshot
        .marks
        .iter()
        .filter(|mark| mark.session_id == session.session_id)
        .filter(|mark| roster.iter().any(|s| s.subject_id == mark.subject_id))
        .collect();
    let mut tally = fold_attendance(in_scope_marks.iter().copied());

    let states = marks_by_subject(&snapshot.marks, &session.session_id);
    let students: Vec<AttendanceRow> = roster
        .iter()
        .map(|subject| {
            let mark = states.get(&subject.subject_id).copied();
            AttendanceRow {
                student_id: subject.subject_id.to_string(),
                name: subject.name.clone(),
                roll: subject.roll.clone(),
                group_id: subject.group_id.as_ref().map(ToString::to_string),
                status: mark.and_then(Result::ok),
                mark_rejected: matches!(mark, Some(Err(()))),
                session_state,
            }
        })
        .collect();
    tally.unmarked = roster.len().saturating_sub(in_scope_marks.len());

    tracing::debug!(
        venue = %snapshot.venue.venue_id,
        session = %session.session_id,
        %date,
        state = %session_state,
        marked = tally.total(),
        "computed attendance detail"
    );

    Ok(AttendanceDetail {
        venue_id: snapshot.venue.venue_id.clone(),
        date,
        session_id: session.session_id.clone(),
        session_label: session.label.clone(),
        session_state,
        summary: AttendanceSummary::from(&tally),
        students,
        skipped_count: tally.skipped,
    })
}

/// One session on a date with its state and attendance counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub session_id: SessionId,
    pub label: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub session_state: SessionState,
    pub summary: AttendanceSummary,
    pub skipped_count: usize,
}

/// Lists the venue's sessions on `date` in start-time order.
///
/// Sessions whose start time is missing or unparseable come last.
pub fn session_overview<C: Clock>(
    snapshot: &VenueSnapshot,
    date: NaiveDate,
    clock: &C,
) -> Result<Vec<SessionOverview>, EngineError> {
    let now = clock.now()?;

    let mut sessions: Vec<&Session> = snapshot.sessions.iter().filter(|s| s.date == date).collect();
    sessions.sort_by_key(|s| {
        let start = s.start_time.as_deref().and_then(parse_clock_time);
        (start.is_none(), start)
    });

    let overview = sessions
        .into_iter()
        .map(|session| {
            let marks: Vec<&AttendanceMark> = snapshot
                .marks
                .iter()
                .filter(|mark| mark.session_id == session.session_id)
                .filter(|mark| snapshot.subjects.iter().any(|s| s.subject_id == mark.subject_id))
                .collect();
            let mut tally = par_fold_attendance(&marks);
            let counted = tally.total() + tally.skipped;
            tally.unmarked = snapshot.subjects.len().saturating_sub(counted);

            SessionOverview {
                session_id: session.session_id.clone(),
                label: session.label.clone(),
                start_time: session.start_time.clone(),
                end_time: session.end_time.clone(),
                session_state: resolve_window(session, date, now),
                summary: AttendanceSummary::from(&tally),
                skipped_count: tally.skipped,
            }
        })
        .collect();

    Ok(overview)
}
