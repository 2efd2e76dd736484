//! Roster scoping and per-subject standings.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::attempt::{SkillStanding, select_best_counted};
use crate::record::{Skill, SkillAttempt, Subject, VenueSnapshot};
use crate::types::{GroupId, SkillId, SubjectId};

/// Narrows a venue snapshot to a group and/or a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub group_id: Option<GroupId>,
    /// Skill id, or skill name compared case-insensitively.
    pub course_filter: Option<String>,
}

impl Scope {
    pub fn group(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            course_filter: None,
        }
    }

    #[must_use]
    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course_filter = Some(course.into());
        self
    }

    pub fn includes_subject(&self, subject: &Subject) -> bool {
        self.group_id
            .as_ref()
            .is_none_or(|group| subject.group_id.as_ref() == Some(group))
    }

    pub fn includes_skill(&self, skill: &Skill) -> bool {
        self.course_filter
            .as_deref()
            .is_none_or(|filter| skill.matches(filter))
    }
}

/// One subject's standing for one skill, with the roster fields views need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectStanding<'a> {
    pub subject: &'a Subject,
    pub skill: &'a Skill,
    pub standing: SkillStanding,
}

/// All standings for a scope plus the number of rejected attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingSet<'a> {
    pub rows: Vec<SubjectStanding<'a>>,
    pub skipped: usize,
}

impl StandingSet<'_> {
    /// Number of distinct subjects that have at least one row.
    pub fn subject_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| &row.subject.subject_id)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Builds one standing per (subject in scope) × (skill in scope).
///
/// Pairs without attempts become `Not Attempted`. Rows come out in roster
/// order, then catalogue order. Attempts for subjects or skills outside the
/// snapshot's roster and catalogue are ignored; only attempts that belong to
/// an in-scope pair and fail validation count as skipped. Attempts storage
/// could not decode are added to the skip count whatever the scope.
pub fn standings<'a>(snapshot: &'a VenueSnapshot, scope: &Scope) -> StandingSet<'a> {
    let subjects: Vec<&Subject> = snapshot
        .subjects
        .iter()
        .filter(|subject| scope.includes_subject(subject))
        .collect();
    let skills: Vec<&Skill> = snapshot
        .skills
        .iter()
        .filter(|skill| scope.includes_skill(skill))
        .collect();

    let mut by_pair: HashMap<(&SubjectId, &SkillId), Vec<&SkillAttempt>> = HashMap::new();
    for attempt in &snapshot.attempts {
        by_pair
            .entry((&attempt.subject_id, &attempt.skill_id))
            .or_default()
            .push(attempt);
    }

    let mut skipped = snapshot.skipped_attempts;
    let mut rows = Vec::with_capacity(subjects.len() * skills.len());
    for &subject in &subjects {
        for &skill in &skills {
            let attempts = by_pair
                .get(&(&subject.subject_id, &skill.skill_id))
                .map_or(&[][..], Vec::as_slice);
            let selection = select_best_counted(attempts.iter().copied());
            skipped += selection.skipped;
            rows.push(SubjectStanding {
                subject,
                skill,
                standing: selection.standing,
            });
        }
    }

    tracing::debug!(
        venue = %snapshot.venue.venue_id,
        subjects = subjects.len(),
        skills = skills.len(),
        skipped,
        "computed standings"
    );

    StandingSet { rows, skipped }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use crate::record::{AttendanceMark, Session, Venue};
    use crate::types::{AttemptId, SessionId, VenueId};

    use super::*;

    pub fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    pub fn subject(id: &str, name: &str, roll: &str, group: Option<&str>) -> Subject {
        Subject {
            subject_id: SubjectId::new(id).unwrap(),
            venue_id: VenueId::new("v1").unwrap(),
            name: name.to_string(),
            roll: roll.to_string(),
            group_id: group.map(|g| GroupId::new(g).unwrap()),
            email: None,
        }
    }

    pub fn skill(id: &str, name: &str) -> Skill {
        Skill {
            skill_id: SkillId::new(id).unwrap(),
            name: name.to_string(),
        }
    }

    pub fn attempt(subject: &str, skill: &str, number: u32, score: i64, status: &str) -> SkillAttempt {
        SkillAttempt {
            attempt_id: AttemptId::new(format!("{subject}-{skill}-{number}")).unwrap(),
            subject_id: SubjectId::new(subject).unwrap(),
            skill_id: SkillId::new(skill).unwrap(),
            attempt_number: number,
            score,
            attendance: "Present".to_string(),
            slot_date: Some(date()),
            start_time: Some("09:00".to_string()),
            end_time: Some("10:00".to_string()),
            raw_status: status.to_string(),
        }
    }

    pub fn session(id: &str, label: &str, start: &str, end: &str) -> Session {
        Session {
            session_id: SessionId::new(id).unwrap(),
            venue_id: VenueId::new("v1").unwrap(),
            date: date(),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            label: label.to_string(),
        }
    }

    pub fn mark(session: &str, subject: &str, state: &str) -> AttendanceMark {
        AttendanceMark {
            session_id: SessionId::new(session).unwrap(),
            subject_id: SubjectId::new(subject).unwrap(),
            state: state.to_string(),
        }
    }

    /// Four subjects across two groups, two skills and two sessions.
    ///
    /// | subject | group | rust-101            | sql-201        |
    /// |---------|-------|---------------------|----------------|
    /// | s1 Ana  | g1    | Cleared 76          | Not Cleared 40 |
    /// | s2 Ben  | g1    | Not Cleared 55      | (none)         |
    /// | s3 Cy   | g2    | (none)              | Ongoing 68     |
    /// | s4 Dee  | g2    | Cleared 90          | Cleared 81     |
    pub fn snapshot() -> VenueSnapshot {
        VenueSnapshot {
            venue: Venue {
                venue_id: VenueId::new("v1").unwrap(),
                name: "Lab 1".to_string(),
            },
            subjects: vec![
                subject("s1", "Ana Diaz", "21CS001", Some("g1")),
                subject("s2", "Ben Okafor", "21CS002", Some("g1")),
                subject("s3", "Cy Lin", "21CS003", Some("g2")),
                subject("s4", "Dee Park", "21CS004", Some("g2")),
            ],
            skills: vec![skill("rust-101", "Rust Basics"), skill("sql-201", "SQL Joins")],
            sessions: vec![
                session("fn", "Forenoon", "09:00", "12:30"),
                session("an", "Afternoon", "13:30", "16:30"),
            ],
            marks: vec![
                mark("fn", "s1", "Present"),
                mark("fn", "s2", "Absent"),
                mark("fn", "s3", "Late"),
                mark("an", "s1", "Present"),
                mark("an", "s4", "PS"),
            ],
            attempts: vec![
                attempt("s1", "rust-101", 1, 42, "Not Cleared"),
                attempt("s1", "rust-101", 2, 76, "Cleared"),
                attempt("s1", "sql-201", 1, 40, "Not Cleared"),
                attempt("s2", "rust-101", 1, 55, "Not Cleared"),
                attempt("s3", "sql-201", 1, 45, "Not Cleared"),
                attempt("s3", "sql-201", 2, 68, "Ongoing"),
                attempt("s4", "rust-101", 1, 90, "Cleared"),
                attempt("s4", "sql-201", 1, 81, "Cleared"),
            ],
            skipped_sessions: 0,
            skipped_attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::status::SkillStatus;

    fn status_of(set: &StandingSet<'_>, subject: &str, skill: &str) -> SkillStatus {
        set.rows
            .iter()
            .find(|r| r.subject.subject_id.as_str() == subject && r.skill.skill_id.as_str() == skill)
            .map(|r| r.standing.status)
            .expect("row should exist")
    }

    #[test]
    fn every_pair_gets_a_standing() {
        let snapshot = snapshot();
        let set = standings(&snapshot, &Scope::default());
        assert_eq!(set.rows.len(), 8);
        assert_eq!(set.subject_count(), 4);
        assert_eq!(status_of(&set, "s1", "rust-101"), SkillStatus::Cleared);
        assert_eq!(status_of(&set, "s2", "sql-201"), SkillStatus::NotAttempted);
        assert_eq!(status_of(&set, "s3", "sql-201"), SkillStatus::Ongoing);
    }

    #[test]
    fn group_scope_limits_subjects() {
        let snapshot = snapshot();
        let scope = Scope::group(GroupId::new("g2").unwrap());
        let set = standings(&snapshot, &scope);
        assert_eq!(set.rows.len(), 4);
        assert!(set.rows.iter().all(|r| r.subject.group_id.as_ref().unwrap().as_str() == "g2"));
    }

    #[test]
    fn course_filter_matches_id_or_name() {
        let snapshot = snapshot();
        let by_name = standings(&snapshot, &Scope::default().with_course("sql joins"));
        let by_id = standings(&snapshot, &Scope::default().with_course("sql-201"));
        assert_eq!(by_name.rows.len(), 4);
        assert_eq!(by_name, by_id);
    }

    #[test]
    fn attempts_outside_catalogue_are_ignored() {
        let mut snapshot = snapshot();
        snapshot.attempts.push(attempt("s2", "go-101", 1, 99, "Cleared"));
        snapshot.attempts.push(attempt("s2", "sql-201", 1, 50, "bogus"));
        let set = standings(&snapshot, &Scope::default());
        assert_eq!(set.rows.len(), 8);
        assert_eq!(set.skipped, 1);
        assert_eq!(status_of(&set, "s2", "sql-201"), SkillStatus::NotAttempted);
    }

    #[test]
    fn undecodable_attempts_count_as_skipped() {
        let mut snapshot = snapshot();
        snapshot.skipped_attempts = 2;
        let set = standings(&snapshot, &Scope::group(GroupId::new("g1").unwrap()));
        assert_eq!(set.skipped, 2);
        assert_eq!(set.rows.len(), 4);
    }
}
