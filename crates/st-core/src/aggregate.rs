//! Rollups of attendance marks and skill standings.
//!
//! Both tallies are plain counters combined with `+`, so a scope can be folded
//! in shards (one venue, one group, one rayon split) and the partial tallies
//! merged afterwards without changing the result. Rates are derived from the
//! counters on demand and never stored.

use std::borrow::Borrow;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::Serialize;

use crate::attempt::SkillStanding;
use crate::record::AttendanceMark;
use crate::status::{AttendanceState, SkillStatus};

/// Divides, returning 0 for an empty denominator.
#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ========== Attendance ==========

/// Counts of attendance outcomes for a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub permission_slip: usize,
    /// Subjects in scope without a mark. Excluded from `total`.
    pub unmarked: usize,
    /// Marks rejected because their state did not parse.
    pub skipped: usize,
}

impl AttendanceTally {
    pub fn record(&mut self, state: AttendanceState) {
        match state {
            AttendanceState::Present => self.present += 1,
            AttendanceState::Absent => self.absent += 1,
            AttendanceState::Late => self.late += 1,
            AttendanceState::PermissionSlip => self.permission_slip += 1,
        }
    }

    /// Parses and records one mark, counting it as skipped when invalid.
    pub fn record_mark(&mut self, mark: &AttendanceMark) {
        match mark.state.parse::<AttendanceState>() {
            Ok(state) => self.record(state),
            Err(err) => {
                tracing::warn!(record = %mark.record_id(), %err, "skipping attendance mark");
                self.skipped += 1;
            }
        }
    }

    /// Marked records only.
    pub const fn total(&self) -> usize {
        self.present + self.absent + self.late + self.permission_slip
    }

    /// `present / total`, 0 when nothing is marked.
    pub fn attendance_rate(&self) -> f64 {
        ratio(self.present as u64, self.total() as u64)
    }
}

impl Add for AttendanceTally {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for AttendanceTally {
    fn add_assign(&mut self, rhs: Self) {
        self.present += rhs.present;
        self.absent += rhs.absent;
        self.late += rhs.late;
        self.permission_slip += rhs.permission_slip;
        self.unmarked += rhs.unmarked;
        self.skipped += rhs.skipped;
    }
}

impl Sum for AttendanceTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Folds marks sequentially.
pub fn fold_attendance<'a, I>(marks: I) -> AttendanceTally
where
    I: IntoIterator<Item = &'a AttendanceMark>,
{
    marks
        .into_iter()
        .fold(AttendanceTally::default(), |mut tally, mark| {
            tally.record_mark(mark);
            tally
        })
}

/// Folds marks across the rayon pool.
pub fn par_fold_attendance<M>(marks: &[M]) -> AttendanceTally
where
    M: Borrow<AttendanceMark> + Sync,
{
    marks
        .par_iter()
        .fold(AttendanceTally::default, |mut tally, mark| {
            tally.record_mark(mark.borrow());
            tally
        })
        .reduce(AttendanceTally::default, Add::add)
}

// ========== Skills ==========

/// Counts of skill standings for a scope.
///
/// `cleared + not_cleared + ongoing + not_attempted == total_subjects` always
/// holds. The score sum is kept alongside the scored count so that merged
/// tallies average exactly instead of averaging averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillTally {
    pub total_subjects: usize,
    pub cleared: usize,
    pub not_cleared: usize,
    pub ongoing: usize,
    pub not_attempted: usize,
    pub score_sum: u64,
    pub scored_subjects: usize,
}

impl SkillTally {
    pub fn record(&mut self, standing: &SkillStanding) {
        self.total_subjects += 1;
        match standing.status {
            SkillStatus::Cleared => self.cleared += 1,
            SkillStatus::NotCleared => self.not_cleared += 1,
            SkillStatus::Ongoing => self.ongoing += 1,
            SkillStatus::NotAttempted => self.not_attempted += 1,
        }
        if let Some(score) = standing.best_score {
            self.score_sum += u64::from(score);
            self.scored_subjects += 1;
        }
    }

    /// Subjects with at least one valid attempt.
    pub const fn attempted(&self) -> usize {
        self.total_subjects - self.not_attempted
    }

    /// Mean best score over subjects that have one; 0 when none do.
    pub fn average_best_score(&self) -> f64 {
        ratio(self.score_sum, self.scored_subjects as u64)
    }

    /// `cleared / total_subjects`; 0 for an empty scope.
    pub fn completion_rate(&self) -> f64 {
        ratio(self.cleared as u64, self.total_subjects as u64)
    }
}

impl Add for SkillTally {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for SkillTally {
    fn add_assign(&mut self, rhs: Self) {
        self.total_subjects += rhs.total_subjects;
        self.cleared += rhs.cleared;
        self.not_cleared += rhs.not_cleared;
        self.ongoing += rhs.ongoing;
        self.not_attempted += rhs.not_attempted;
        self.score_sum += rhs.score_sum;
        self.scored_subjects += rhs.scored_subjects;
    }
}

impl Sum for SkillTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Folds standings sequentially.
pub fn fold_skills<'a, I>(standings: I) -> SkillTally
where
    I: IntoIterator<Item = &'a SkillStanding>,
{
    standings
        .into_iter()
        .fold(SkillTally::default(), |mut tally, standing| {
            tally.record(standing);
            tally
        })
}

/// Folds standings across the rayon pool.
pub fn par_fold_skills<'a, I>(standings: I) -> SkillTally
where
    I: IntoParallelIterator<Item = &'a SkillStanding>,
{
    standings
        .into_par_iter()
        .fold(SkillTally::default, |mut tally, standing| {
            tally.record(standing);
            tally
        })
        .reduce(SkillTally::default, Add::add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::fixtures::mark;

    fn standing(status: SkillStatus, score: Option<u8>) -> SkillStanding {
        SkillStanding {
            status,
            best_score: score,
            ..SkillStanding::not_attempted()
        }
    }

    fn sample() -> Vec<SkillStanding> {
        vec![
            standing(SkillStatus::Cleared, Some(76)),
            standing(SkillStatus::NotCleared, Some(40)),
            standing(SkillStatus::NotAttempted, None),
            standing(SkillStatus::Cleared, Some(90)),
        ]
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact binary fractions")]
    fn course_rollup_counts_and_rates() {
        let tally = fold_skills(&sample());
        assert_eq!(tally.cleared, 2);
        assert_eq!(tally.not_cleared, 1);
        assert_eq!(tally.not_attempted, 1);
        assert_eq!(tally.total_subjects, 4);
        assert_eq!(tally.attempted(), 3);
        assert_eq!(tally.completion_rate(), 0.5);
        assert!((tally.average_best_score() - 206.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact zero")]
    fn empty_scope_is_all_zero() {
        let tally = fold_skills(&Vec::<SkillStanding>::new());
        assert_eq!(tally, SkillTally::default());
        assert_eq!(tally.completion_rate(), 0.0);
        assert_eq!(tally.average_best_score(), 0.0);

        let only_unattempted = fold_skills(&vec![standing(SkillStatus::NotAttempted, None)]);
        assert_eq!(only_unattempted.average_best_score(), 0.0);
        assert!(!only_unattempted.average_best_score().is_nan());
    }

    #[test]
    fn buckets_always_sum_to_total() {
        let mut standings = sample();
        standings.push(standing(SkillStatus::Ongoing, Some(68)));
        let tally = fold_skills(&standings);
        assert_eq!(
            tally.cleared + tally.not_cleared + tally.ongoing + tally.not_attempted,
            tally.total_subjects
        );
    }

    #[test]
    fn sharded_and_parallel_folds_match_sequential() {
        let standings: Vec<SkillStanding> = sample().into_iter().cycle().take(103).collect();
        let sequential = fold_skills(&standings);
        let parallel = par_fold_skills(&standings);
        let sharded: SkillTally = standings.chunks(7).map(|chunk| fold_skills(chunk)).sum();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential, sharded);

        let (left, right) = standings.split_at(40);
        let merged = fold_skills(right) + fold_skills(left);
        assert!((merged.average_best_score() - sequential.average_best_score()).abs() < 1e-12);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact binary fractions")]
    fn attendance_counts_and_rate() {
        let marks = vec![
            mark("fn", "s1", "Present"),
            mark("fn", "s2", "Absent"),
            mark("fn", "s3", "Late"),
            mark("fn", "s4", "Present"),
        ];
        let tally = fold_attendance(&marks);
        assert_eq!(tally.present, 2);
        assert_eq!(tally.absent, 1);
        assert_eq!(tally.late, 1);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.attendance_rate(), 0.5);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact binary fractions")]
    fn unmarked_and_invalid_marks_are_excluded_from_total() {
        let marks = vec![mark("fn", "s1", "Present"), mark("fn", "s2", "maybe")];
        let mut tally = fold_attendance(&marks);
        tally.unmarked += 3;
        assert_eq!(tally.skipped, 1);
        assert_eq!(tally.total(), 1);
        assert_eq!(tally.attendance_rate(), 1.0);
        assert_eq!(AttendanceTally::default().attendance_rate(), 0.0);
    }

    #[test]
    fn parallel_attendance_matches_sequential() {
        let states = ["Present", "Absent", "Late", "PS", "??"];
        let marks: Vec<AttendanceMark> = (0..250)
            .map(|i| mark("fn", &format!("s{i}"), states[i % states.len()]))
            .collect();
        let sequential = fold_attendance(&marks);
        assert_eq!(par_fold_attendance(&marks), sequential);
        assert_eq!(sequential.skipped, 50);
        assert_eq!(sequential.permission_slip, 50);
    }
}
