//! Courses command for per-course breakdowns.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use st_core::GroupId;
use st_core::views::{self, CourseReport};
use st_db::Database;

use super::util::{format_percent, load_snapshot, skipped_note};

#[derive(Debug, Args)]
pub struct CoursesArgs {
    /// Venue ID.
    pub venue: String,

    /// Only count students in this group.
    #[arg(long)]
    pub group: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &CoursesArgs) -> Result<()> {
    let snapshot = load_snapshot(db, &args.venue)?;
    let group = args
        .group
        .as_deref()
        .map(GroupId::new)
        .transpose()
        .context("group id cannot be blank")?;
    let report = views::course_breakdown(&snapshot, group.as_ref());

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", format_courses(&report))?;
    }
    Ok(())
}

fn row(cells: [&str; 8]) -> String {
    let [course, students, cleared, not_cleared, ongoing, not_attempted, avg, completion] = cells;
    format!(
        "{course:<16} {students:>8} {cleared:>8} {not_cleared:>12} {ongoing:>8} {not_attempted:>14} {avg:>9} {completion:>11}"
    )
}

/// Formats the course table.
pub fn format_courses(report: &CourseReport) -> String {
    if report.courses.is_empty() {
        return "No courses offered at this venue.\n".to_string();
    }

    let mut lines = vec![row([
        "COURSE",
        "STUDENTS",
        "CLEARED",
        "NOT CLEARED",
        "ONGOING",
        "NOT ATTEMPTED",
        "AVG BEST",
        "COMPLETION",
    ])];
    for course in &report.courses {
        lines.push(row([
            &course.course_name,
            &course.total_students.to_string(),
            &course.cleared_count.to_string(),
            &course.not_cleared_count.to_string(),
            &course.ongoing_count.to_string(),
            &course.not_attempted_count.to_string(),
            &format!("{:.1}", course.avg_best_score),
            &format_percent(course.completion_rate),
        ]));
    }
    if let Some(note) = skipped_note(report.skipped_count) {
        lines.push(String::new());
        lines.push(note);
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
