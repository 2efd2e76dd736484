//! Summary command for venue-level skill rollups.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use st_core::views::{self, Summary};
use st_core::{GroupId, Scope};
use st_db::Database;

use super::util::{format_percent, load_snapshot, skipped_note};

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Venue ID.
    pub venue: String,

    /// Only count students in this group.
    #[arg(long)]
    pub group: Option<String>,

    /// Only count this course (ID or name).
    #[arg(long)]
    pub course: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Builds a scope from optional `--group` and `--course` values.
pub fn scope_from(group: Option<&str>, course: Option<&str>) -> Result<Scope> {
    let group_id = group
        .map(GroupId::new)
        .transpose()
        .context("group id cannot be blank")?;
    Ok(Scope {
        group_id,
        course_filter: course.map(str::to_string),
    })
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &SummaryArgs) -> Result<()> {
    let snapshot = load_snapshot(db, &args.venue)?;
    let scope = scope_from(args.group.as_deref(), args.course.as_deref())?;
    let summary = views::summary(&snapshot, &scope);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&summary)?)?;
    } else {
        write!(writer, "{}", format_summary(&summary, &scope))?;
    }
    Ok(())
}

/// Formats the human-readable summary.
pub fn format_summary(summary: &Summary, scope: &Scope) -> String {
    let header = format!("SKILL SUMMARY: {}", summary.venue_id);
    let mut lines = vec![header.clone(), "─".repeat(header.chars().count())];
    if let Some(group) = &scope.group_id {
        lines.push(format!("Group:          {group}"));
    }
    if let Some(course) = &scope.course_filter {
        lines.push(format!("Course:         {course}"));
    }
    lines.extend([
        format!("Students:       {}", summary.total_students),
        format!("Standings:      {}", summary.total_standings),
        format!("Cleared:        {}", summary.cleared),
        format!("Not Cleared:    {}", summary.not_cleared),
        format!("Ongoing:        {}", summary.ongoing),
        format!("Not Attempted:  {}", summary.not_attempted),
        format!("Average best:   {:.1}", summary.average_best_score),
        format!("Completion:     {}", format_percent(summary.completion_rate)),
    ]);
    if let Some(note) = skipped_note(summary.skipped_count) {
        lines.push(String::new());
        lines.push(note);
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
