//! Attendance command for one session's roster.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use st_core::views::{self, AttendanceDetail, AttendanceSummary};
use st_core::{Clock, GroupId};
use st_db::Database;

use super::util::{CliClock, format_percent, load_snapshot, skipped_note};

#[derive(Debug, Args)]
pub struct AttendanceArgs {
    /// Venue ID.
    pub venue: String,

    /// Session date (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,

    /// Session ID or label (e.g. "fn" or "Forenoon").
    #[arg(long)]
    pub session: String,

    /// Only list students in this group.
    #[arg(long)]
    pub group: Option<String>,

    /// Evaluate the session state at this time instead of now.
    #[arg(long)]
    pub at: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &AttendanceArgs) -> Result<()> {
    let clock = CliClock::from_arg(args.at.as_deref())?;
    run_with_clock(writer, db, args, &clock)
}

pub fn run_with_clock<W: Write, C: Clock>(
    writer: &mut W,
    db: &Database,
    args: &AttendanceArgs,
    clock: &C,
) -> Result<()> {
    let snapshot = load_snapshot(db, &args.venue)?;
    let group = args
        .group
        .as_deref()
        .map(GroupId::new)
        .transpose()
        .context("group id cannot be blank")?;
    let detail =
        views::attendance_detail(&snapshot, args.date, &args.session, group.as_ref(), clock)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&detail)?)?;
    } else {
        write!(writer, "{}", format_attendance(&detail))?;
    }
    Ok(())
}

/// One-line attendance counts, shared with `st sessions`.
pub fn format_counts(summary: &AttendanceSummary) -> String {
    format!(
        "Present: {}  Absent: {}  Late: {}  PS: {}  Unmarked: {}",
        summary.present, summary.absent, summary.late, summary.ps, summary.unmarked
    )
}

/// Formats the session roster.
pub fn format_attendance(detail: &AttendanceDetail) -> String {
    let mut lines = vec![
        format!(
            "ATTENDANCE: {} ({}) at {} on {}",
            detail.session_label, detail.session_id, detail.venue_id, detail.date
        ),
        format!("State: {}", detail.session_state),
        String::new(),
        format_counts(&detail.summary),
        format!(
            "Attendance rate: {}",
            format_percent(detail.summary.attendance_rate)
        ),
    ];

    if !detail.students.is_empty() {
        lines.push(String::new());
        for student in &detail.students {
            let status = match student.status {
                Some(status) => status.as_str(),
                None if student.mark_rejected => "invalid",
                None => "-",
            };
            lines.push(format!("{:<9} {:<14} {status}", student.roll, student.name));
        }
    }

    if let Some(note) = skipped_note(detail.skipped_count) {
        lines.push(String::new());
        lines.push(note);
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
