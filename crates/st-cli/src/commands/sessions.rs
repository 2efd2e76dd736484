//! Sessions command listing a day's sessions with their live state.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use st_core::Clock;
use st_core::views::{self, SessionOverview};
use st_db::Database;

use super::attendance::format_counts;
use super::util::{CliClock, format_percent, load_snapshot, skipped_note};

#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Venue ID.
    pub venue: String,

    /// Date to list (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Evaluate session states at this time instead of now.
    #[arg(long)]
    pub at: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &SessionsArgs) -> Result<()> {
    let clock = CliClock::from_arg(args.at.as_deref())?;
    let snapshot = load_snapshot(db, &args.venue)?;
    let date = match args.date {
        Some(date) => date,
        None => clock.now()?.date(),
    };
    let overview = views::session_overview(&snapshot, date, &clock)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&overview)?)?;
    } else {
        write!(
            writer,
            "{}",
            format_sessions(
                snapshot.venue.venue_id.as_str(),
                date,
                &overview,
                snapshot.skipped_sessions
            )
        )?;
    }
    Ok(())
}

fn format_window(session: &SessionOverview) -> String {
    let start = session.start_time.as_deref().unwrap_or("?");
    let end = session.end_time.as_deref().unwrap_or("?");
    format!("{start}-{end}")
}

/// Formats the day's sessions.
///
/// `unreadable` counts sessions storage dropped; they join the skipped note.
pub fn format_sessions(
    venue: &str,
    date: NaiveDate,
    overview: &[SessionOverview],
    unreadable: usize,
) -> String {
    let mut lines = vec![format!("SESSIONS: {venue} on {date}")];
    if overview.is_empty() {
        lines.push("No sessions scheduled.".to_string());
    }

    let mut skipped = unreadable;
    for session in overview {
        lines.push(String::new());
        lines.push(format!(
            "{} ({})  {}  {}",
            session.label,
            session.session_id,
            format_window(session),
            session.session_state
        ));
        lines.push(format!(
            "  {}  Rate: {}",
            format_counts(&session.summary),
            format_percent(session.summary.attendance_rate)
        ));
        skipped += session.skipped_count;
    }

    if let Some(note) = skipped_note(skipped) {
        lines.push(String::new());
        lines.push(note);
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::util::testing::{render, seeded_db};
    use insta::assert_snapshot;

    fn args(date: Option<&str>, at: &str) -> SessionsArgs {
        SessionsArgs {
            venue: "v1".to_string(),
            date: date.map(|d| d.parse().unwrap()),
            at: Some(at.to_string()),
            json: false,
        }
    }

    #[test]
    fn day_overview_in_start_order() {
        let db = seeded_db();
        let output = render(|out| run(out, &db, &args(None, "2025-03-10T14:00")));
        assert_snapshot!(output, @r"
        SESSIONS: v1 on 2025-03-10

        Forenoon (fn)  09:00-12:30  Closed
          Present: 1  Absent: 1  Late: 1  PS: 0  Unmarked: 1  Rate: 33.3%

        Afternoon (an)  01:30 PM-04:30 PM  Ongoing
          Present: 1  Absent: 0  Late: 0  PS: 1  Unmarked: 2  Rate: 50.0%
        ");
    }

    #[test]
    fn explicit_date_from_another_day_is_indeterminate() {
        let db = seeded_db();
        let mut query = args(Some("2025-03-11"), "2025-03-10T10:00");
        query.json = true;
        let output = render(|out| run(out, &db, &query));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let sessions = parsed.as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["sessionId"], "fn-11");
        assert_eq!(sessions[0]["sessionState"], "Indeterminate");
        assert_eq!(sessions[0]["summary"]["unmarked"], 4);
    }

    #[test]
    fn empty_day() {
        let db = seeded_db();
        let output = render(|out| run(out, &db, &args(Some("2025-04-01"), "2025-04-01T10:00")));
        assert_eq!(output, "SESSIONS: v1 on 2025-04-01\nNo sessions scheduled.\n");
    }

    #[test]
    fn unreadable_sessions_are_noted() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let output = format_sessions("v1", date, &[], 2);
        assert_snapshot!(output, @r"
        SESSIONS: v1 on 2025-03-10
        No sessions scheduled.

        Skipped 2 invalid record(s); run with --verbose for details.
        ");
    }
}
