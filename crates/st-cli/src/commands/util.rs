//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use st_core::{Clock, ClockError, FixedClock, SystemClock, VenueId, VenueSnapshot};
use st_db::Database;

/// Local formats accepted by `--at`, tried in order.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an `--at` value as RFC 3339 or as a local date-time.
///
/// RFC 3339 inputs are converted to the local timezone, since session
/// schedules are local clock times.
pub fn parse_at(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .with_context(|| {
            format!(
                "Invalid time: {s}. Use RFC 3339 (e.g., 2025-03-10T09:30:00+05:30) or local time (e.g., 2025-03-10T09:30)"
            )
        })
}

/// The clock commands run against: the system clock, or a fixed `--at`.
#[derive(Debug, Clone, Copy)]
pub enum CliClock {
    System(SystemClock),
    Fixed(FixedClock),
}

impl CliClock {
    pub fn from_arg(at: Option<&str>) -> Result<Self> {
        match at {
            Some(raw) => Ok(Self::Fixed(FixedClock(parse_at(raw)?))),
            None => Ok(Self::System(SystemClock)),
        }
    }
}

impl Clock for CliClock {
    fn now(&self) -> Result<NaiveDateTime, ClockError> {
        match self {
            Self::System(clock) => clock.now(),
            Self::Fixed(clock) => clock.now(),
        }
    }
}

/// Validates a venue argument and loads its snapshot.
pub fn load_snapshot(db: &Database, venue: &str) -> Result<VenueSnapshot> {
    let venue_id = VenueId::new(venue).context("venue id is required")?;
    db.load_venue_snapshot(&venue_id)
        .with_context(|| format!("failed to load venue {venue_id}"))
}

/// Formats a 0..=1 rate as a percentage with one decimal.
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Logs skipped records and returns the footer line, if any.
pub fn skipped_note(skipped: usize) -> Option<String> {
    if skipped == 0 {
        return None;
    }
    tracing::warn!(skipped, "some records failed validation and were skipped");
    Some(format!("Skipped {skipped} invalid record(s); run with --verbose for details."))
}
