//! Session window resolution.
//!
//! Classifies a session against "now". Only sessions viewed on today's date get
//! an open/closed judgment; any other reference date is [`SessionState::Indeterminate`].
//!
//! ```text
//! NotStarted ──(start)──▶ Ongoing ──(end)──▶ Closed
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::clock::{Clock, ClockError};
use crate::error::RecordError;
use crate::record::Session;
use crate::status::SessionState;

/// Accepted clock-time layouts, tried in order.
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p", "%I:%M:%S %p"];

/// Parses a local clock time such as `09:00`, `14:30:00` or `2:30 PM`.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

/// Returns the session's `[start, end)` window.
///
/// Fails when either time is missing or unparseable, or the window is empty.
pub fn session_window(session: &Session) -> Result<(NaiveTime, NaiveTime), RecordError> {
    let invalid = |value: String| RecordError::InvalidTime {
        record_id: session.session_id.to_string(),
        value,
    };

    let start_raw = session.start_time.as_deref().unwrap_or("");
    let end_raw = session.end_time.as_deref().unwrap_or("");
    let start = parse_clock_time(start_raw).ok_or_else(|| invalid(start_raw.to_string()))?;
    let end = parse_clock_time(end_raw).ok_or_else(|| invalid(end_raw.to_string()))?;

    if start >= end {
        return Err(invalid(format!("{start_raw}-{end_raw}")));
    }
    Ok((start, end))
}

/// Classifies `session` as seen on `reference_date` at `now`.
pub fn resolve_window(
    session: &Session,
    reference_date: NaiveDate,
    now: NaiveDateTime,
) -> SessionState {
    if reference_date != now.date() {
        return SessionState::Indeterminate;
    }

    let (start, end) = match session_window(session) {
        Ok(window) => window,
        Err(err) => {
            tracing::warn!(%err, "session window unusable");
            return SessionState::Indeterminate;
        }
    };

    let time = now.time();
    if time < start {
        SessionState::NotStarted
    } else if time < end {
        SessionState::Ongoing
    } else {
        SessionState::Closed
    }
}

/// Like [`resolve_window`], reading "now" from `clock`.
pub fn resolve_window_with<C: Clock>(
    session: &Session,
    reference_date: NaiveDate,
    clock: &C,
) -> Result<SessionState, ClockError> {
    let now = clock.now()?;
    Ok(resolve_window(session, reference_date, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::types::{SessionId, VenueId};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        day().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn session(start: Option<&str>, end: Option<&str>) -> Session {
        Session {
            session_id: SessionId::new("s1").unwrap(),
            venue_id: VenueId::new("v1").unwrap(),
            date: day(),
            start_time: start.map(String::from),
            end_time: end.map(String::from),
            label: "Forenoon".to_string(),
        }
    }

    #[test]
    fn window_boundaries_are_half_open() {
        let s = session(Some("09:00"), Some("10:30"));
        assert_eq!(resolve_window(&s, day(), at(8, 59)), SessionState::NotStarted);
        assert_eq!(resolve_window(&s, day(), at(9, 0)), SessionState::Ongoing);
        assert_eq!(resolve_window(&s, day(), at(10, 29)), SessionState::Ongoing);
        assert_eq!(resolve_window(&s, day(), at(10, 30)), SessionState::Closed);
    }

    #[test]
    fn other_dates_are_indeterminate_regardless_of_time() {
        let s = session(Some("09:00"), Some("10:30"));
        let yesterday = day().pred_opt().unwrap();
        let tomorrow = day().succ_opt().unwrap();
        for now in [at(0, 0), at(9, 30), at(23, 59)] {
            assert_eq!(resolve_window(&s, yesterday, now), SessionState::Indeterminate);
            assert_eq!(resolve_window(&s, tomorrow, now), SessionState::Indeterminate);
        }
    }

    #[test]
    fn malformed_times_are_indeterminate() {
        let missing = session(None, Some("10:30"));
        assert_eq!(resolve_window(&missing, day(), at(9, 30)), SessionState::Indeterminate);

        let garbage = session(Some("nine"), Some("10:30"));
        assert_eq!(resolve_window(&garbage, day(), at(9, 30)), SessionState::Indeterminate);

        let inverted = session(Some("11:00"), Some("10:30"));
        assert_eq!(resolve_window(&inverted, day(), at(9, 30)), SessionState::Indeterminate);
    }

    #[test]
    fn twelve_hour_times_parse() {
        assert_eq!(parse_clock_time("2:30 PM"), NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(parse_clock_time("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_clock_time(" 13:05:30 "), NaiveTime::from_hms_opt(13, 5, 30));
        assert_eq!(parse_clock_time("25:00"), None);
    }

    #[test]
    fn inverted_window_reports_both_ends() {
        let err = session_window(&session(Some("11:00"), Some("10:30"))).unwrap_err();
        assert_eq!(err.to_string(), "invalid time on s1: 11:00-10:30");
    }

    #[test]
    fn resolves_with_injected_clock() {
        let s = session(Some("13:00"), Some("14:00"));
        let clock = FixedClock(at(13, 45));
        assert_eq!(resolve_window_with(&s, day(), &clock).unwrap(), SessionState::Ongoing);
    }
}
