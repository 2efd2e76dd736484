//! Storage layer for venue records.
//!
//! Persists venues, rosters, the skill catalogue, sessions, attendance marks
//! and skill attempts using `rusqlite`, and hands them back to the engine as a
//! [`VenueSnapshot`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! Dates are stored as TEXT in `YYYY-MM-DD` form so that lexicographic order
//! matches calendar order. Status, attendance and clock-time columns hold the
//! strings exactly as captured; validating them is the engine's job, so a bad
//! value survives a round trip and is reported when a query touches it.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use st_core::{
    AttemptId, AttendanceMark, GroupId, Session, SessionId, Skill, SkillAttempt, SkillId,
    Subject, SubjectId, ValidationError, Venue, VenueId, VenueSnapshot,
};
use thiserror::Error;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored date did not parse.
    #[error("invalid date for {record_id}: {value}")]
    DateParse {
        record_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// No venue with the requested id.
    #[error("unknown venue: {0}")]
    UnknownVenue(VenueId),
    /// Failed to parse an import document.
    #[error("invalid import document: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored identifier was empty.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Links a skill into a venue's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub venue_id: VenueId,
    pub skill_id: SkillId,
}

/// A skill attempt as it appears in an import document.
///
/// The attempt id is optional; a random one is assigned when it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAttempt {
    #[serde(default)]
    pub attempt_id: Option<AttemptId>,
    pub subject_id: SubjectId,
    pub skill_id: SkillId,
    pub attempt_number: u32,
    pub score: i64,
    #[serde(default = "default_attempt_attendance")]
    pub attendance: String,
    #[serde(default)]
    pub slot_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(alias = "status")]
    pub raw_status: String,
}

fn default_attempt_attendance() -> String {
    "Present".to_string()
}

impl ImportAttempt {
    pub fn into_attempt(self) -> Result<SkillAttempt, DbError> {
        let attempt_id = match self.attempt_id {
            Some(id) => id,
            None => AttemptId::new(Uuid::new_v4().to_string())?,
        };
        Ok(SkillAttempt {
            attempt_id,
            subject_id: self.subject_id,
            skill_id: self.skill_id,
            attempt_number: self.attempt_number,
            score: self.score,
            attendance: self.attendance,
            slot_date: self.slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
            raw_status: self.raw_status,
        })
    }
}

/// A batch of records loaded by `st import`.
///
/// Every section is optional so partial documents (a day's marks, a new
/// batch of attempts) can be imported on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportDocument {
    pub venues: Vec<Venue>,
    pub subjects: Vec<Subject>,
    pub skills: Vec<Skill>,
    pub offerings: Vec<Offering>,
    pub sessions: Vec<Session>,
    pub marks: Vec<AttendanceMark>,
    pub attempts: Vec<ImportAttempt>,
}

impl ImportDocument {
    pub fn from_json(raw: &str) -> Result<Self, DbError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Rows written by an import, per table.
///
/// Duplicates that were ignored are not counted; overwritten marks are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub venues: usize,
    pub subjects: usize,
    pub skills: usize,
    pub offerings: usize,
    pub sessions: usize,
    pub marks: usize,
    pub attempts: usize,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS venues (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subjects (
                id TEXT PRIMARY KEY,
                venue_id TEXT NOT NULL,
                name TEXT NOT NULL,
                roll TEXT NOT NULL,
                group_id TEXT,
                email TEXT,
                FOREIGN KEY (venue_id) REFERENCES venues(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_subjects_venue ON subjects(venue_id);

            CREATE TABLE IF NOT EXISTS skills (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            -- Catalogue order is insertion order (rowid).
            CREATE TABLE IF NOT EXISTS venue_skills (
                venue_id TEXT NOT NULL,
                skill_id TEXT NOT NULL,
                PRIMARY KEY (venue_id, skill_id),
                FOREIGN KEY (venue_id) REFERENCES venues(id) ON DELETE CASCADE,
                FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
            );

            -- date: YYYY-MM-DD; start_time/end_time: clock strings as captured
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                venue_id TEXT NOT NULL,
                date TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                label TEXT NOT NULL,
                FOREIGN KEY (venue_id) REFERENCES venues(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_venue_date ON sessions(venue_id, date);

            CREATE TABLE IF NOT EXISTS attendance_marks (
                session_id TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                state TEXT NOT NULL,
                PRIMARY KEY (session_id, subject_id),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS skill_attempts (
                id TEXT PRIMARY KEY,
                subject_id TEXT NOT NULL,
                skill_id TEXT NOT NULL,
                attempt_number INTEGER NOT NULL,
                score INTEGER NOT NULL,
                attendance TEXT NOT NULL,
                slot_date TEXT,
                start_time TEXT,
                end_time TEXT,
                status TEXT NOT NULL,
                UNIQUE (subject_id, skill_id, attempt_number),
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_subject ON skill_attempts(subject_id);
            ",
        )?;
        Ok(())
    }

    /// Inserts venues, ignoring duplicates by ID.
    pub fn insert_venues(&mut self, venues: &[Venue]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let inserted = write_venues(&tx, venues)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Inserts subjects, ignoring duplicates by ID.
    pub fn insert_subjects(&mut self, subjects: &[Subject]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let inserted = write_subjects(&tx, subjects)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Inserts skills, ignoring duplicates by ID.
    pub fn insert_skills(&mut self, skills: &[Skill]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let inserted = write_skills(&tx, skills)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Adds skills to venue catalogues, ignoring links that already exist.
    pub fn insert_offerings(&mut self, offerings: &[Offering]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let inserted = write_offerings(&tx, offerings)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Inserts sessions, ignoring duplicates by ID.
    pub fn insert_sessions(&mut self, sessions: &[Session]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let inserted = write_sessions(&tx, sessions)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Records attendance marks. A later mark for the same session and subject
    /// replaces the earlier one.
    pub fn upsert_marks(&mut self, marks: &[AttendanceMark]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let written = write_marks(&tx, marks)?;
        tx.commit()?;
        Ok(written)
    }

    /// Inserts attempts, ignoring duplicates by ID or by
    /// `(subject, skill, attempt number)`.
    pub fn insert_attempts(&mut self, attempts: &[SkillAttempt]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let inserted = write_attempts(&tx, attempts)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Loads a whole document in one transaction.
    ///
    /// Sections are written parents first, so a document may reference
    /// venues and sessions it defines itself.
    pub fn import_document(&mut self, document: ImportDocument) -> Result<ImportStats, DbError> {
        let attempts = document
            .attempts
            .into_iter()
            .map(ImportAttempt::into_attempt)
            .collect::<Result<Vec<_>, _>>()?;

        let tx = self.conn.transaction()?;
        let stats = ImportStats {
            venues: write_venues(&tx, &document.venues)?,
            subjects: write_subjects(&tx, &document.subjects)?,
            skills: write_skills(&tx, &document.skills)?,
            offerings: write_offerings(&tx, &document.offerings)?,
            sessions: write_sessions(&tx, &document.sessions)?,
            marks: write_marks(&tx, &document.marks)?,
            attempts: write_attempts(&tx, &attempts)?,
        };
        tx.commit()?;
        tracing::info!(?stats, "imported document");
        Ok(stats)
    }

    /// Lists venues ordered by ID.
    pub fn list_venues(&self) -> Result<Vec<Venue>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM venues ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut venues = Vec::new();
        for row in rows {
            let (id, name) = row?;
            venues.push(Venue {
                venue_id: VenueId::new(id)?,
                name,
            });
        }
        Ok(venues)
    }

    /// Loads everything the engine needs for one venue.
    ///
    /// Subjects come back in roll order, skills in catalogue order and
    /// sessions by date then start time. Sessions and attempts whose stored
    /// date does not parse are left out and counted on the snapshot.
    pub fn load_venue_snapshot(&self, venue_id: &VenueId) -> Result<VenueSnapshot, DbError> {
        let venue = self
            .conn
            .query_row(
                "SELECT id, name FROM venues WHERE id = ?",
                [venue_id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or_else(|| DbError::UnknownVenue(venue_id.clone()))?;
        let venue = Venue {
            venue_id: VenueId::new(venue.0)?,
            name: venue.1,
        };

        let (sessions, skipped_sessions) = self.venue_sessions(venue_id)?;
        let (attempts, skipped_attempts) = self.venue_attempts(venue_id)?;
        let snapshot = VenueSnapshot {
            subjects: self.venue_subjects(venue_id)?,
            skills: self.venue_skills(venue_id)?,
            sessions,
            marks: self.venue_marks(venue_id)?,
            attempts,
            skipped_sessions,
            skipped_attempts,
            venue,
        };
        tracing::debug!(
            venue = %venue_id,
            subjects = snapshot.subjects.len(),
            skills = snapshot.skills.len(),
            sessions = snapshot.sessions.len(),
            marks = snapshot.marks.len(),
            attempts = snapshot.attempts.len(),
            skipped_sessions,
            skipped_attempts,
            "loaded venue snapshot"
        );
        Ok(snapshot)
    }

    fn venue_subjects(&self, venue_id: &VenueId) -> Result<Vec<Subject>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, name, roll, group_id, email
            FROM subjects
            WHERE venue_id = ?
            ORDER BY roll ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([venue_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;
        let mut subjects = Vec::new();
        for row in rows {
            let (id, name, roll, group_id, email) = row?;
            subjects.push(Subject {
                subject_id: SubjectId::new(id)?,
                venue_id: venue_id.clone(),
                name,
                roll,
                group_id: group_id
                    .filter(|g| !g.trim().is_empty())
                    .map(GroupId::new)
                    .transpose()?,
                email,
            });
        }
        Ok(subjects)
    }

    fn venue_skills(&self, venue_id: &VenueId) -> Result<Vec<Skill>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.id, s.name
            FROM venue_skills vs
            JOIN skills s ON s.id = vs.skill_id
            WHERE vs.venue_id = ?
            ORDER BY vs.rowid ASC
            ",
        )?;
        let rows = stmt.query_map([venue_id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut skills = Vec::new();
        for row in rows {
            let (id, name) = row?;
            skills.push(Skill {
                skill_id: SkillId::new(id)?,
                name,
            });
        }
        Ok(skills)
    }

    fn venue_sessions(&self, venue_id: &VenueId) -> Result<(Vec<Session>, usize), DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, date, start_time, end_time, label
            FROM sessions
            WHERE venue_id = ?
            ORDER BY date ASC, start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([venue_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut sessions = Vec::new();
        let mut skipped = 0;
        for row in rows {
            let (id, date, start_time, end_time, label) = row?;
            let date = match parse_date(&id, &date) {
                Ok(date) => date,
                Err(err) => {
                    tracing::warn!(%err, "skipping session");
                    skipped += 1;
                    continue;
                }
            };
            sessions.push(Session {
                date,
                session_id: SessionId::new(id)?,
                venue_id: venue_id.clone(),
                start_time,
                end_time,
                label,
            });
        }
        Ok((sessions, skipped))
    }

    fn venue_marks(&self, venue_id: &VenueId) -> Result<Vec<AttendanceMark>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT m.session_id, m.subject_id, m.state
            FROM attendance_marks m
            JOIN sessions s ON s.id = m.session_id
            WHERE s.venue_id = ?
            ORDER BY m.session_id ASC, m.subject_id ASC
            ",
        )?;
        let rows = stmt.query_map([venue_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut marks = Vec::new();
        for row in rows {
            let (session_id, subject_id, state) = row?;
            marks.push(AttendanceMark {
                session_id: SessionId::new(session_id)?,
                subject_id: SubjectId::new(subject_id)?,
                state,
            });
        }
        Ok(marks)
    }

    fn venue_attempts(&self, venue_id: &VenueId) -> Result<(Vec<SkillAttempt>, usize), DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT a.id, a.subject_id, a.skill_id, a.attempt_number, a.score,
                   a.attendance, a.slot_date, a.start_time, a.end_time, a.status
            FROM skill_attempts a
            JOIN subjects s ON s.id = a.subject_id
            WHERE s.venue_id = ?
            ORDER BY a.subject_id ASC, a.skill_id ASC, a.attempt_number ASC
            ",
        )?;
        let rows = stmt.query_map([venue_id.as_str()], |row| {
            Ok(AttemptRow {
                id: row.get(0)?,
                subject_id: row.get(1)?,
                skill_id: row.get(2)?,
                attempt_number: row.get(3)?,
                score: row.get(4)?,
                attendance: row.get(5)?,
                slot_date: row.get(6)?,
                start_time: row.get(7)?,
                end_time: row.get(8)?,
                status: row.get(9)?,
            })
        })?;
        let mut attempts = Vec::new();
        let mut skipped = 0;
        for row in rows {
            match row?.into_attempt() {
                Ok(attempt) => attempts.push(attempt),
                Err(err @ DbError::DateParse { .. }) => {
                    tracing::warn!(%err, "skipping attempt");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok((attempts, skipped))
    }
}

/// A `skill_attempts` row before identifier and date validation.
struct AttemptRow {
    id: String,
    subject_id: String,
    skill_id: String,
    attempt_number: u32,
    score: i64,
    attendance: String,
    slot_date: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    status: String,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<SkillAttempt, DbError> {
        let slot_date = self
            .slot_date
            .as_deref()
            .map(|value| parse_date(&self.id, value))
            .transpose()?;
        Ok(SkillAttempt {
            attempt_id: AttemptId::new(self.id)?,
            subject_id: SubjectId::new(self.subject_id)?,
            skill_id: SkillId::new(self.skill_id)?,
            attempt_number: self.attempt_number,
            score: self.score,
            attendance: self.attendance,
            slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
            raw_status: self.status,
        })
    }
}

fn parse_date(record_id: &str, value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::DateParse {
        record_id: record_id.to_string(),
        value: value.to_string(),
        source,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn write_venues(conn: &Connection, venues: &[Venue]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO venues (id, name) VALUES (?, ?)")?;
    let mut inserted = 0;
    for venue in venues {
        inserted += stmt.execute(params![venue.venue_id.as_str(), venue.name])?;
    }
    Ok(inserted)
}

fn write_subjects(conn: &Connection, subjects: &[Subject]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO subjects (id, venue_id, name, roll, group_id, email)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )?;
    let mut inserted = 0;
    for subject in subjects {
        inserted += stmt.execute(params![
            subject.subject_id.as_str(),
            subject.venue_id.as_str(),
            subject.name,
            subject.roll,
            subject.group_id.as_ref().map(GroupId::as_str),
            subject.email,
        ])?;
    }
    Ok(inserted)
}

fn write_skills(conn: &Connection, skills: &[Skill]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO skills (id, name) VALUES (?, ?)")?;
    let mut inserted = 0;
    for skill in skills {
        inserted += stmt.execute(params![skill.skill_id.as_str(), skill.name])?;
    }
    Ok(inserted)
}

fn write_offerings(conn: &Connection, offerings: &[Offering]) -> Result<usize, DbError> {
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO venue_skills (venue_id, skill_id) VALUES (?, ?)")?;
    let mut inserted = 0;
    for offering in offerings {
        inserted += stmt.execute(params![offering.venue_id.as_str(), offering.skill_id.as_str()])?;
    }
    Ok(inserted)
}

fn write_sessions(conn: &Connection, sessions: &[Session]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO sessions (id, venue_id, date, start_time, end_time, label)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )?;
    let mut inserted = 0;
    for session in sessions {
        inserted += stmt.execute(params![
            session.session_id.as_str(),
            session.venue_id.as_str(),
            format_date(session.date),
            session.start_time,
            session.end_time,
            session.label,
        ])?;
    }
    Ok(inserted)
}

fn write_marks(conn: &Connection, marks: &[AttendanceMark]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT INTO attendance_marks (session_id, subject_id, state)
        VALUES (?, ?, ?)
        ON CONFLICT (session_id, subject_id) DO UPDATE SET state = excluded.state
        ",
    )?;
    let mut written = 0;
    for mark in marks {
        written += stmt.execute(params![
            mark.session_id.as_str(),
            mark.subject_id.as_str(),
            mark.state,
        ])?;
    }
    Ok(written)
}

fn write_attempts(conn: &Connection, attempts: &[SkillAttempt]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO skill_attempts
        (id, subject_id, skill_id, attempt_number, score, attendance, slot_date, start_time, end_time, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )?;
    let mut inserted = 0;
    for attempt in attempts {
        inserted += stmt.execute(params![
            attempt.attempt_id.as_str(),
            attempt.subject_id.as_str(),
            attempt.skill_id.as_str(),
            attempt.attempt_number,
            attempt.score,
            attempt.attendance,
            attempt.slot_date.map(format_date),
            attempt.start_time,
            attempt.end_time,
            attempt.raw_status,
        ])?;
    }
    Ok(inserted)
}
