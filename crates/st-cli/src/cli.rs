//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::attendance::AttendanceArgs;
use crate::commands::courses::CoursesArgs;
use crate::commands::import::ImportArgs;
use crate::commands::sessions::SessionsArgs;
use crate::commands::students::StudentsArgs;
use crate::commands::summary::SummaryArgs;

/// Skill and attendance standings.
///
/// Derives per-student skill status, course rollups and session attendance
/// from imported venue records.
#[derive(Debug, Parser)]
#[command(name = "st", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create or upgrade the database.
    Init,

    /// Import venue records from a JSON document.
    Import(ImportArgs),

    /// List known venues.
    Venues {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Skill summary for a venue.
    Summary(SummaryArgs),

    /// Per-course breakdown for a venue.
    Courses(CoursesArgs),

    /// Student skill status, searched, filtered and paged.
    Students(StudentsArgs),

    /// Attendance roster for one session.
    Attendance(AttendanceArgs),

    /// Sessions on a date with their live state.
    Sessions(SessionsArgs),
}
