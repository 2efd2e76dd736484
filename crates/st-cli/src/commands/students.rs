//! Students command for per-student skill status.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use st_core::views::{self, StudentSkillStatus};
use st_core::{PageLimits, QueryParams, SkillStatus, SortKey, SortOrder};
use st_db::Database;

use super::summary::scope_from;
use super::util::{load_snapshot, skipped_note};

#[derive(Debug, Args)]
pub struct StudentsArgs {
    /// Venue ID.
    pub venue: String,

    /// Only list students in this group.
    #[arg(long)]
    pub group: Option<String>,

    /// Only list this course (ID or name).
    #[arg(long)]
    pub course: Option<String>,

    /// Case-insensitive match on name, roll, ID or email.
    #[arg(long)]
    pub search: Option<String>,

    /// Only list rows with this status (e.g. "cleared", "not attempted").
    #[arg(long)]
    pub status: Option<SkillStatus>,

    /// Only list rows whose best attempt was on this date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Sort column: name, roll, course, status, score or date.
    #[arg(long)]
    pub sort_by: Option<SortKey>,

    /// Sort direction.
    #[arg(long, default_value = "asc")]
    pub order: SortOrder,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl StudentsArgs {
    fn params(&self) -> QueryParams<SkillStatus> {
        QueryParams {
            search: self.search.clone(),
            status_filter: self.status,
            date_filter: self.date,
            sort_by: self.sort_by,
            sort_order: self.order,
            page: self.page,
            limit: self.limit,
        }
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &StudentsArgs,
    limits: PageLimits,
) -> Result<()> {
    let snapshot = load_snapshot(db, &args.venue)?;
    let scope = scope_from(args.group.as_deref(), args.course.as_deref())?;
    let result = views::student_skill_status(&snapshot, &scope, &args.params(), limits);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        write!(writer, "{}", format_students(&result))?;
    }
    Ok(())
}

fn row(cells: [&str; 7]) -> String {
    let [roll, name, course, status, best, attempts, date] = cells;
    format!("{roll:<9} {name:<14} {course:<14} {status:<14} {best:>4} {attempts:>8}  {date}")
}

/// Formats one page of student rows.
pub fn format_students(result: &StudentSkillStatus) -> String {
    let pagination = &result.page.pagination;
    let mut lines = Vec::new();

    if result.page.items.is_empty() {
        if pagination.total_count == 0 {
            lines.push("No matching students.".to_string());
        } else {
            lines.push(format!(
                "Page {} is past the end ({} pages).",
                pagination.page, pagination.total_pages
            ));
        }
    } else {
        lines.push(row([
            "ROLL",
            "NAME",
            "COURSE",
            "STATUS",
            "BEST",
            "ATTEMPTS",
            "SLOT DATE",
        ]));
        for item in &result.page.items {
            let best = item
                .best_score
                .map_or_else(|| "-".to_string(), |score| score.to_string());
            let date = item
                .slot_date
                .map_or_else(|| "-".to_string(), |date| date.to_string());
            lines.push(row([
                &item.roll,
                &item.name,
                &item.course_name,
                item.status.as_str(),
                &best,
                &item.attempt_count.to_string(),
                &date,
            ]));
        }
        lines.push(String::new());
        lines.push(format!(
            "Page {} of {} ({} matching rows)",
            pagination.page, pagination.total_pages, pagination.total_count
        ));
    }

    if let Some(note) = skipped_note(result.skipped_count) {
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

    fn args() -> StudentsArgs {
        StudentsArgs {
            venue: "v1".to_string(),
            group: None,
            course: None,
            search: None,
            status: None,
            date: None,
            sort_by: None,
            order: SortOrder::Asc,
            page: 1,
            limit: None,
            json: false,
        }
    }

    #[test]
    fn not_cleared_by_score_descending() {
        let db = seeded_db();
        let query = StudentsArgs {
            status: Some(SkillStatus::NotCleared),
            sort_by: Some(SortKey::Score),
            order: SortOrder::Desc,
            ..args()
        };
        let output = render(|out| run(out, &db, &query, PageLimits::default()));
        assert_snapshot!(output, @r"
        ROLL      NAME           COURSE         STATUS         BEST ATTEMPTS  SLOT DATE
        21CS002   Ben Okafor     Rust Basics    Not Cleared      55        1  2025-03-03
        21CS001   Ana Diaz       SQL Joins      Not Cleared      40        1  2025-03-04

        Page 1 of 1 (2 matching rows)
        ");
    }

    #[test]
    fn unattempted_rows_show_dashes() {
        let db = seeded_db();
        let query = StudentsArgs {
            status: Some(SkillStatus::NotAttempted),
            ..args()
        };
        let output = render(|out| run(out, &db, &query, PageLimits::default()));
        assert!(output.contains("Ben Okafor     SQL Joins      Not Attempted     -        0  -"));
        assert!(output.contains("Cy Lin         Rust Basics    Not Attempted     -        0  -"));
        assert!(output.contains("(2 matching rows)"));
    }

    #[test]
    fn pages_through_rows() {
        let db = seeded_db();
        let query = StudentsArgs {
            limit: Some(3),
            page: 3,
            json: true,
            ..args()
        };
        let output = render(|out| run(out, &db, &query, PageLimits::default()));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["pagination"]["totalCount"], 8);
        assert_eq!(parsed["pagination"]["totalPages"], 3);
        assert_eq!(parsed["items"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["items"][0]["studentId"], "s4");
        assert_eq!(parsed["skippedCount"], 0);
    }

    #[test]
    fn limit_is_clamped_to_config() {
        let db = seeded_db();
        let query = StudentsArgs {
            limit: Some(500),
            json: true,
            ..args()
        };
        let limits = PageLimits {
            default_limit: 2,
            max_limit: 5,
        };
        let output = render(|out| run(out, &db, &query, limits));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["pagination"]["limit"], 5);
        assert_eq!(parsed["pagination"]["totalPages"], 2);
    }

    #[test]
    fn search_and_date_filters() {
        let db = seeded_db();
        let query = StudentsArgs {
            search: Some("EXAMPLE.EDU".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 3, 10),
            json: true,
            ..args()
        };
        let output = render(|out| run(out, &db, &query, PageLimits::default()));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["pagination"]["totalCount"], 1);
        assert_eq!(parsed["items"][0]["courseId"], "rust-101");
        assert_eq!(parsed["items"][0]["status"], "Cleared");
        assert_eq!(parsed["items"][0]["bestScore"], 76);
    }

    #[test]
    fn empty_and_past_the_end() {
        let db = seeded_db();
        let none = StudentsArgs {
            search: Some("zzz".to_string()),
            ..args()
        };
        let output = render(|out| run(out, &db, &none, PageLimits::default()));
        assert_eq!(output, "No matching students.\n");

        let past = StudentsArgs {
            page: 9,
            ..args()
        };
        let output = render(|out| run(out, &db, &past, PageLimits::default()));
        assert_eq!(output, "Page 9 is past the end (1 pages).\n");
    }
}
