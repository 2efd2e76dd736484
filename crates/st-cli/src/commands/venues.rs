//! Venues command for listing known venues.

use std::io::Write;

use anyhow::Result;
use st_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let venues = db.list_venues()?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&venues)?)?;
        return Ok(());
    }
    if venues.is_empty() {
        writeln!(writer, "No venues imported.")?;
        writeln!(writer, "Hint: Run 'st import <file>' to load records.")?;
        return Ok(());
    }
    for venue in venues {
        writeln!(writer, "{:<10} {}", venue.venue_id, venue.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::util::testing::{render, seeded_db};
    use insta::assert_snapshot;

    #[test]
    fn lists_venues() {
        let db = seeded_db();
        let output = render(|out| run(out, &db, false));
        assert_snapshot!(output, @r"
        v1         Lab 1
        v2         Lab 2
        ");
    }

    #[test]
    fn empty_database_hints_at_import() {
        let db = Database::open_in_memory().unwrap();
        let output = render(|out| run(out, &db, false));
        assert!(output.starts_with("No venues imported."));
    }

    #[test]
    fn json_output() {
        let db = seeded_db();
        let output = render(|out| run(out, &db, true));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[1]["venue_id"], "v2");
        assert_eq!(parsed[1]["name"], "Lab 2");
    }
}
