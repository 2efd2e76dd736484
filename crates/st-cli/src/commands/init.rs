//! Init command for creating the database.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

/// Reports the database location. Opening the database already created the
/// schema.
pub fn run<W: Write>(writer: &mut W, database_path: &Path) -> Result<()> {
    writeln!(writer, "Database ready: {}", database_path.display())?;
    Ok(())
}
