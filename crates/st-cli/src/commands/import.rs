//! Import command for loading venue records into the local `SQLite` store.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use st_db::{Database, ImportDocument, ImportStats};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON document to import, or `-` for stdin.
    pub path: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &ImportArgs) -> Result<ImportStats> {
    let raw = read_source(&args.path)?;
    let document = ImportDocument::from_json(&raw)
        .with_context(|| format!("failed to parse {}", args.path.display()))?;
    let stats = db.import_document(document)?;
    write_stats(writer, &stats)?;
    Ok(stats)
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_stats<W: Write>(writer: &mut W, stats: &ImportStats) -> io::Result<()> {
    writeln!(writer, "Imported:")?;
    writeln!(writer, "  venues:    {}", stats.venues)?;
    writeln!(writer, "  subjects:  {}", stats.subjects)?;
    writeln!(writer, "  skills:    {}", stats.skills)?;
    writeln!(writer, "  offerings: {}", stats.offerings)?;
    writeln!(writer, "  sessions:  {}", stats.sessions)?;
    writeln!(writer, "  marks:     {}", stats.marks)?;
    writeln!(writer, "  attempts:  {}", stats.attempts)?;
    Ok(())
}
