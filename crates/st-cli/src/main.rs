use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use st_cli::commands::{attendance, courses, import, init, sessions, students, summary, venues};
use st_cli::{Cli, Commands, Config};

/// Open the database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<st_db::Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    st_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries command output only.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let mut db = open_database(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Init => init::run(&mut out, &config.database_path)?,
        Commands::Import(args) => {
            import::run(&mut out, &mut db, args)?;
        }
        Commands::Venues { json } => venues::run(&mut out, &db, *json)?,
        Commands::Summary(args) => summary::run(&mut out, &db, args)?,
        Commands::Courses(args) => courses::run(&mut out, &db, args)?,
        Commands::Students(args) => students::run(&mut out, &db, args, config.page_limits())?,
        Commands::Attendance(args) => attendance::run(&mut out, &db, args)?,
        Commands::Sessions(args) => sessions::run(&mut out, &db, args)?,
    }

    out.flush()?;
    Ok(())
}
