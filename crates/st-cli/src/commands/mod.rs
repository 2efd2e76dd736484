//! CLI subcommand implementations.

pub mod attendance;
pub mod courses;
pub mod import;
pub mod init;
pub mod sessions;
pub mod students;
pub mod summary;
pub mod util;
pub mod venues;
