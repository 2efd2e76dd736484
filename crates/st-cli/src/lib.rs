//! Standings CLI library.
//!
//! This crate provides the `st` command-line interface over the standings
//! engine and its SQLite store.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
