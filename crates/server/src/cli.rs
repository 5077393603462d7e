//! Command line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ballotbox", version, about = "School election voting server")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port, overrides the configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// SQLite database file, overrides the configuration
    #[arg(long)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print an argon2 hash for use as a booth or admin credential
    HashPassword {
        password: String,
    },
}
