//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::TrackedPath;

/// jsonrelay - replay the git history of tracked JSON files into a derived repository
#[derive(Parser, Debug)]
#[command(name = "jsonrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if jsonrelay was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay outstanding origin commits into the destination repository
    #[command(
        long_about = "Replay outstanding origin commits into the destination repository.\n\n\
            For every origin commit that touches a tracked JSON file and has no \
            resume marker in the destination history yet, the commit's content is \
            deep-merged into the accumulated destination state and recorded as one \
            destination commit. Running sync again with no origin changes does \
            nothing."
    )]
    Sync(RepoArgs),

    /// List outstanding origin commits without replaying them
    Status(RepoArgs),
}

/// Repository selection, shared by all commands.
#[derive(Args, Debug)]
pub struct RepoArgs {
    /// Manifest file (defaults to ./jsonrelay.toml when present)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Origin repository root (overrides the manifest)
    #[arg(long, value_name = "DIR")]
    pub origin: Option<PathBuf>,

    /// Destination repository root (overrides the manifest)
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Tracked JSON file, repeatable (overrides the manifest)
    #[arg(long = "tracked", value_name = "PATH")]
    pub tracked: Vec<TrackedPath>,
}
