//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize diagnostics and resolve the working directory
//! - Delegate to command handlers
//!
//! The CLI layer is thin: it never touches a repository directly. All
//! replay work flows through [`crate::engine`].

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::{Context, Result};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.debug, cli.quiet);

    let base = match cli.cwd {
        Some(path) => path,
        None => std::env::current_dir().context("determining working directory")?,
    };

    match cli.command {
        Command::Sync(repo_args) => commands::sync(&base, repo_args, cli.quiet).await,
        Command::Status(repo_args) => commands::status(&base, repo_args, cli.quiet).await,
    }
}

/// Initialize the tracing subscriber on stderr.
///
/// Progress summaries go to stdout; tracing carries diagnostics only, so
/// the default filter stays at `warn` unless `--debug` raises it.
/// `RUST_LOG` overrides either.
fn init_tracing(debug: bool, quiet: bool) {
    let default_filter = if debug {
        "jsonrelay=debug"
    } else if quiet {
        "jsonrelay=error"
    } else {
        "jsonrelay=warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
