//! Command-line interface for cryptpool
//!
//! This module provides the main CLI structure and command handling.
//! It uses clap for argument parsing and sets up tracing before dispatching.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

pub mod commands;
pub mod output;

pub use output::Output;

/// cryptpool - run byte-rotation file transforms on a bounded worker pool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Transform files on the worker pool
    Run(commands::run::RunArgs),
    /// Transform a single file synchronously, without the pool
    Transform(commands::transform::TransformArgs),
    /// Execute one encoded task ticket (used by process workers)
    #[command(hide = true)]
    Worker(commands::worker::WorkerArgs),
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Show version information
    Version,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        let worker_flags = self.worker_flags();
        let config = self.config.as_deref();

        match self.command {
            Some(Commands::Run(args)) => {
                commands::run::execute(args, config, &worker_flags, &output).await
            }
            Some(Commands::Transform(args)) => commands::transform::execute(args, &output),
            Some(Commands::Worker(args)) => commands::worker::execute(args, config),
            Some(Commands::Config(cmd)) => commands::config::execute(cmd, config, &output),
            Some(Commands::Version) => commands::version::execute(&output),
            None => {
                // Show help when no command is provided
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(())
            }
        }
    }
}

impl Cli {
    /// Global flags a process worker needs to load the same configuration and
    /// log at the same level as this process.
    pub fn worker_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(path) = &self.config {
            flags.push("--config".to_string());
            flags.push(path.clone());
        }
        if self.quiet {
            flags.push("--quiet".to_string());
        }
        flags.extend((0..self.verbose).map(|_| "--verbose".to_string()));
        flags
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match (quiet, verbose) {
            (true, _) => tracing_subscriber::EnvFilter::new("error"),
            (false, 0) => tracing_subscriber::EnvFilter::new("warn"),
            (false, 1) => tracing_subscriber::EnvFilter::new("info"),
            (false, 2) => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // Diagnostics go to stderr; stdout is reserved for command output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
