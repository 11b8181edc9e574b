//! Standalone single-file transform
//!
//! Runs the engine directly in this process: no queue, no workers.

use crate::cli::Output;
use crate::engine;
use crate::key::Key;
use crate::task::Action;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct TransformArgs {
    /// File to read
    pub input: PathBuf,

    /// File to write (may be the same as INPUT)
    pub output: PathBuf,

    /// Transform direction
    #[arg(value_enum)]
    pub action: Action,

    /// Integer key; reduced modulo 256
    #[arg(allow_hyphen_values = true)]
    pub key: String,
}

pub fn execute(args: TransformArgs, output: &Output) -> Result<()> {
    let key = Key::parse(&args.key).context("Invalid key")?;

    let report = engine::transform_file(&args.input, &args.output, args.action, key)
        .with_context(|| format!("Failed to {} {}", args.action, args.input.display()))?;

    output.success(&format!(
        "{} {} -> {} ({} bytes)",
        args.action,
        args.input.display(),
        args.output.display(),
        report.bytes
    ));
    Ok(())
}
