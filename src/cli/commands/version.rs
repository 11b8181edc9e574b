//! Version command implementation
//!
//! Displays version and build information.

use crate::cli::Output;
use crate::pool;
use anyhow::Result;

/// Execute the version command
pub fn execute(output: &Output) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");
    let description = env!("CARGO_PKG_DESCRIPTION");
    let authors = env!("CARGO_PKG_AUTHORS");

    output.header(&format!("{name} v{version}"));

    output.category("About");
    output.key_value("Description:", description, false);
    output.key_value("Authors:", authors, false);

    output.category("Build Information");
    output.key_value("Rust edition:", "2024", false);
    output.key_value("Target:", std::env::consts::ARCH, false);
    output.key_value(
        "Profile:",
        if cfg!(debug_assertions) { "debug" } else { "release" },
        false,
    );
    output.key_value(
        "Worker slots:",
        &pool::available_workers().to_string(),
        true,
    );

    Ok(())
}
