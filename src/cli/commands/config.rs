//! Configuration command implementations

use crate::cli::{ConfigCommands, Output};
use crate::config::CryptpoolConfig;
use anyhow::{Context, Result};

/// Execute config commands
pub fn execute(cmd: ConfigCommands, config_path: Option<&str>, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config_path, output),
    }
}

fn show(config_path: Option<&str>, output: &Output) -> Result<()> {
    let config = CryptpoolConfig::load_with_custom_config(config_path)?;
    // Fail early on values that would not load for a run
    config.settings()?;

    let mut merged = config.get_full_config()?;
    if let Some(key) = merged.get_mut("key") {
        *key = serde_json::Value::String("<redacted>".to_string());
    }

    let rendered = toml::to_string_pretty(&merged).context("Failed to render configuration")?;
    output.plain(rendered.trim_end());
    Ok(())
}
