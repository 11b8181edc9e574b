use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};

use super::Settings;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

pub const ENV_PREFIX: &str = "CRYPTPOOL_";

/// Raw key handed from `cryptpool run` to its process workers.
///
/// Read verbatim by the worker, never through the typed figment layer.
pub const WORKER_KEY_VAR: &str = "CRYPTPOOL_WORKER_KEY";

pub struct CryptpoolConfig {
    figment: Figment,
}

impl CryptpoolConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // If custom config is specified, use only that + defaults + env vars
        if let Some(custom_path) = custom_config {
            tracing::debug!("Loading custom config from {}", custom_path);
            figment = match custom_path.rsplit('.').next() {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            let user = Self::user_config_path();
            figment = figment
                // User config - support multiple formats
                .merge(Toml::file(&user))
                .merge(Json::file(user.replace(".toml", ".json")))
                .merge(Yaml::file(user.replace(".toml", ".yaml")))
                .merge(Yaml::file(user.replace(".toml", ".yml")))
                // Working directory config
                .merge(Toml::file("cryptpool.toml"))
                .merge(Json::file("cryptpool.json"))
                .merge(Yaml::file("cryptpool.yaml"))
                .merge(Yaml::file("cryptpool.yml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["worker_key"]));

        Ok(CryptpoolConfig { figment })
    }

    /// Typed view of the merged configuration.
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .context("Invalid cryptpool configuration")
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/cryptpool/config.toml"),
            Err(_) => "~/.config/cryptpool/config.toml".to_string(),
        }
    }
}
