//! Application configuration stored in `.quiz.toml`.

use std::path::Path;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".quiz.toml";

/// Quiz client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the quiz server.
    pub server: String,
    /// User id used until a profile has been saved. Empty for no id.
    pub default_user_id: String,
    /// Level of the log file written next to the store.
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:5000".to_string(),
            default_user_id: "12345".to_string(),
            log_level: LogLevel::Info,
        }
    }
}

/// Log level of the application log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace level logging.
    Trace,
    /// Debug level logging.
    Debug,
    /// Info level logging.
    #[default]
    Info,
    /// Warning level logging.
    Warn,
    /// Error level logging.
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Loads and prepares the application configuration.
///
/// Without `menu`, a missing file gives the defaults and an existing file is
/// parsed (falling back to the editor if it is invalid). With `menu`, the
/// file is created from the defaults if needed and opened in the form editor.
///
/// # Errors
///
/// Returns an error if the file cannot be written or read back.
pub async fn prepare_config(config_path: &Path, menu: bool) -> anyhow::Result<AppConfig> {
    if !config_path.exists() {
        if !menu {
            debug!("{} not found, using defaults", config_path.display());
            return Ok(AppConfig::default());
        }
        let content = toml::to_string_pretty(&AppConfig::default())?;
        tokio::fs::write(config_path, content)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    match quizform::run::<AppConfig>(config_path, menu).await? {
        Some(c) => Ok(c),
        None => read_config(config_path).await,
    }
}

async fn read_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    let content = tokio::fs::read_to_string(config_path)
        .await
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid configuration in {}", config_path.display()))
}
