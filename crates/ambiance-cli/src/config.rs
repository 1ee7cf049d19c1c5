use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

fn default_level() -> String {
    "ambiance=info".to_string()
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
pub struct RoutingConfig {
    /// Shrink channel counts after every `apply`
    #[serde(default)]
    pub optimize_after_apply: bool,
    /// Report routing conflicts before regenerating
    #[serde(default)]
    pub detect_conflicts_before_apply: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub default_path: Option<PathBuf>,
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ambiance")
        .join("config.toml")
}

/// Read the config file. A missing file yields the defaults; a malformed one
/// is an error so the caller can report it once logging is up.
pub fn load_config() -> Result<AppConfig, toml::de::Error> {
    match std::fs::read_to_string(config_path()) {
        Ok(text) => parse_config(&text),
        Err(_) => Ok(AppConfig::default()),
    }
}

pub fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(text)
}

pub fn save_config(config: &AppConfig) -> anyhow::Result<()> {
    write_config(&config_path(), config)
}

fn write_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
