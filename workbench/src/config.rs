use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::info;

use crate::state::DEFAULT_SEARCH_DEBOUNCE;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub working_dir: String,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Sessions untouched for this long are torn down and forgotten.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// How often the registry is swept; a quarter of the timeout, at least a second.
    pub fn sweep_interval(&self) -> Duration {
        (self.idle_timeout() / 4).max(Duration::from_secs(1))
    }
}

pub async fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let contents = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: AppConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    info!(path = %path.display(), "Configuration loaded from disk");
    Ok(config)
}

pub fn config_path() -> PathBuf {
    env::var("APP_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// `WORKSPACE`, trimmed; blank counts as unset.
pub fn workspace_from_env() -> Option<String> {
    env::var("WORKSPACE")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_section_is_optional() {
        let config: AppConfig = serde_yaml::from_str(
            "server:\n  host: 0.0.0.0\n  port: 9000\nworking_dir: ./data\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.search.debounce(), DEFAULT_SEARCH_DEBOUNCE);
        assert_eq!(config.sessions.idle_timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn debounce_is_configurable() {
        let config: AppConfig = serde_yaml::from_str(
            "server:\n  host: 127.0.0.1\n  port: 8700\nworking_dir: ./data\nsearch:\n  debounce_ms: 250\n",
        )
        .unwrap();
        assert_eq!(config.search.debounce(), Duration::from_millis(250));
    }

    #[test]
    fn session_sweep_interval_has_a_floor() {
        let config: AppConfig = serde_yaml::from_str(
            "server:\n  host: 127.0.0.1\n  port: 8700\nworking_dir: ./data\nsessions:\n  idle_timeout_secs: 2\n",
        )
        .unwrap();
        assert_eq!(config.sessions.idle_timeout(), Duration::from_secs(2));
        assert_eq!(config.sessions.sweep_interval(), Duration::from_secs(1));
    }
}
