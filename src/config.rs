// ⚙️ Application configuration
//
// A small JSON file (gestora.json by default). Every key is optional; a
// missing file means all defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "gestora.json";

fn default_database_path() -> PathBuf {
    PathBuf::from("gestora.db")
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_log_filter() -> String {
    "gestora=info".to_string()
}

fn default_empresa() -> String {
    "Gestora".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    /// EnvFilter directive; RUST_LOG wins when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Company name shown in the UI header
    #[serde(default = "default_empresa")]
    pub empresa: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            server: ServerConfig::default(),
            log_filter: default_log_filter(),
            empresa: default_empresa(),
        }
    }
}

impl AppConfig {
    /// Read `path`; defaults if it does not exist. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            AppConfig::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(anyhow!("database_path must not be empty"));
        }
        if self.server.bind_addr.trim().is_empty() {
            return Err(anyhow!("server.bind_addr must not be empty"));
        }
        if self.log_filter.trim().is_empty() {
            return Err(anyhow!("log_filter must not be empty"));
        }
        Ok(())
    }
}
