//! Configuration for both halves of the binary.
//!
//! The server is configured from environment variables:
//! - `NOTEWELL_DB` - SQLite path (default: platform data dir `notewell.db`)
//! - `NOTEWELL_CORS_ORIGINS` - allowed origins, comma-separated (default: any)
//! - `NOTEWELL_SUMMARY_URL` - OpenAI-compatible base URL (default: DeepSeek)
//! - `NOTEWELL_SUMMARY_API_KEY` - enables the chat summarizer when set
//! - `NOTEWELL_SUMMARY_MODEL` - chat model name
//!
//! The client reads `config.json` from the user's config directory; `NOTEWELL_URL`
//! and `NOTEWELL_TOKEN` override what is stored there.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "notewell";
const CONFIG_FILE: &str = "config.json";

/// Default API base URL for a local `notewell serve`.
pub const DEFAULT_URL: &str = "http://localhost:17020/api/v1";
pub const DEFAULT_PORT: u16 = 17020;

const DEFAULT_SUMMARY_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_SUMMARY_MODEL: &str = "deepseek-chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SUMMARY_URL.to_string(),
            api_key: None,
            model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db_path: Option<PathBuf>,
    pub cors_origins: Option<Vec<String>>,
    pub summary: SummaryConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("NOTEWELL_DB").map(PathBuf::from);

        let cors_origins = lookup("NOTEWELL_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let defaults = SummaryConfig::default();
        let summary = SummaryConfig {
            base_url: lookup("NOTEWELL_SUMMARY_URL").unwrap_or(defaults.base_url),
            api_key: lookup("NOTEWELL_SUMMARY_API_KEY").filter(|k| !k.is_empty()),
            model: lookup("NOTEWELL_SUMMARY_MODEL").unwrap_or(defaults.model),
        };

        Self {
            db_path,
            cors_origins,
            summary,
        }
    }
}

/// Where the client finds the API and which token it presents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            token: None,
        }
    }
}

impl ClientConfig {
    /// Load the stored configuration and apply environment overrides.
    /// Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        let stored = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load client config, using defaults: {:#}", e);
                Self::default()
            }
        };
        stored.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("NOTEWELL_URL") {
            self.base_url = url;
        }
        if let Some(token) = lookup("NOTEWELL_TOKEN") {
            self.token = Some(token);
        }
        self
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::read_from(&config_path)
    }

    pub fn read_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save to the user's config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = get_config_path()?;
        self.write_to(&config_path)?;
        Ok(config_path)
    }

    pub fn write_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
