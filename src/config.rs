use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tracing::info;

/// Env var that overrides `api.base_url`.
pub const API_URL_ENV: &str = "READINESS_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub questionnaire: Questionnaire,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_rows")]
    pub rows: usize,
}

fn default_preview_rows() -> usize {
    20
}

/// Integration-posture answers sent along with the analyze call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire {
    #[serde(default = "yes")]
    pub webhooks: bool,
    #[serde(default)]
    pub sandbox_env: bool,
    #[serde(default = "yes")]
    pub retries: bool,
}

fn yes() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            rows: default_preview_rows(),
        }
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self {
            webhooks: true,
            sandbox_env: false,
            retries: true,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config file if it exists, otherwise use defaults. The API
    /// URL env var wins over both.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            info!(path = %path.display(), "Loading config");
            Self::load(path)?
        } else {
            info!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            cfg.apply_api_url(&url);
        }
        Ok(cfg)
    }

    fn apply_api_url(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
    }
}
