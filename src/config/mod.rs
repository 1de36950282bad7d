use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::validate_and_normalize_url;

pub mod credentials;

pub use credentials::{CredentialStore, EnvCredentials, StaticCredentials, API_KEY_ENV};

/// Mobile Safari user agent; the share endpoints serve the embedded state only to mobile clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) EdgiOS/121.0.2277.107 Version/17.0 Mobile/15E148 Safari/604.1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DashScope recognition service settings
    pub dashscope: DashscopeConfig,

    /// Douyin scraping settings
    pub douyin: DouyinConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashscopeConfig {
    /// API key; the `DASHSCOPE_API_KEY` environment variable wins over this
    pub api_key: Option<String>,

    /// API root, e.g. https://dashscope.aliyuncs.com/api/v1
    pub base_url: String,

    /// Model used when an item does not name one
    pub default_model: String,

    /// Seconds between task status checks
    pub poll_interval_secs: u64,

    /// Status checks before giving up on a task
    pub max_poll_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DouyinConfig {
    pub user_agent: String,

    /// Share page prefix; the video id is appended as the last path segment
    pub share_page_url: String,

    /// Timeout for the share-link redirect lookup
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: String,
}

impl Default for DashscopeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://dashscope.aliyuncs.com/api/v1".to_string(),
            default_model: "paraformer-v2".to_string(),
            poll_interval_secs: 2,
            max_poll_attempts: 900,
        }
    }
}

impl Default for DouyinConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            share_page_url: "https://www.iesdouyin.com/share/video".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_format: "json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the given path, the usual locations, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        tracing::debug!("Loading config from {}", config_path.display());
        let content = fs_err::read_to_string(&config_path)
            .context("Failed to read config file")?;

        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("douyin-transcript.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("douyin-transcript").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        validate_and_normalize_url(&self.dashscope.base_url)
            .context("dashscope.base_url is not a valid URL")?;
        validate_and_normalize_url(&self.douyin.share_page_url)
            .context("douyin.share_page_url is not a valid URL")?;

        if self.dashscope.poll_interval_secs == 0 {
            anyhow::bail!("dashscope.poll_interval_secs must be greater than zero");
        }
        if self.dashscope.max_poll_attempts == 0 {
            anyhow::bail!("dashscope.max_poll_attempts must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  DashScope URL: {}", self.dashscope.base_url);
        println!("  Default Model: {}", self.dashscope.default_model);
        println!(
            "  API Key: {}",
            if self.dashscope.api_key.is_some() { "configured" } else { "not set" }
        );
        println!(
            "  Polling: every {}s, at most {} checks",
            self.dashscope.poll_interval_secs, self.dashscope.max_poll_attempts
        );
        println!("  Share Page: {}", self.douyin.share_page_url);
        println!("  Default Format: {}", self.app.default_output_format);
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.dashscope.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.douyin.request_timeout_secs)
    }
}
