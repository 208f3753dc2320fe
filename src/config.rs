//! Dashboard Configuration
//!
//! Defaults, then an optional JSON file named by `LINEWATCH_CONFIG`, then
//! individual environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_PATH_VAR: &str = "LINEWATCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the line server
    pub server_url: String,
    /// Path of the server-sent event stream
    pub push_path: String,
    pub poll_interval_secs: u64,
    pub reconnect_delay_secs: u64,
    pub notice_ttl_secs: u64,
    pub notice_capacity: usize,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub video_feed_path: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            push_path: "/events".to_string(),
            poll_interval_secs: 5,
            reconnect_delay_secs: 3,
            notice_ttl_secs: 5,
            notice_capacity: 8,
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            video_feed_path: "/video_feed".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Resolve the configuration from the process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `LINEWATCH_*` overrides found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LINEWATCH_SERVER_URL") {
            self.server_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("LINEWATCH_POLL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.poll_interval_secs = secs,
                Err(_) => warn!("Ignoring LINEWATCH_POLL_SECS={:?}: not a number", raw),
            }
        }
        if let Some(dir) = lookup("LINEWATCH_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("LINEWATCH_LOG_LEVEL") {
            self.log_level = level.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs < 1 {
            bail!("poll_interval_secs must be at least 1");
        }
        if self.notice_ttl_secs < 1 {
            bail!("notice_ttl_secs must be at least 1");
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            bail!("server_url must start with http:// or https://, got {:?}", self.server_url);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}
