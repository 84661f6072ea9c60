use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UsageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Length of one batching window in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Maximum number of held-back events; `null` means unbounded.
    #[serde(default = "default_held_back_capacity")]
    pub held_back_capacity: Option<usize>,

    /// Upper bound for a single sink send in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Collector endpoint used when no sink is provided.
    #[serde(default)]
    pub collector_url: Option<String>,

    /// How long an unreachable collector is reported disconnected.
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    /// Emit the CPU/RAM observations when the reporter starts.
    #[serde(default = "default_true")]
    pub bootstrap_events: bool,

    /// Location of the persisted decision. Defaults to the user config directory.
    #[serde(default)]
    pub decision_path: Option<PathBuf>,
}

fn default_window_ms() -> u64 {
    2_000
}

fn default_held_back_capacity() -> Option<usize> {
    Some(10_000)
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_reconnect_backoff_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            held_back_capacity: default_held_back_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
            collector_url: None,
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            bootstrap_events: true,
            decision_path: None,
        }
    }
}

impl ReporterConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReporterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(invalid("window_ms must be > 0"));
        }
        if self.send_timeout_ms == 0 {
            return Err(invalid("send_timeout_ms must be > 0"));
        }
        if self.held_back_capacity == Some(0) {
            return Err(invalid("held_back_capacity must be > 0 or null"));
        }
        if let Some(url) = &self.collector_url {
            let parsed = Url::parse(url)
                .map_err(|e| invalid(&format!("collector_url {url} is malformed: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                return Err(invalid(&format!("collector_url must be http(s): {url}")));
            }
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}

fn invalid(reason: &str) -> UsageError {
    UsageError::InvalidConfig {
        reason: reason.to_string(),
    }
}
