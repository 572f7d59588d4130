//! Configuration file for the logspan CLI
//!
//! All keys are optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! max_events = 1000
//! page_size = 100
//! poll_interval_ms = 1000
//! state_file = "/home/me/.logspan/state.json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use logspan_logs::{DEFAULT_MAX_EVENTS, DEFAULT_PAGE_SIZE, LogStoreConfig};

/// Default delay between refreshes in follow mode
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Events kept per workspace
    pub max_events: usize,

    /// Events requested per fetch
    pub page_size: usize,

    /// Delay between refreshes in follow mode
    pub poll_interval_ms: u64,

    /// JSON key-value file holding the hidden log list
    pub state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            state_file: None,
        }
    }
}

impl Config {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        Ok(config)
    }

    pub fn store_config(&self) -> LogStoreConfig {
        LogStoreConfig {
            max_events: self.max_events,
            page_size: self.page_size,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
