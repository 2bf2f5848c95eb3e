//! Notifier configuration.
//!
//! Defaults, optionally overlaid by a JSON file, then by environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_DISABLE: &str = "WINCH_BRIDGE_DISABLE";
pub const ENV_THREAD_NAME: &str = "WINCH_BRIDGE_THREAD_NAME";

const DEFAULT_THREAD_NAME: &str = "winch-dispatch";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// When false, registration reports `PlatformUnsupported`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Name of the dispatch thread that runs callbacks.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_enabled() -> bool {
    true
}

fn default_thread_name() -> String {
    DEFAULT_THREAD_NAME.to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            thread_name: default_thread_name(),
        }
    }
}

impl NotifierConfig {
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    pub fn from_json_str(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn apply_env(self) -> Self {
        self.apply_vars(
            std::env::var(ENV_DISABLE).ok().as_deref(),
            std::env::var(ENV_THREAD_NAME).ok().as_deref(),
        )
    }

    fn apply_vars(mut self, disable: Option<&str>, thread_name: Option<&str>) -> Self {
        if let Some(value) = disable {
            if parse_flag(value) {
                self.enabled = false;
            }
        }
        if let Some(name) = thread_name.map(str::trim).filter(|n| !n.is_empty()) {
            self.thread_name = name.to_string();
        }
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
