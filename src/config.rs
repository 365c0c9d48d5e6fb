use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

/// Root configuration structure, deserialized from `.go-license-checkr/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Lookup service and throttling settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Settings for the license fetcher.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the lookup service. Requests are pinned to its host.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Minimum spacing between two lookup starts, in milliseconds.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    /// Maximum number of lookups in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Hard timeout for a whole request, body included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Capacity of the result stream before workers block.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Emit per-lookup response details. Set from `--debug`, never from the file.
    #[serde(skip)]
    pub debug: bool,
}

fn default_base_url() -> String {
    "https://pkg.go.dev".to_string()
}

fn default_request_interval_ms() -> u64 {
    1000
}

fn default_max_concurrent() -> usize {
    2
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_channel_capacity() -> usize {
    4
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: default_base_url(),
            request_interval_ms: default_request_interval_ms(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
            channel_capacity: default_channel_capacity(),
            debug: false,
        }
    }
}

impl FetchConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<project_path>/.go-license-checkr/config.toml`
/// 3. `~/.config/go-license-checkr/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".go-license-checkr").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("go-license-checkr")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
