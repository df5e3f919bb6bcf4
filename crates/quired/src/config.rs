//! TOML configuration for the Quire daemon.
//!
//! Every section is optional. Missing values fall back to defaults that run a
//! throwaway test log under `/tmp/log` on port 2024.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quire_engine::EngineConfig;
use serde::Deserialize;

/// Signer key used when none is configured. Test use only.
pub const DEFAULT_SIGNER: &str =
    "PRIVATE+KEY+Test-Betty+df84580a+Afge8kCzBXU7jb3cV2Q363oNXCufJ6u9mjOY1BGRY9E2";

/// Verifier key matching [`DEFAULT_SIGNER`].
pub const DEFAULT_VERIFIER: &str =
    "Test-Betty+df84580a+AQQASqPUZoIHcJAF5mBOryctwFdTV1E0GRY4kEAtTzwB";

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// HTTP front-end.
    pub server: ServerSection,
    /// Log storage and batching.
    pub storage: StorageSection,
    /// Checkpoint keys.
    pub keys: KeysSection,
    /// Periodic stats logging.
    pub stats: StatsSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[server]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address for the HTTP API.
    pub listen_addr: String,
    /// Largest accepted `POST /add` body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:2024".to_string(),
            max_body_bytes: quire_http::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Log root: the checkpoint and entry tree live here.
    pub path: PathBuf,
    /// Entries per batch.
    pub batch_size: usize,
    /// Longest an entry waits for its batch to fill, in milliseconds.
    pub batch_max_age_ms: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/log"),
            batch_size: 1,
            batch_max_age_ms: 100,
        }
    }
}

/// `[keys]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeysSection {
    /// Note signer key (`PRIVATE+KEY+<name>+<hash>+<key>`).
    pub signer: String,
    /// Note verifier key (`<name>+<hash>+<key>`).
    pub verifier: String,
}

impl Default for KeysSection {
    fn default() -> Self {
        Self {
            signer: DEFAULT_SIGNER.to_string(),
            verifier: DEFAULT_VERIFIER.to_string(),
        }
    }
}

/// `[stats]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatsSection {
    /// Interval between stats lines, in milliseconds.
    pub interval_ms: u64,
}

impl Default for StatsSection {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Batching parameters for the log engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.storage.batch_size,
            batch_max_age: Duration::from_millis(self.storage.batch_max_age_ms),
        }
    }

    /// Interval between stats lines. Never zero.
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats.interval_ms.max(1))
    }

    /// Whether the built-in test keys are in use.
    pub fn uses_default_keys(&self) -> bool {
        self.keys.signer == DEFAULT_SIGNER
    }
}
