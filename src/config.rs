//! Service configuration: defaults, optional JSON file, env overrides

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matching::DEFAULT_SIMILARITY_THRESHOLD;

pub const CONFIG_PATH_ENV: &str = "DEAL_AGGREGATOR_CONFIG";
pub const BIND_ENV: &str = "DEAL_AGGREGATOR_BIND";
pub const THRESHOLD_ENV: &str = "DEAL_AGGREGATOR_SIMILARITY_THRESHOLD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub search: SearchConfig,
    /// JSON coupon seed; the built-in catalog is used when absent.
    pub coupon_seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub source_timeout_secs: u64,
    pub search_deadline_secs: u64,
    pub similarity_threshold: f64,
    pub max_results_per_source: usize,
    /// Simulated latency range of the mock marketplaces, in milliseconds.
    pub mock_latency_ms: (u64, u64),
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source_timeout_secs: 10,
            search_deadline_secs: 30,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_results_per_source: 5,
            mock_latency_ms: (500, 1500),
        }
    }
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn search_deadline(&self) -> Duration {
        Duration::from_secs(self.search_deadline_secs)
    }

    pub fn mock_latency(&self) -> std::ops::Range<Duration> {
        let (low, high) = self.mock_latency_ms;
        Duration::from_millis(low)..Duration::from_millis(high)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_timeout_secs == 0 {
            return Err(ConfigError::Invalid("source_timeout_secs must be positive".into()));
        }
        if self.search_deadline_secs == 0 {
            return Err(ConfigError::Invalid("search_deadline_secs must be positive".into()));
        }
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be within 0..=100, got {}",
                self.similarity_threshold
            )));
        }
        if self.mock_latency_ms.0 > self.mock_latency_ms.1 {
            return Err(ConfigError::Invalid("mock_latency_ms range is inverted".into()));
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the file named by `DEAL_AGGREGATOR_CONFIG`, then the
    /// individual env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind_addr = bind;
        }

        if let Some(raw) = lookup(THRESHOLD_ENV) {
            self.search.similarity_threshold =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    key: THRESHOLD_ENV,
                    value: raw.clone(),
                })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr must not be empty".into()));
        }
        self.search.validate()
    }
}
