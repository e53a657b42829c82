//! # Configuration
//!
//! Racestage reads an optional TOML file (default `racestage.toml`):
//!
//! ```toml
//! [data_api]
//! base_url = "http://localhost:5000/middleware"
//! timeout_secs = 30
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [splits]
//! min_number = 100
//! max_number = 1000
//! ```
//!
//! A missing file means all defaults. `RACESTAGE_DATA_API_URL` overrides
//! `data_api.base_url` after the file is read.

use racestage_core::StageError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the data provider base URL.
pub const DATA_API_URL_ENV: &str = "RACESTAGE_DATA_API_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RacestageConfig {
    pub data_api: DataApiConfig,
    pub server: ServerConfig,
    pub splits: SplitRange,
}

/// Where race data is fetched from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataApiConfig {
    /// Base URL without trailing slash, e.g. `https://timing.example/middleware`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/middleware".to_string(),
            timeout_secs: 30,
        }
    }
}

impl DataApiConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP bind address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Split numbers that count as race stages (both bounds exclusive).
///
/// The provider also reports start, finish-line and bookkeeping splits
/// outside this range; those are not checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitRange {
    pub min_number: u32,
    pub max_number: u32,
}

impl Default for SplitRange {
    fn default() -> Self {
        Self {
            min_number: 100,
            max_number: 1000,
        }
    }
}

impl SplitRange {
    #[must_use]
    pub fn contains(&self, number: u32) -> bool {
        number > self.min_number && number < self.max_number
    }
}

impl RacestageConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, StageError> {
        toml::from_str(text).map_err(|e| StageError::SerializationError(e.to_string()))
    }

    /// Load `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, StageError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|e| {
                StageError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
            })?;
            Self::from_toml(&text)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(url) = std::env::var(DATA_API_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
        {
            tracing::info!("Data API URL overridden by {}", DATA_API_URL_ENV);
            self.data_api.base_url = url;
        }
        self.data_api.base_url = self.data_api.base_url.trim_end_matches('/').to_string();
    }
}

// =============================================================================
// TESTS
// =============================================================================
