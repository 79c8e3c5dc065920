//! Collector configuration (TOML) and API credentials.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Credentials never live in the config file; they come from
//! the environment.

use crate::data::backoff::RetryPolicy;
use crate::data::batch::MAX_GROUP_SIZE;
use crate::data::datalab::DEFAULT_ENDPOINT;
use crate::data::plan::{PlanOptions, DEFAULT_HORIZON_DAYS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CLIENT_ID_VAR: &str = "NAVER_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "NAVER_CLIENT_SECRET";

/// Configuration errors. Always fatal, raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    pub collector: CollectorSection,
    pub api: ApiSection,
    pub retry: RetrySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorSection {
    /// Earliest date the trend API serves.
    pub lower_bound: NaiveDate,
    /// Days collected after each reference date.
    pub horizon_days: u32,
    /// Catalog rows with an earlier reference date are ignored.
    pub catalog_cutoff: NaiveDate,
    pub max_group_size: usize,
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            lower_bound: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or(NaiveDate::MIN),
            horizon_days: DEFAULT_HORIZON_DAYS,
            catalog_cutoff: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN),
            max_group_size: MAX_GROUP_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: u32,
    pub initial_backoff_secs: f64,
    pub max_backoff_secs: f64,
    pub pacing_secs: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_backoff_secs: 1.0,
            max_backoff_secs: 30.0,
            pacing_secs: 0.8,
        }
    }
}

impl CollectorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.collector;
        if !(1..=MAX_GROUP_SIZE).contains(&c.max_group_size) {
            return Err(ConfigError::Invalid {
                field: "collector.max_group_size",
                reason: format!("must be between 1 and {MAX_GROUP_SIZE}, got {}", c.max_group_size),
            });
        }
        if c.horizon_days == 0 {
            return Err(ConfigError::Invalid {
                field: "collector.horizon_days",
                reason: "must be positive".into(),
            });
        }
        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api.endpoint",
                reason: "must not be empty".into(),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "api.timeout_secs",
                reason: "must be positive".into(),
            });
        }

        let r = &self.retry;
        seconds("retry.initial_backoff_secs", r.initial_backoff_secs)?;
        seconds("retry.max_backoff_secs", r.max_backoff_secs)?;
        seconds("retry.pacing_secs", r.pacing_secs)?;
        if r.initial_backoff_secs <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "retry.initial_backoff_secs",
                reason: "must be positive".into(),
            });
        }
        if r.max_backoff_secs < r.initial_backoff_secs {
            return Err(ConfigError::Invalid {
                field: "retry.max_backoff_secs",
                reason: format!(
                    "must be at least initial_backoff_secs ({})",
                    r.initial_backoff_secs
                ),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let r = &self.retry;
        Ok(RetryPolicy {
            max_retries: r.max_retries,
            initial_backoff: seconds("retry.initial_backoff_secs", r.initial_backoff_secs)?,
            max_backoff: seconds("retry.max_backoff_secs", r.max_backoff_secs)?,
            pacing: seconds("retry.pacing_secs", r.pacing_secs)?,
        })
    }

    pub fn plan_options(&self, today: NaiveDate) -> PlanOptions {
        PlanOptions {
            lower_bound: self.collector.lower_bound,
            today,
            horizon_days: self.collector.horizon_days,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

fn seconds(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{secs} is not a valid duration: {e}"),
    })
}

/// DataLab API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read `NAVER_CLIENT_ID` / `NAVER_CLIENT_SECRET` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup. Blank values
    /// count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingCredential(key))
        };
        Ok(Self {
            client_id: get(CLIENT_ID_VAR)?,
            client_secret: get(CLIENT_SECRET_VAR)?,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
