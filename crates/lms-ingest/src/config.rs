//! Loader configuration
//!
//! Store settings come from the environment (optionally seeded from a `.env`
//! file by the binary); pipeline settings come from the command line.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Defaults
// ============================================================================

/// Region of the LMS table
pub const DEFAULT_REGION: &str = "us-west-2";

/// Target table
pub const DEFAULT_TABLE_NAME: &str = "lms_assignments";

/// Upper bound on concurrent writes
pub const DEFAULT_MAX_IN_FLIGHT: usize = 25;

/// SDK attempts per write; 1 leaves retrying to whoever re-runs the load
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is set but {1} is missing; provide both or neither")]
    IncompleteCredentials(&'static str, &'static str),
}

/// Static credentials read from the standard AWS variables
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// Connection settings for the DynamoDB table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub region: String,
    pub table_name: String,
    /// Endpoint override, e.g. DynamoDB Local
    pub endpoint: Option<String>,
    /// `None` falls back to the SDK's default credential chain
    pub credentials: Option<StaticCredentials>,
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            endpoint: None,
            credentials: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl StoreConfig {
    /// Load from environment variables
    ///
    /// - `AWS_REGION` (default `us-west-2`)
    /// - `LMS_TABLE_NAME` (default `lms_assignments`)
    /// - `DYNAMODB_ENDPOINT`
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`
    /// - `LMS_MAX_ATTEMPTS` (default 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
                session_token: var("AWS_SESSION_TOKEN"),
            }),
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials(
                    "AWS_ACCESS_KEY_ID",
                    "AWS_SECRET_ACCESS_KEY",
                ))
            },
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials(
                    "AWS_SECRET_ACCESS_KEY",
                    "AWS_ACCESS_KEY_ID",
                ))
            },
            (None, None) => None,
        };

        let max_attempts = match var("LMS_MAX_ATTEMPTS") {
            Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "LMS_MAX_ATTEMPTS",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let config = Self {
            region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            table_name: var("LMS_TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            endpoint: var("DYNAMODB_ENDPOINT"),
            credentials,
            max_attempts,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(mut self, access_key_id: &str, secret_access_key: &str) -> Self {
        self.credentials = Some(StaticCredentials {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        });
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LMS_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "LMS_TABLE_NAME",
                value: self.table_name.clone(),
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

/// Pipeline settings for one run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Stop after this many items were handed to the writer (`None` = whole file)
    pub max_items: Option<u64>,
    /// Writes allowed in flight at once
    pub max_in_flight: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_items: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop early, for trial loads against very large extracts
    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_in_flight",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
