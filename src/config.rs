//! Engine configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. built-in defaults
//! 2. a YAML file, when a path is given
//! 3. environment variables prefixed with `DYNAMO_REPLICATE__`, using `__`
//!    as the nesting separator (e.g. `DYNAMO_REPLICATE__RETRY__RETRY_LIMIT=5`)

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "DYNAMO_REPLICATE";

/// Default delay before the first retry of unprocessed items
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
/// Default number of retries of unprocessed items per batch
pub const DEFAULT_RETRY_LIMIT: u32 = 10;
/// Default number of items requested per scan page
pub const DEFAULT_SCAN_PAGE_SIZE: u32 = 1000;

/// Retry and paging policy, supplied once when the engine is built
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Lower bound of the randomized delay before a retry
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,
    /// Maximum number of retries after the first batched write
    pub retry_limit: u32,
    /// Maximum number of items per scan page
    pub scan_page_size: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

impl RetryPolicy {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scan_page_size == 0 {
            return Err(Error::InvalidConfig(
                "scan_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Retry and paging policy
    pub retry: RetryPolicy,
    /// DynamoDB endpoint override (LocalStack, DynamoDB Local)
    pub endpoint_url: Option<String>,
}

impl Settings {
    /// Load settings from defaults, an optional YAML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.retry.validate()?;
        Ok(settings)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
