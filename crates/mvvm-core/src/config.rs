//! Configuration structures for mvvm-bind.
//!
//! - [`IdConfig`] - Generated id format
//! - [`StoreConfig`] - Store diagnostics and lifecycle policy
//! - [`Config`] - Root configuration combining all settings
//!
//! Several defaults depend on the build profile: debug builds prefix generated
//! ids with the view model type name, warn on ambiguous lookups and treat
//! lifecycle violations as errors. Release builds do none of that.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What the store does when a view model reports an out-of-order lifecycle
/// transition (double mount, use after dispose).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LifecyclePolicy {
    /// Return the error to the caller.
    Strict,
    /// Log the error and carry on.
    Lenient,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Format of generated view model ids.
///
/// Generated ids look like `{prefix}_{sequence}` where `prefix` is a short
/// session-scoped token and `sequence` is zero padded to `pad_width`. With
/// `include_kind_name` the view model type name is prepended for readability;
/// uniqueness never depends on it.
///
/// # Examples
///
/// ```
/// use mvvm_core::IdConfig;
///
/// let config = IdConfig::default();
/// assert_eq!(config.pad_width, 5);
/// assert_eq!(config.include_kind_name, cfg!(debug_assertions));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    /// Prepend the short type name of the view model.
    pub include_kind_name: bool,

    /// Number of digits the sequence is padded to.
    pub pad_width: usize,

    /// Length of the random session prefix.
    pub prefix_len: usize,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            include_kind_name: cfg!(debug_assertions),
            pad_width: 5,
            prefix_len: 6,
        }
    }
}

/// Configuration for a view model store.
///
/// # Examples
///
/// ```
/// use mvvm_core::{LifecyclePolicy, StoreConfig};
///
/// let config = StoreConfig::default();
/// assert_eq!(config.event_capacity, 256);
/// assert_eq!(config.lifecycle_policy, LifecyclePolicy::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How lifecycle violations reported by view models are handled.
    pub lifecycle_policy: LifecyclePolicy,

    /// Log a warning when a kind lookup matches several live instances.
    pub warn_on_ambiguous: bool,

    /// Capacity of the store event channel.
    ///
    /// Slow subscribers that fall further behind than this miss events.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lifecycle_policy: LifecyclePolicy::default(),
            warn_on_ambiguous: cfg!(debug_assertions),
            event_capacity: 256,
        }
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use mvvm_core::Config;
///
/// let config = Config::from_json_str(r#"{"ids": {"pad_width": 3}}"#).unwrap();
/// assert_eq!(config.ids.pad_width, 3);
/// assert_eq!(config.store.event_capacity, 256);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration.
    pub store: StoreConfig,

    /// Generated id configuration.
    pub ids: IdConfig,
}

impl Config {
    /// Parses and validates a configuration from JSON.
    ///
    /// Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_std_path()).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?;
        Self::from_json_str(&contents)
    }

    /// Checks option ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=20).contains(&self.ids.pad_width) {
            return Err(ConfigError::invalid_option(
                "ids.pad_width",
                "must be between 1 and 20",
            ));
        }
        if !(1..=12).contains(&self.ids.prefix_len) {
            return Err(ConfigError::invalid_option(
                "ids.prefix_len",
                "must be between 1 and 12",
            ));
        }
        if self.store.event_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "store.event_capacity",
                "must be positive",
            ));
        }
        Ok(())
    }
}
