//! Compute context configuration.
//!
//! # Example
//!
//! ```rust
//! use arraygate::core::config::ContextConfig;
//!
//! let config = ContextConfig::new()
//!     .with_host_transfer_limit(1 << 20)
//!     .with_record_invocations(true);
//! assert_eq!(config.max_stack_members, 12);
//! ```

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest window a local-array kernel (median) may hold.
pub const DEFAULT_MAX_LOCAL_ARRAY_SIZE: u64 = 1000;

/// Largest number of outputs a stack split kernel exists for.
pub const DEFAULT_MAX_STACK_MEMBERS: usize = 12;

/// Largest number of elements the host moves in one transfer call.
pub const DEFAULT_HOST_TRANSFER_LIMIT: u64 = i32::MAX as u64;

/// Limits and switches of one compute context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum element count of a median window.
    pub max_local_array_size: u64,
    /// Maximum number of outputs of a stack split.
    pub max_stack_members: usize,
    /// Arrays with more elements than this are transferred plane by plane.
    pub host_transfer_limit: u64,
    /// Whether the reference backend records every kernel invocation.
    pub record_invocations: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_local_array_size: DEFAULT_MAX_LOCAL_ARRAY_SIZE,
            max_stack_members: DEFAULT_MAX_STACK_MEMBERS,
            host_transfer_limit: DEFAULT_HOST_TRANSFER_LIMIT,
            record_invocations: false,
        }
    }
}

impl ContextConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the median window limit.
    pub fn with_max_local_array_size(mut self, size: u64) -> Self {
        self.max_local_array_size = size;
        self
    }

    /// Set the stack split limit.
    pub fn with_max_stack_members(mut self, members: usize) -> Self {
        self.max_stack_members = members;
        self
    }

    /// Set the chunking threshold in elements. Zero is raised to one.
    pub fn with_host_transfer_limit(mut self, elements: u64) -> Self {
        self.host_transfer_limit = elements.max(1);
        self
    }

    /// Enable or disable invocation recording.
    pub fn with_record_invocations(mut self, record: bool) -> Self {
        self.record_invocations = record;
        self
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ContextConfig = toml::from_str(source)?;
        let limit = config.host_transfer_limit;
        Ok(config.with_host_transfer_limit(limit))
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_toml_str(&source)
    }

    /// Serialize this configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save this configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.to_toml_string()?;
        std::fs::write(path, contents).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            error,
        })
    }
}
