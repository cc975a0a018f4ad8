// src/config.rs - Configuration structures

use crate::data_item::DataItem;
use crate::error::{QuarryError, Result};
use crate::level::SeverityPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// MAIN CONFIGURATION
// ============================================================================

/// Main QUARRY configuration
///
/// # Examples
///
/// ```rust
/// use quarry::Config;
///
/// let config = Config::from_yaml(r#"
/// severity:
///   unrecognized: WARNING
/// data_items:
///   - id: "spindle_cond"
///     category: CONDITION
/// "#)?;
///
/// assert_eq!(config.data_items.len(), 1);
/// assert_eq!(config.registry.first_sequence, 1);
/// # Ok::<(), quarry::QuarryError>(())
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Severity token tables
    #[serde(default)]
    pub severity: SeverityPolicy,

    /// Ingestion behaviour
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Catalog entries to register at startup
    #[serde(default)]
    pub data_items: Vec<DataItem>,
}

impl Config {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Check the configuration for inconsistencies
    pub fn validate(&self) -> Result<()> {
        self.severity.validate()?;
        self.registry.validate()?;

        if self.logging.filter.trim().is_empty() {
            return Err(QuarryError::Config("Logging filter must not be empty".to_string()));
        }

        let mut ids = HashSet::new();
        for item in &self.data_items {
            if item.id.trim().is_empty() {
                return Err(QuarryError::Config("Data item id must not be empty".to_string()));
            }
            if !ids.insert(item.id.as_str()) {
                return Err(QuarryError::Config(format!(
                    "Duplicate data item id '{}'",
                    item.id
                )));
            }
            if let Some(conversion) = item.conversion {
                if !conversion.factor.is_finite() || !conversion.offset.is_finite() {
                    return Err(QuarryError::Config(format!(
                        "Data item '{}' has a non-finite conversion",
                        item.id
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// LOGGING CONFIGURATION
// ============================================================================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            ansi: default_true(),
        }
    }
}

// ============================================================================
// REGISTRY CONFIGURATION
// ============================================================================

/// Ingestion configuration for [`SourceRegistry`](crate::SourceRegistry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Sequence number assigned to the first observation
    #[serde(default = "default_first_sequence")]
    pub first_sequence: u64,

    /// Start a fresh chain when a source reports NORMAL without a native code
    #[serde(default = "default_true")]
    pub reset_on_clear: bool,
}

impl RegistryConfig {
    fn validate(&self) -> Result<()> {
        if self.first_sequence == 0 {
            return Err(QuarryError::Config(
                "first_sequence must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            first_sequence: default_first_sequence(),
            reset_on_clear: default_true(),
        }
    }
}

// ============================================================================
// DEFAULTS
// ============================================================================

fn default_log_filter() -> String {
    "quarry=info".to_string()
}

fn default_first_sequence() -> u64 {
    1
}

fn default_true() -> bool {
    true
}
