// src/level.rs - Severity level classification
//
// Maps decoded alarm and condition payloads onto NORMAL / WARNING / FAULT.
// Token tables live in a `SeverityPolicy` so deployments can extend them from
// configuration; the built-in defaults match the tokens adapters send today.

use crate::codec::Payload;
use crate::error::{QuarryError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Severity level of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    /// Nothing outstanding
    Normal,
    /// Attention required
    Warning,
    /// Fault present
    Fault,
}

impl Level {
    /// Number of distinct levels
    pub const COUNT: usize = 3;

    /// Wire spelling of the level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Normal => "NORMAL",
            Level::Warning => "WARNING",
            Level::Fault => "FAULT",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Level::Normal),
            "WARNING" => Ok(Level::Warning),
            "FAULT" => Ok(Level::Fault),
            other => Err(QuarryError::Config(format!("Unknown level '{}'", other))),
        }
    }
}

static DEFAULT_POLICY: Lazy<Arc<SeverityPolicy>> = Lazy::new(|| Arc::new(SeverityPolicy::default()));

/// Token tables used to classify severities and alarm states
///
/// Matching trims surrounding whitespace and ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    /// Tokens classified as FAULT
    #[serde(default = "default_fault_tokens")]
    pub fault: Vec<String>,

    /// Tokens classified as WARNING
    #[serde(default = "default_warning_tokens")]
    pub warning: Vec<String>,

    /// Tokens classified as NORMAL; for alarms these are the cleared states
    #[serde(default = "default_normal_tokens")]
    pub normal: Vec<String>,

    /// Level assigned to any token not in the tables above
    #[serde(default = "default_unrecognized")]
    pub unrecognized: Level,
}

impl SeverityPolicy {
    /// Process-wide policy with the built-in token tables
    pub fn shared_default() -> Arc<SeverityPolicy> {
        Arc::clone(&DEFAULT_POLICY)
    }

    /// Look a token up in the tables, `None` if it is not listed
    pub fn lookup(&self, token: &str) -> Option<Level> {
        let token = token.trim();
        let listed = |table: &[String]| table.iter().any(|t| t.eq_ignore_ascii_case(token));

        if listed(&self.fault) {
            Some(Level::Fault)
        } else if listed(&self.warning) {
            Some(Level::Warning)
        } else if listed(&self.normal) {
            Some(Level::Normal)
        } else {
            None
        }
    }

    /// Classify a single severity token
    ///
    /// POLICY: a token that is not in any table is reported at
    /// `self.unrecognized`, which defaults to FAULT. An anomaly the agent does
    /// not understand stays visible to clients instead of reading as NORMAL.
    /// This is an alerting decision, not a parsing guarantee; changing the
    /// default changes what operators see.
    pub fn classify_token(&self, token: &str) -> Level {
        match self.lookup(token) {
            Some(level) => level,
            None => {
                warn!(token, level = %self.unrecognized, "unrecognized severity token");
                self.unrecognized
            }
        }
    }

    /// Classify a decoded payload
    ///
    /// Scalar payloads are always NORMAL. Alarms whose state is a cleared
    /// token are NORMAL regardless of severity; otherwise the severity decides.
    pub fn classify(&self, payload: &Payload) -> Level {
        match payload {
            Payload::Scalar(_) => Level::Normal,
            Payload::Alarm(alarm) => {
                if self.lookup(&alarm.state) == Some(Level::Normal) {
                    Level::Normal
                } else {
                    self.classify_token(&alarm.severity)
                }
            }
            Payload::Condition(condition) => self.classify_token(&condition.severity),
        }
    }

    /// Check the tables are usable
    pub fn validate(&self) -> Result<()> {
        let tables = [("fault", &self.fault), ("warning", &self.warning), ("normal", &self.normal)];

        for (name, table) in tables {
            if table.is_empty() {
                return Err(QuarryError::Config(format!(
                    "Severity table '{}' must list at least one token",
                    name
                )));
            }
            if let Some(blank) = table.iter().find(|t| t.trim().is_empty()) {
                return Err(QuarryError::Config(format!(
                    "Severity table '{}' contains a blank token {:?}",
                    name, blank
                )));
            }
        }

        for (i, (name, table)) in tables.iter().enumerate() {
            for (other_name, other) in tables.iter().skip(i + 1) {
                if let Some(dup) = table
                    .iter()
                    .find(|t| other.iter().any(|o| o.trim().eq_ignore_ascii_case(t.trim())))
                {
                    return Err(QuarryError::Config(format!(
                        "Severity token '{}' is listed as both {} and {}",
                        dup, name, other_name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            fault: default_fault_tokens(),
            warning: default_warning_tokens(),
            normal: default_normal_tokens(),
            unrecognized: default_unrecognized(),
        }
    }
}

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

fn default_fault_tokens() -> Vec<String> {
    tokens(&["FAULT", "ERROR", "CRITICAL"])
}

fn default_warning_tokens() -> Vec<String> {
    tokens(&["WARNING", "WARN"])
}

fn default_normal_tokens() -> Vec<String> {
    tokens(&["NORMAL", "OK", "CLEARED", "CLEAR"])
}

fn default_unrecognized() -> Level {
    Level::Fault
}
