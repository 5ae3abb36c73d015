// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for replication task execution.
//!
//! Configuration is read once when the executor is built and never changes
//! afterwards. It can be constructed programmatically or deserialized from
//! YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use history_replication::config::ReplicationConfig;
//!
//! let config = ReplicationConfig {
//!     current_cluster_name: "cluster-a".into(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicationConfig
//! ├── current_cluster_name: String   # Name of the cluster we run in
//! └── processor: ProcessorConfig     # Re-submit loop around the executor
//!     ├── max_attempts: usize
//!     ├── initial_backoff: "100ms"
//!     ├── max_backoff: "10s"
//!     └── backoff_factor: f64
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! current_cluster_name: "cluster-a"
//! processor:
//!   max_attempts: 5
//!   initial_backoff: "100ms"
//!   max_backoff: "10s"
//! ```

use crate::error::{ReplicationError, Result};
use crate::resilience::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Name of the cluster this process runs in.
    /// A domain's task is applied only if this name is in its replication config.
    pub current_cluster_name: String,

    /// Settings for the task processing loop.
    #[serde(default)]
    pub processor: ProcessorConfig,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            current_cluster_name: "active".to_string(),
            processor: ProcessorConfig::default(),
        }
    }
}

impl ReplicationConfig {
    /// Create a minimal config for testing.
    pub fn for_testing(current_cluster_name: &str) -> Self {
        Self {
            current_cluster_name: current_cluster_name.to_string(),
            processor: ProcessorConfig::for_testing(),
        }
    }

    /// Reject configs the executor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.current_cluster_name.trim().is_empty() {
            return Err(ReplicationError::Config(
                "current_cluster_name must not be empty".to_string(),
            ));
        }
        self.processor.validate()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ProcessorConfig: caller-side retry loop
// ═══════════════════════════════════════════════════════════════════════════════

/// Retry settings for the processor loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum `execute` calls per task.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Backoff before the first retry, as a duration string (e.g., "100ms").
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: String,

    /// Backoff ceiling, as a duration string (e.g., "10s").
    #[serde(default = "default_max_backoff")]
    pub max_backoff: String,

    /// Backoff multiplier per attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> usize {
    5
}

fn default_initial_backoff() -> String {
    "100ms".to_string()
}

fn default_max_backoff() -> String {
    "10s".to_string()
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: "100ms".to_string(),
            max_backoff: "10s".to_string(),
            backoff_factor: 2.0,
        }
    }
}

impl ProcessorConfig {
    /// Fast backoff for tests.
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: "1ms".to_string(),
            max_backoff: "10ms".to_string(),
            backoff_factor: 2.0,
        }
    }

    fn parse(field: &str, value: &str) -> Result<Duration> {
        humantime::parse_duration(value)
            .map_err(|e| ReplicationError::Config(format!("invalid {} {:?}: {}", field, value, e)))
    }

    /// Parse the initial backoff string to a Duration.
    pub fn initial_backoff_duration(&self) -> Result<Duration> {
        Self::parse("initial_backoff", &self.initial_backoff)
    }

    /// Parse the max backoff string to a Duration.
    pub fn max_backoff_duration(&self) -> Result<Duration> {
        Self::parse("max_backoff", &self.max_backoff)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ReplicationError::Config(
                "processor.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(ReplicationError::Config(format!(
                "processor.backoff_factor must be >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        let initial = self.initial_backoff_duration()?;
        let max = self.max_backoff_duration()?;
        if initial > max {
            return Err(ReplicationError::Config(format!(
                "processor.initial_backoff ({}) exceeds max_backoff ({})",
                self.initial_backoff, self.max_backoff
            )));
        }
        Ok(())
    }

    /// Build the backoff schedule.
    pub fn retry_config(&self) -> Result<RetryConfig> {
        self.validate()?;
        Ok(RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_backoff_duration()?,
            max_delay: self.max_backoff_duration()?,
            backoff_factor: self.backoff_factor,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
