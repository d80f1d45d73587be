use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts (0 means unlimited retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single operation timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl BackoffPolicy {
    pub fn validate(
        &self,
        name: &str,
    ) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig(format!(
                "retry.{name}.timeout_ms must be greater than 0"
            )));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::InvalidConfig(format!(
                "retry.{name}.base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Divide strategies by replica set formation phase
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryPolicies {
    // replSetInitiate against the first member
    #[serde(default = "default_cluster_init")]
    pub cluster_init: BackoffPolicy,

    // Polling the first member until it reports itself primary
    #[serde(default = "default_primary_wait")]
    pub primary_wait: BackoffPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            cluster_init: default_cluster_init(),
            primary_wait: default_primary_wait(),
        }
    }
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        self.cluster_init.validate("cluster_init")?;
        self.primary_wait.validate("primary_wait")?;
        Ok(())
    }
}

fn default_cluster_init() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 10,
        timeout_ms: 10_000,
        base_delay_ms: 100,
        max_delay_ms: 2_000,
    }
}
fn default_primary_wait() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 60,
        timeout_ms: 2_000,
        base_delay_ms: 250,
        max_delay_ms: 1_000,
    }
}
fn default_max_retries() -> usize {
    3
}
fn default_op_timeout_ms() -> u64 {
    100
}
fn default_base_delay_ms() -> u64 {
    50
}
fn default_max_delay_ms() -> u64 {
    1000
}
