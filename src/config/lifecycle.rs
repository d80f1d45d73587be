use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Time bounds on instance start and stop
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LifecycleConfig {
    /// Bound on one full start attempt, readiness included
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,

    /// Bound on teardown; cleanup still running afterwards is abandoned
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Start attempts before giving up (0 means unlimited attempts)
    #[serde(default = "default_max_start_attempts")]
    pub max_start_attempts: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: default_start_timeout_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            max_start_attempts: default_max_start_attempts(),
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "lifecycle.start_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.stop_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "lifecycle.stop_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

fn default_start_timeout_ms() -> u64 {
    10_000
}
fn default_stop_timeout_ms() -> u64 {
    15_000
}
fn default_max_start_attempts() -> usize {
    3
}
