//! Error hierarchy for provisioning and tearing down test instances.
//!
//! Start-phase failures are surfaced as [`Error`] values and turned into fatal
//! reports by whoever owns a [`crate::Reporter`]. Stop-phase failures never
//! reach this type; teardown only logs them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No ephemeral port could be obtained from the OS
    #[error("Failed to allocate a free port: {0}")]
    Allocation(#[source] io::Error),

    /// Temp directory or config file creation failures
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server binary could not be launched
    #[error("Failed to spawn {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Readiness marker never observed within the bounded retry window
    #[error("Server not ready after {attempts} attempt(s) of {timeout:?} each")]
    ReadinessTimeout { attempts: usize, timeout: Duration },

    /// Replica set formation failed or never succeeded
    #[error("Cluster initialization failed: {0}")]
    ClusterInit(String),

    /// The member refused a replica set command it may accept once it has
    /// finished starting up
    #[error("Not yet ready: {0}")]
    NotYetReady(String),

    /// Client dial or command failures
    #[error(transparent)]
    Client(#[from] mongodb::error::Error),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Readiness was awaited on an instance whose process was never spawned
    #[error("Server process was never launched")]
    NotLaunched,

    #[error("Retry timeout")]
    RetryTimeout,

    #[error("{0}")]
    RetryTaskFailed(String),
}

impl Error {
    /// Whether repeating the operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::NotYetReady(_) | Error::RetryTimeout)
    }
}
