//! Fatal-failure sink supplied by the caller.
//!
//! A failed start is expected to abort whatever is using the instance, so the
//! single operation never returns.

use std::sync::Arc;

use tracing::error;

pub trait Reporter: Send + Sync + 'static {
    /// Reports an unrecoverable failure and aborts the caller.
    fn fatal(
        &self,
        message: &str,
    ) -> !;
}

/// Fails the current Rust test by panicking.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicReporter;

impl PanicReporter {
    pub fn shared() -> Arc<dyn Reporter> {
        Arc::new(PanicReporter)
    }
}

impl Reporter for PanicReporter {
    fn fatal(
        &self,
        message: &str,
    ) -> ! {
        panic!("{message}")
    }
}

/// Logs the failure and exits the process; for non-test use.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitReporter;

impl ExitReporter {
    pub fn shared() -> Arc<dyn Reporter> {
        Arc::new(ExitReporter)
    }
}

impl Reporter for ExitReporter {
    fn fatal(
        &self,
        message: &str,
    ) -> ! {
        error!("fatal: {}", message);
        eprintln!("fatal: {message}");
        std::process::exit(1)
    }
}
