//! Single-instance lifecycle: config rendering, readiness detection and the
//! process controller built on top of them.
pub mod config_file;
pub(crate) mod label;
mod mongo_server;
pub mod readiness;

pub use mongo_server::*;
