//! Shared fixtures for unit tests.
mod common;
mod fake_server;

pub use common::*;
pub use fake_server::*;
