//! Ephemeral mongod instances for tests.
//!
//! [`MongoServer`] owns one server process with its own port and data
//! directory; [`ReplicaSet`] starts several of them and joins them into a
//! replica set. Both are torn down best-effort with bounded waits.
mod config;
pub mod constants;
mod errors;
mod replica_set;
mod reporter;
pub mod server;
pub mod utils;

pub use crate::config::*;
pub use crate::errors::*;
pub use crate::replica_set::*;
pub use crate::reporter::*;
pub use crate::server::MongoServer;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
