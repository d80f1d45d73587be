//! Multi-member variant: N instances started together and joined into one
//! replica set.
mod initiator;
mod replica_set;

pub use initiator::*;
pub use replica_set::*;
