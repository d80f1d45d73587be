//! End-to-end tests against a real server binary.
//!
//! They need a mongod that still accepts the MMAPv1-era options in the
//! generated config (3.x or older) on `PATH`, or named through
//! `MONGO_HARNESS__SERVER__BINARY`. Run with `cargo test -- --ignored`.
mod common;
mod replica_set;
mod server_lifecycle;
