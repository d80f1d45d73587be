// -
// Readiness protocol

/// Emitted by mongod on stdout once it accepts client connections
pub const READINESS_MARKER: &[u8] = b"waiting for connections on port";

// -
// Process environment

/// Forces locale-independent collation in the child
pub(crate) const LOCALE_ENV: (&str, &str) = ("LC_ALL", "C");

/// Set to `1` to mirror child output to our own stdout/stderr
pub const VERBOSE_ENV: &str = "MONGO_HARNESS_VERBOSE";

/// Optional TOML file layered over the defaults
pub(crate) const CONFIG_PATH_ENV: &str = "MONGO_HARNESS_CONFIG";

/// Prefix for `MONGO_HARNESS__SECTION__KEY` overrides
pub(crate) const CONFIG_ENV_PREFIX: &str = "MONGO_HARNESS";

// -
// Naming

pub(crate) const LOOPBACK: &str = "127.0.0.1";

pub(crate) const DATA_DIR_PREFIX: &str = "mongo-harness-dbpath-";

pub(crate) const CONFIG_FILE_PREFIX: &str = "config-";

/// Shared name of every replica set we form
pub const REPLICA_SET_NAME: &str = "rs";

/// Upper bound for the test label embedded in directory names
pub(crate) const MAX_LABEL_LEN: usize = 64;

// -
// Server replies

/// `AlreadyInitialized`: a previous replSetInitiate already went through
pub(crate) const ALREADY_INITIALIZED_CODE: i32 = 23;

/// Replies from a member that is still starting up: `NodeNotFound` (a peer
/// is not reachable yet), `NotYetInitialized`, `NotPrimaryOrSecondary`
pub(crate) const NOT_YET_READY_CODES: &[i32] = &[74, 94, 13436];
