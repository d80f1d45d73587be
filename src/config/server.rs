use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::VERBOSE_ENV;
use crate::Error;
use crate::Result;

/// How the server binary is located and invoked
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Binary name (resolved through `PATH`) or absolute path
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Passes `--setParameter enableTestCommands=1`
    #[serde(default = "default_enable_test_commands")]
    pub enable_test_commands: bool,

    /// Mirror child stdout/stderr to ours
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            enable_test_commands: default_enable_test_commands(),
            verbose: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("server.binary cannot be empty".into()));
        }
        Ok(())
    }

    /// Verbose when configured, or when `MONGO_HARNESS_VERBOSE=1`
    pub fn is_verbose(&self) -> bool {
        self.verbose || env::var(VERBOSE_ENV).map(|v| v == "1").unwrap_or(false)
    }

    /// Arguments passed after the binary name
    pub(crate) fn args(
        &self,
        config_file: &std::path::Path,
    ) -> Vec<std::ffi::OsString> {
        let mut args = vec!["--config".into(), config_file.as_os_str().to_owned()];
        if self.enable_test_commands {
            args.push("--setParameter".into());
            args.push("enableTestCommands=1".into());
        }
        args
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("mongod")
}
fn default_enable_test_commands() -> bool {
    true
}
