//! Stand-in mongod binaries written as POSIX shell scripts.
//!
//! Each script receives `--config <file> ...` like the real server and runs
//! with the config file's directory (the data directory) as a scratch area.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Prints some startup noise, then the readiness marker split across two
/// writes, then idles. Records its arguments and `LC_ALL` next to the config.
const READY_SCRIPT: &str = r#"#!/bin/sh
dir=$(dirname "$2")
echo "$@" > "$dir/args"
echo "$LC_ALL" > "$dir/locale"
echo "[initandlisten] MongoDB starting"
printf '[initandlisten] waiting for conne'
sleep 0.05
printf 'ctions on port 12345\n'
exec sleep 60
"#;

/// Never becomes ready.
const SILENT_SCRIPT: &str = r#"#!/bin/sh
exec sleep 60
"#;

pub struct FakeServer {
    // keeps the script alive for the duration of the test
    _dir: TempDir,
    pub binary: PathBuf,
}

impl FakeServer {
    pub fn ready() -> Self {
        Self::with_script("fake-mongod-ready", READY_SCRIPT)
    }

    pub fn silent() -> Self {
        Self::with_script("fake-mongod-silent", SILENT_SCRIPT)
    }

    /// A path inside a live temp dir that does not exist
    pub fn missing() -> Self {
        let dir = TempDir::new().unwrap();
        let binary = dir.path().join("no-such-mongod");
        Self { _dir: dir, binary }
    }

    fn with_script(
        name: &str,
        body: &str,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let binary = dir.path().join(name);
        fs::write(&binary, body).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        }
        Self { _dir: dir, binary }
    }
}
