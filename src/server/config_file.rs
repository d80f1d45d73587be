//! mongod config file rendering.
//!
//! The key set is fixed; only port, data path and replica set membership vary
//! per instance.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use lazy_static::lazy_static;
use tracing::debug;

use crate::constants::CONFIG_FILE_PREFIX;
use crate::constants::LOOPBACK;
use crate::constants::REPLICA_SET_NAME;
use crate::Result;

/// Width the key column is padded to
const KEY_WIDTH: usize = 17;

/// Per-instance values filled into the template
#[derive(Debug, Clone, Copy)]
pub struct ConfigParams<'a> {
    pub port: u16,
    pub db_path: &'a Path,
    pub repl_set: bool,
}

#[derive(Debug, Clone, Copy)]
enum Value {
    Fixed(&'static str),
    DbPath,
    Port,
}

pub(crate) struct ConfigTemplate {
    base: Vec<(&'static str, Value)>,
    repl_set: Vec<(&'static str, Value)>,
}

lazy_static! {
    static ref TEMPLATE: ConfigTemplate = ConfigTemplate {
        base: vec![
            ("bind_ip", Value::Fixed(LOOPBACK)),
            ("dbpath", Value::DbPath),
            ("nohttpinterface", Value::Fixed("true")),
            ("nojournal", Value::Fixed("true")),
            ("noprealloc", Value::Fixed("true")),
            ("nounixsocket", Value::Fixed("true")),
            ("nssize", Value::Fixed("2")),
            ("port", Value::Port),
            ("quiet", Value::Fixed("true")),
            ("smallfiles", Value::Fixed("true")),
        ],
        repl_set: vec![
            ("oplogSize", Value::Fixed("1")),
            ("replSet", Value::Fixed(REPLICA_SET_NAME)),
        ],
    };
}

impl ConfigTemplate {
    fn render(
        &self,
        params: &ConfigParams<'_>,
    ) -> String {
        let mut out = String::new();
        let extra: &[(&'static str, Value)] = if params.repl_set { &self.repl_set } else { &[] };
        for (key, value) in self.base.iter().chain(extra) {
            let value = match value {
                Value::Fixed(v) => (*v).to_string(),
                Value::DbPath => params.db_path.display().to_string(),
                Value::Port => params.port.to_string(),
            };
            let _ = writeln!(out, "{:<width$}= {}", key, value, width = KEY_WIDTH);
        }
        out
    }
}

/// Renders the config text for `params`.
pub fn render(params: &ConfigParams<'_>) -> String {
    TEMPLATE.render(params)
}

/// Writes a uniquely named `config-*` file into `dir` and returns its path.
/// The file outlives this call; it is removed along with `dir`.
pub fn write_config(
    dir: &Path,
    params: &ConfigParams<'_>,
) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new().prefix(CONFIG_FILE_PREFIX).tempfile_in(dir)?;
    file.write_all(render(params).as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    debug!("wrote server config to {}", path.display());
    Ok(path)
}
