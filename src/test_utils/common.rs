use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::HarnessConfig;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Defaults with short time bounds and `binary` swapped in.
pub fn quick_config(binary: PathBuf) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.server.binary = binary;
    config.lifecycle.start_timeout_ms = 2_000;
    config.lifecycle.stop_timeout_ms = 2_000;
    config.lifecycle.max_start_attempts = 2;
    config
}

/// Data directories under the system temp dir whose name starts with the
/// harness prefix followed by `label`.
pub fn data_dirs_with_label(label: &str) -> Vec<PathBuf> {
    let prefix = format!("{}{}", crate::constants::DATA_DIR_PREFIX, label);
    std::fs::read_dir(std::env::temp_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default()
}

/// A label unlikely to collide with anything else in the temp dir
pub fn unique_label(name: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("{}_{}_{}_", name, std::process::id(), nanos)
}
