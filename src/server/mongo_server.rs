use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::panic::Location;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use bson::doc;
use mongodb::Client;
use tokio::process::Child;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::config_file::write_config;
use super::config_file::ConfigParams;
use super::label::test_label;
use super::readiness::pump;
use super::readiness::ReadinessWatcher;
use crate::constants::DATA_DIR_PREFIX;
use crate::constants::LOCALE_ENV;
use crate::constants::READINESS_MARKER;
use crate::utils::async_task::spawn_task;
use crate::utils::async_task::wait_at_most;
use crate::utils::net::allocate_port;
use crate::utils::net::loopback_addr;
use crate::Error;
use crate::HarnessConfig;
use crate::Reporter;
use crate::Result;
use crate::ServerConfig;

/// One supervised mongod process with its own port and data directory.
///
/// Lifecycle: unstarted after [`MongoServer::new`], running once
/// [`MongoServer::start`] has observed the readiness marker, stopped after
/// [`MongoServer::stop`]. `stop` may be called any time after `launch` spawned
/// the process, whether or not readiness was reached.
pub struct MongoServer {
    /// 0 until a port is allocated; never reassigned afterwards
    pub port: u16,
    pub repl_set: bool,
    pub stop_timeout: Duration,

    settings: ServerConfig,
    label: String,
    reporter: Arc<dyn Reporter>,

    db_path: Option<PathBuf>,
    child: Option<Child>,
    watcher: Option<Arc<ReadinessWatcher>>,
    stopped: bool,
}

impl Debug for MongoServer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MongoServer")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("repl_set", &self.repl_set)
            .field("pid", &self.child.as_ref().and_then(|c| c.id()))
            .finish()
    }
}

impl MongoServer {
    /// Creates an unstarted instance. The data directory name carries the
    /// running test's name when it can be determined.
    #[track_caller]
    pub fn new(
        config: &HarnessConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self::with_label(config, reporter, test_label(Location::caller()))
    }

    pub(crate) fn with_label(
        config: &HarnessConfig,
        reporter: Arc<dyn Reporter>,
        label: String,
    ) -> Self {
        Self {
            port: 0,
            repl_set: false,
            stop_timeout: config.lifecycle.stop_timeout(),
            settings: config.server.clone(),
            label,
            reporter,
            db_path: None,
            child: None,
            watcher: None,
            stopped: false,
        }
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Launches the process and waits until it accepts connections.
    pub async fn start(&mut self) -> Result<()> {
        self.launch().await?;
        self.wait_ready().await
    }

    /// Assigns a port, creates the data directory, writes the config and
    /// spawns mongod with its stdout attached to a readiness watcher.
    /// Returns as soon as the process is running.
    pub async fn launch(&mut self) -> Result<()> {
        if self.port == 0 {
            self.port = allocate_port()?;
        }

        let db_path = tempfile::Builder::new()
            .prefix(&format!("{}{}", DATA_DIR_PREFIX, self.label))
            .tempdir()?
            .keep();
        self.db_path = Some(db_path.clone());
        debug!("created data directory {}", db_path.display());

        let config_file = write_config(
            &db_path,
            &ConfigParams {
                port: self.port,
                db_path: &db_path,
                repl_set: self.repl_set,
            },
        )?;

        let verbose = self.settings.is_verbose();
        let mut child = Command::new(&self.settings.binary)
            .args(self.settings.args(&config_file))
            .env(LOCALE_ENV.0, LOCALE_ENV.1)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if verbose { Stdio::inherit() } else { Stdio::null() })
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                binary: self.settings.binary.clone(),
                source,
            })?;
        info!(
            "spawned {} (pid {:?}) on port {}",
            self.settings.binary.display(),
            child.id(),
            self.port
        );

        let stdout = child.stdout.take();
        self.child = Some(child);
        let stdout = stdout.ok_or_else(|| {
            Error::Io(io::Error::new(io::ErrorKind::Other, "child stdout was not captured"))
        })?;

        let watcher = Arc::new(ReadinessWatcher::new(READINESS_MARKER));
        let mirror = if verbose { Some(tokio::io::stdout()) } else { None };
        spawn_task(
            &format!("mongod-stdout-{}", self.port),
            pump(stdout, watcher.clone(), mirror),
        );
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Suspends until the readiness marker shows up in the child's stdout.
    /// Unbounded; wrap it in a timeout.
    pub async fn wait_ready(&self) -> Result<()> {
        let watcher = self.watcher.as_ref().ok_or(Error::NotLaunched)?;
        watcher.wait().await;
        info!("mongod ready on {}", self.url());
        Ok(())
    }

    /// Kills the process and removes the data directory concurrently, waiting
    /// at most `stop_timeout`. Failures are logged and otherwise ignored;
    /// cleanup still pending after the bound keeps running unattended.
    pub async fn stop(&mut self) {
        self.stopped = true;
        let child = self.child.take();
        let db_path = self.db_path.clone();
        let port = self.port;

        let cleanup = spawn_task(&format!("mongod-stop-{}", port), async move {
            let kill = async move {
                if let Some(mut child) = child {
                    if let Err(e) = child.kill().await {
                        debug!("kill of mongod on port {} failed: {:?}", port, e);
                    }
                }
            };
            let remove = async move {
                if let Some(path) = db_path {
                    if let Err(e) = tokio::fs::remove_dir_all(&path).await {
                        debug!("removing {} failed: {:?}", path.display(), e);
                    }
                }
            };
            tokio::join!(kill, remove);
        });

        if !wait_at_most(cleanup, self.stop_timeout).await {
            warn!(
                "stop of mongod on port {} did not finish within {:?}; abandoning",
                port, self.stop_timeout
            );
        }
    }

    /// `127.0.0.1:<port>`
    pub fn url(&self) -> String {
        loopback_addr(self.port)
    }

    /// Connection string talking to this member only
    pub fn uri(&self) -> String {
        format!("mongodb://{}/?directConnection=true", self.url())
    }

    /// Dials the instance and verifies the connection with a `ping`.
    pub async fn try_session(&self) -> Result<Client> {
        let client = Client::with_uri_str(self.uri()).await?;
        client.database("admin").run_command(doc! { "ping": 1 }, None).await?;
        Ok(client)
    }

    /// Like [`MongoServer::try_session`], reporting failure as fatal.
    pub async fn session(&self) -> Client {
        match self.try_session().await {
            Ok(client) => client,
            Err(e) => self.reporter.fatal(&format!("failed to connect to {}: {}", self.url(), e)),
        }
    }

    /// Starts a fresh instance, retrying with a brand-new one whenever an
    /// attempt exceeds `lifecycle.start_timeout_ms`.
    ///
    /// Non-timeout failures (spawn, I/O) are returned immediately. Every
    /// abandoned attempt is stopped before the next one begins.
    pub async fn start_with_retry(
        config: &HarnessConfig,
        repl_set: bool,
        reporter: Arc<dyn Reporter>,
        label: &str,
    ) -> Result<MongoServer> {
        let lifecycle = &config.lifecycle;
        let start_timeout = lifecycle.start_timeout();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut server = MongoServer::with_label(config, reporter.clone(), label.to_string());
            server.repl_set = repl_set;

            match timeout(start_timeout, server.start()).await {
                Ok(Ok(())) => return Ok(server),
                Ok(Err(e)) => {
                    server.stop().await;
                    return Err(e);
                }
                Err(_) => {
                    warn!(
                        "attempt {}: mongod on port {} not ready after {:?}",
                        attempts, server.port, start_timeout
                    );
                    server.stop().await;
                    if lifecycle.max_start_attempts != 0 && attempts >= lifecycle.max_start_attempts {
                        return Err(Error::ReadinessTimeout {
                            attempts,
                            timeout: start_timeout,
                        });
                    }
                }
            }
        }
    }

    /// Loads [`HarnessConfig::new`] and starts a standalone instance;
    /// failures go to `reporter`.
    #[track_caller]
    pub fn new_started(reporter: Arc<dyn Reporter>) -> impl Future<Output = MongoServer> {
        let label = test_label(Location::caller());
        async move {
            let config = load_config_or_fatal(reporter.as_ref());
            started_or_fatal(config, false, reporter, label).await
        }
    }

    /// Same as [`MongoServer::new_started`] with replica set mode enabled.
    #[track_caller]
    pub fn new_repl_set_server(reporter: Arc<dyn Reporter>) -> impl Future<Output = MongoServer> {
        let label = test_label(Location::caller());
        async move {
            let config = load_config_or_fatal(reporter.as_ref());
            started_or_fatal(config, true, reporter, label).await
        }
    }

    /// Starts an instance from an explicit config; failures go to `reporter`.
    #[track_caller]
    pub fn started_with(
        config: HarnessConfig,
        repl_set: bool,
        reporter: Arc<dyn Reporter>,
    ) -> impl Future<Output = MongoServer> {
        let label = test_label(Location::caller());
        started_or_fatal(config, repl_set, reporter, label)
    }
}

/// Best-effort cleanup for instances that were never stopped. Inside a
/// runtime the directory removal goes to the blocking pool; outside one it
/// runs inline.
impl Drop for MongoServer {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
        let Some(path) = self.db_path.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    if let Err(e) = std::fs::remove_dir_all(&path) {
                        debug!("removing {} on drop failed: {:?}", path.display(), e);
                    }
                });
            }
            Err(_) => {
                let _ = std::fs::remove_dir_all(&path);
            }
        }
    }
}

pub(crate) fn load_config_or_fatal(reporter: &dyn Reporter) -> HarnessConfig {
    match HarnessConfig::new().and_then(HarnessConfig::validate) {
        Ok(config) => config,
        Err(e) => reporter.fatal(&format!("failed to load harness config: {}", e)),
    }
}

async fn started_or_fatal(
    config: HarnessConfig,
    repl_set: bool,
    reporter: Arc<dyn Reporter>,
    label: String,
) -> MongoServer {
    match MongoServer::start_with_retry(&config, repl_set, reporter.clone(), &label).await {
        Ok(server) => server,
        Err(e) => reporter.fatal(&format!("failed to start mongod: {}", e)),
    }
}
