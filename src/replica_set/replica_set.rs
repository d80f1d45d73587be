use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use bson::doc;
use futures::future::join_all;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::error;
use tracing::info;

use super::form_replica_set;
use super::ClusterInitiator;
use super::MongoInitiator;
use super::ReplicaSetConfig;
use crate::constants::REPLICA_SET_NAME;
use crate::server::label::test_label;
use crate::server::load_config_or_fatal;
use crate::Error;
use crate::HarnessConfig;
use crate::MongoServer;
use crate::Reporter;
use crate::Result;

/// Running members of one replica set. Member 0 issued the initiation and is
/// the first primary.
pub struct ReplicaSet {
    members: Vec<MongoServer>,
    reporter: Arc<dyn Reporter>,
    /// Server selection bound for sessions opened through the set URI
    connect_timeout: Duration,
}

impl std::fmt::Debug for ReplicaSet {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReplicaSet").field("members", &self.members).finish()
    }
}

impl ReplicaSet {
    /// Loads [`HarnessConfig::new`] and starts `count` members; failures go
    /// to `reporter`.
    #[track_caller]
    pub fn new(
        count: usize,
        reporter: Arc<dyn Reporter>,
    ) -> impl std::future::Future<Output = ReplicaSet> {
        let label = test_label(Location::caller());
        async move {
            let config = load_config_or_fatal(reporter.as_ref());
            match Self::try_start(&config, count, reporter.clone(), &label).await {
                Ok(set) => set,
                Err(e) => reporter.fatal(&format!("failed to start replica set: {}", e)),
            }
        }
    }

    /// Like [`ReplicaSet::new`] with an explicit config.
    #[track_caller]
    pub fn with_config(
        config: HarnessConfig,
        count: usize,
        reporter: Arc<dyn Reporter>,
    ) -> impl std::future::Future<Output = ReplicaSet> {
        let label = test_label(Location::caller());
        async move {
            match Self::try_start(&config, count, reporter.clone(), &label).await {
                Ok(set) => set,
                Err(e) => reporter.fatal(&format!("failed to start replica set: {}", e)),
            }
        }
    }

    /// Starts `count` members concurrently and forms the replica set through
    /// a client connection to member 0.
    pub async fn try_start(
        config: &HarnessConfig,
        count: usize,
        reporter: Arc<dyn Reporter>,
        label: &str,
    ) -> Result<ReplicaSet> {
        let mut set = Self::start_members(config, count, reporter, label).await?;

        let result = async {
            let first = &set.members[0];
            let initiator = MongoInitiator::connect(&first.uri(), config.retry.cluster_init.timeout()).await?;
            set.initiate_with(&initiator, config).await
        }
        .await;

        if let Err(e) = result {
            error!("replica set initiation failed: {}; stopping all members", e);
            set.stop().await;
            return Err(e);
        }
        Ok(set)
    }

    /// Starts every member with the replica set flag. If any member fails the
    /// ones already running are stopped before the error is returned.
    pub(crate) async fn start_members(
        config: &HarnessConfig,
        count: usize,
        reporter: Arc<dyn Reporter>,
        label: &str,
    ) -> Result<ReplicaSet> {
        if count == 0 {
            return Err(Error::InvalidConfig("replica set needs at least one member".to_string()));
        }

        let starts = (0..count).map(|i| {
            let member_label = format!("{}m{}_", label, i);
            let reporter = reporter.clone();
            async move { MongoServer::start_with_retry(config, true, reporter, &member_label).await }
        });

        let mut members = Vec::with_capacity(count);
        let mut first_error = None;
        for result in join_all(starts).await {
            match result {
                Ok(server) => members.push(server),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            error!(
                "replica set member failed to start: {}; stopping {} started member(s)",
                e,
                members.len()
            );
            join_all(members.iter_mut().map(|m| m.stop())).await;
            return Err(e);
        }

        info!("{} replica set member(s) ready", members.len());
        Ok(ReplicaSet {
            members,
            reporter,
            connect_timeout: config.retry.cluster_init.timeout(),
        })
    }

    pub(crate) async fn initiate_with(
        &self,
        initiator: &dyn ClusterInitiator,
        config: &HarnessConfig,
    ) -> Result<()> {
        let rs_config = ReplicaSetConfig::for_hosts(&self.addrs());
        form_replica_set(initiator, &rs_config, &config.retry).await
    }

    /// `127.0.0.1:<port>` of every member, member 0 first
    pub fn addrs(&self) -> Vec<String> {
        self.members.iter().map(MongoServer::url).collect()
    }

    pub fn members(&self) -> &[MongoServer] {
        &self.members
    }

    /// Connection string naming every member and the set
    pub fn uri(&self) -> String {
        format!("mongodb://{}/?replicaSet={}", self.addrs().join(","), REPLICA_SET_NAME)
    }

    /// Dials the set through [`ReplicaSet::uri`] and verifies the connection
    /// with a `ping`, waiting at most `retry.cluster_init.timeout_ms` for a
    /// reachable member.
    pub async fn try_session(&self) -> Result<Client> {
        let mut options = ClientOptions::parse(self.uri()).await?;
        options.server_selection_timeout = Some(self.connect_timeout);
        let client = Client::with_options(options)?;
        client.database("admin").run_command(doc! { "ping": 1 }, None).await?;
        Ok(client)
    }

    /// Like [`ReplicaSet::try_session`], reporting failure as fatal.
    pub async fn session(&self) -> Client {
        match self.try_session().await {
            Ok(client) => client,
            Err(e) => self
                .reporter
                .fatal(&format!("failed to connect to replica set {}: {}", self.uri(), e)),
        }
    }

    /// Stops every member concurrently.
    pub async fn stop(&mut self) {
        join_all(self.members.iter_mut().map(|m| m.stop())).await;
    }
}
