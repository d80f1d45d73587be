use std::time::Duration;

use async_trait::async_trait;
use bson::doc;
use bson::Document;
#[cfg(test)]
use mockall::automock;
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::constants::ALREADY_INITIALIZED_CODE;
use crate::constants::NOT_YET_READY_CODES;
use crate::constants::REPLICA_SET_NAME;
use crate::utils::async_task::retry_with_backoff;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::Error;
use crate::Result;
use crate::RetryPolicies;

/// Member count and hosts of the replica set, in `replSetInitiate` form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    #[serde(rename = "_id")]
    pub name: String,
    pub members: Vec<MemberConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberConfig {
    #[serde(rename = "_id")]
    pub id: i32,
    pub host: String,
    pub priority: i32,
}

impl ReplicaSetConfig {
    /// Member 0 gets the higher priority so it becomes the first primary.
    pub fn for_hosts(hosts: &[String]) -> Self {
        let members = hosts
            .iter()
            .enumerate()
            .map(|(i, host)| MemberConfig {
                id: i as i32,
                host: host.clone(),
                priority: if i == 0 { 2 } else { 1 },
            })
            .collect();
        Self {
            name: REPLICA_SET_NAME.to_string(),
            members,
        }
    }

    pub fn to_document(&self) -> Result<Document> {
        bson::to_document(self).map_err(|e| Error::ClusterInit(format!("cannot encode replica set config: {e}")))
    }
}

/// Admin commands issued against the member that forms the replica set.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterInitiator: Send + Sync + 'static {
    /// Runs `replSetInitiate` with `config`. A set that is already
    /// initialized counts as success. Refusals that may clear up once the
    /// member has finished starting are reported as [`Error::NotYetReady`].
    async fn initiate(
        &self,
        config: Document,
    ) -> Result<()>;

    /// Whether the member currently reports itself primary.
    async fn is_primary(&self) -> Result<bool>;
}

/// [`ClusterInitiator`] over a direct client connection.
pub struct MongoInitiator {
    client: Client,
}

impl MongoInitiator {
    pub async fn connect(
        uri: &str,
        server_selection_timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.direct_connection = Some(true);
        options.server_selection_timeout = Some(server_selection_timeout);
        let client = Client::with_options(options)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ClusterInitiator for MongoInitiator {
    async fn initiate(
        &self,
        config: Document,
    ) -> Result<()> {
        let admin = self.client.database("admin");
        match admin.run_command(doc! { "replSetInitiate": config }, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_initialized(&e) => {
                debug!("replica set already initialized: {}", e);
                Ok(())
            }
            Err(e) if is_not_yet_ready(&e) => Err(Error::NotYetReady(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_primary(&self) -> Result<bool> {
        let reply = self
            .client
            .database("admin")
            .run_command(doc! { "isMaster": 1 }, None)
            .await?;
        Ok(reply.get_bool("ismaster").unwrap_or(false))
    }
}

fn is_already_initialized(e: &mongodb::error::Error) -> bool {
    matches!(e.kind.as_ref(), ErrorKind::Command(c) if c.code == ALREADY_INITIALIZED_CODE)
}

/// Connection-level failures and start-up refusals
fn is_not_yet_ready(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Command(c) => NOT_YET_READY_CODES.contains(&c.code),
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. } => true,
        _ => false,
    }
}

/// Issues `replSetInitiate` through `initiator` and waits for a primary, each
/// phase under its own retry policy. Initiation is only repeated while the
/// member reports it is not ready yet; any other refusal ends it at once.
pub async fn form_replica_set(
    initiator: &dyn ClusterInitiator,
    config: &ReplicaSetConfig,
    policies: &RetryPolicies,
) -> Result<()> {
    let document = config.to_document()?;

    retry_with_backoff(
        || initiator.initiate(document.clone()),
        policies.cluster_init,
        Error::is_transient,
    )
    .await
    .map_err(|e| Error::ClusterInit(format!("replSetInitiate failed: {e}")))?;
    info!("replica set {} initiated with {} member(s)", config.name, config.members.len());

    task_with_timeout_and_exponential_backoff(
        || async {
            if initiator.is_primary().await? {
                Ok(())
            } else {
                Err(Error::ClusterInit("no primary elected yet".to_string()))
            }
        },
        policies.primary_wait,
    )
    .await
    .map_err(|e| Error::ClusterInit(format!("primary never elected: {e}")))?;
    info!("replica set {} has a primary", config.name);
    Ok(())
}
