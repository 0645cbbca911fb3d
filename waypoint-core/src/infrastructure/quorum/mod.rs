//! Quorum cross-check of locally computed merkle roots.
//!
//! Operator-configured verifier nodes are arranged into named groups. A
//! group is satisfied once a single client replies with matching roots; a
//! reply with *different* roots condemns the whole round. Groups that stay
//! silent until the deadline are a soft failure; the network may simply be
//! congested.

use crate::domain::MilestoneMerkleRoots;
use crate::foundation::{BlockId, CoordinatorError, MerkleRoot, MilestoneId, MilestoneIndex, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinSet;
use tokio::time::Instant;

const WHITEFLAG_ENDPOINT: &str = "api/core/v2/whiteflag";

/// Configuration of a single quorum client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuorumClientConfig {
    /// Optional display alias.
    #[serde(default)]
    pub alias: Option<String>,
    pub base_url: String,
    /// Optional HTTP basic auth.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Runtime telemetry of a quorum client, exported by snapshot copy.
#[derive(Clone, Debug, Default)]
pub struct QuorumClientStatistic {
    pub group: String,
    pub alias: Option<String>,
    pub base_url: String,
    /// Last response time of the whiteflag call.
    pub response_time_secs: f64,
    /// Error of the last whiteflag call, if any.
    pub last_error: Option<String>,
}

/// Called for every failing client with `(group, client, error)`.
pub type OnClientErrorFn = Arc<dyn Fn(&str, &QuorumClientConfig, &CoordinatorError) + Send + Sync>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WhiteflagRequest<'a> {
    index: MilestoneIndex,
    timestamp: u32,
    parents: &'a [BlockId],
    previous_milestone_id: MilestoneId,
}

/// Ancillary response fields are ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhiteflagResponse {
    inclusion_merkle_root: MerkleRoot,
    applied_merkle_root: MerkleRoot,
}

#[derive(Debug)]
struct ClientEntry {
    http: reqwest::Client,
    config: QuorumClientConfig,
    stats: Mutex<QuorumClientStatistic>,
}

impl ClientEntry {
    async fn compute_whiteflag(
        &self,
        index: MilestoneIndex,
        timestamp: u32,
        parents: &[BlockId],
        previous_milestone_id: MilestoneId,
    ) -> Result<MilestoneMerkleRoots> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), WHITEFLAG_ENDPOINT);
        let mut request = self
            .http
            .post(url)
            .json(&WhiteflagRequest { index, timestamp, parents, previous_milestone_id });
        if self.config.username.is_some() || self.config.password.is_some() {
            request = request.basic_auth(self.config.username.as_deref().unwrap_or_default(), self.config.password.as_deref());
        }

        let response = request.send().await?.error_for_status()?;
        let body: WhiteflagResponse = response.json().await?;
        Ok(MilestoneMerkleRoots {
            inclusion_merkle_root: body.inclusion_merkle_root,
            applied_merkle_root: body.applied_merkle_root,
        })
    }
}

/// Fan-out verifier over the configured quorum groups.
#[derive(Debug)]
pub struct Quorum {
    groups: BTreeMap<String, Vec<Arc<ClientEntry>>>,
    timeout: Duration,
    /// Write-held for a full check round, read-held by snapshot readers:
    /// snapshots never tear across a round and rounds never interleave.
    stats_lock: RwLock<()>,
}

impl Quorum {
    pub fn new(groups: BTreeMap<String, Vec<QuorumClientConfig>>, timeout: Duration) -> Result<Self> {
        if groups.is_empty() {
            return Err(CoordinatorError::InvalidConfiguration("quorum enabled but no groups configured".to_string()));
        }

        let mut entries = BTreeMap::new();
        for (group_name, clients) in groups {
            if clients.is_empty() {
                return Err(CoordinatorError::InvalidConfiguration(format!(
                    "quorum group {}: no clients given",
                    group_name
                )));
            }

            let mut group_entries = Vec::with_capacity(clients.len());
            for config in clients {
                let http = reqwest::Client::builder().timeout(timeout).build()?;
                let stats = Mutex::new(QuorumClientStatistic {
                    group: group_name.clone(),
                    alias: config.alias.clone(),
                    base_url: config.base_url.clone(),
                    ..QuorumClientStatistic::default()
                });
                group_entries.push(Arc::new(ClientEntry { http, config, stats }));
            }
            entries.insert(group_name, group_entries);
        }

        Ok(Self { groups: entries, timeout, stats_lock: RwLock::new(()) })
    }

    /// Asks every group to recompute the merkle roots for the candidate
    /// milestone and classifies the outcome.
    ///
    /// Returns the first error any group reports: a mismatching reply is
    /// critical, a group with no answer by the deadline is soft. `Ok(())`
    /// means every group produced at least one matching reply.
    pub async fn check_merkle_tree_hash(
        &self,
        local_roots: &MilestoneMerkleRoots,
        index: MilestoneIndex,
        timestamp: u32,
        parents: &[BlockId],
        previous_milestone_id: MilestoneId,
        on_client_error: Option<OnClientErrorFn>,
    ) -> Result<()> {
        let _round = self.stats_lock.write().await;

        let deadline = Instant::now() + self.timeout;
        // one slot per group; a group reports at most one error, so senders
        // never block even after this call returned early
        let (err_tx, mut err_rx) = mpsc::channel::<CoordinatorError>(self.groups.len());

        let mut group_tasks = JoinSet::new();
        for (group_name, entries) in &self.groups {
            group_tasks.spawn(check_group(
                group_name.clone(),
                entries.clone(),
                *local_roots,
                index,
                timestamp,
                parents.to_vec(),
                previous_milestone_id,
                deadline,
                err_tx.clone(),
                on_client_error.clone(),
            ));
        }
        drop(err_tx);

        // Queued errors are delivered before the closed-channel signal, so
        // `None` means every group finished clean. Returning early drops the
        // join set, which aborts the remaining group tasks; their client
        // tasks run out against the shared deadline on their own.
        match err_rx.recv().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Snapshot of the per-client statistics.
    pub async fn stats_snapshot(&self) -> Vec<QuorumClientStatistic> {
        let _guard = self.stats_lock.read().await;
        let mut stats = Vec::new();
        for entries in self.groups.values() {
            for entry in entries {
                stats.push(entry.stats.lock().await.clone());
            }
        }
        stats
    }
}

#[allow(clippy::too_many_arguments)]
async fn check_group(
    group: String,
    entries: Vec<Arc<ClientEntry>>,
    local_roots: MilestoneMerkleRoots,
    index: MilestoneIndex,
    timestamp: u32,
    parents: Vec<BlockId>,
    previous_milestone_id: MilestoneId,
    deadline: Instant,
    err_tx: mpsc::Sender<CoordinatorError>,
    on_client_error: Option<OnClientErrorFn>,
) {
    // buffered to the client count so stragglers never block after the
    // group was abandoned
    let (reply_tx, mut reply_rx) = mpsc::channel::<Result<MilestoneMerkleRoots>>(entries.len());

    for entry in entries {
        let reply_tx = reply_tx.clone();
        let parents = parents.clone();
        let group = group.clone();
        let on_client_error = on_client_error.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = entry.compute_whiteflag(index, timestamp, &parents, previous_milestone_id).await;

            {
                let mut stats = entry.stats.lock().await;
                stats.response_time_secs = started.elapsed().as_secs_f64();
                stats.last_error = result.as_ref().err().map(ToString::to_string);
            }

            if let Err(err) = &result {
                debug!("quorum client {} in group {} failed: {}", entry.config.base_url, group, err);
                if let Some(callback) = &on_client_error {
                    callback(&group, &entry.config, err);
                }
            }
            let _ = reply_tx.send(result).await;
        });
    }
    drop(reply_tx);

    let mut valid_replies = 0usize;
    loop {
        match tokio::time::timeout_at(deadline, reply_rx.recv()).await {
            Ok(Some(Ok(roots))) => {
                if roots != local_roots {
                    // a diverging verifier is never acceptable
                    let _ = err_tx.send(CoordinatorError::QuorumMerkleHashMismatch { group }).await;
                    return;
                }
                valid_replies += 1;
            }
            // individual client errors only count towards "no answer"
            Ok(Some(Err(_))) => continue,
            // all clients reported
            Ok(None) => break,
            // deadline reached
            Err(_) => break,
        }
    }

    if valid_replies == 0 {
        let _ = err_tx.send(CoordinatorError::QuorumGroupNoAnswer { group }).await;
    }
}
