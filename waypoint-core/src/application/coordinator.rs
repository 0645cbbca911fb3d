//! The issuance coordinator.
//!
//! All public issuance operations are serialized by a single milestone lock
//! covering the whole pipeline from sync check to state persistence; at most
//! one milestone or checkpoint is in flight process-wide.

use crate::application::builder;
use crate::application::lifecycle::{CoordinatorObserver, NoopObserver};
use crate::domain::milestone::canonicalize_parents;
use crate::domain::{checkpoint, LatestMilestoneInfo, MilestoneMerkleRoots, State, TreasuryTransaction};
use crate::foundation::util::encoding::encode_hex_short;
use crate::foundation::util::time::unix_seconds_now;
use crate::foundation::{
    BlockId, CoordinatorError, MilestoneId, MilestoneIndex, Result, DEFAULT_MILESTONE_INTERVAL, DEFAULT_SIGNING_RETRY_AMOUNT,
    DEFAULT_SIGNING_RETRY_TIMEOUT, DEFAULT_STATE_FILE_PATH,
};
use crate::infrastructure::node::{
    BackPressureFn, BlockSubmitter, IsNodeSyncedFn, MerkleRootProvider, MigratorService, ProtocolParametersFn, TreasuryProvider,
};
use crate::infrastructure::quorum::{Quorum, QuorumClientConfig, QuorumClientStatistic};
use crate::infrastructure::signer::MilestoneSignerProvider;
use crate::infrastructure::state_file;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Quorum cross-check configuration. Absent by default.
#[derive(Clone, Debug)]
pub struct QuorumConfig {
    pub groups: BTreeMap<String, Vec<QuorumClientConfig>>,
    pub timeout: Duration,
}

/// Coordinator options with the usual defaults.
#[derive(Clone, Debug)]
pub struct Options {
    pub state_file_path: PathBuf,
    pub milestone_interval: Duration,
    pub signing_retry_amount: usize,
    pub signing_retry_timeout: Duration,
    pub quorum: Option<QuorumConfig>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            state_file_path: PathBuf::from(DEFAULT_STATE_FILE_PATH),
            milestone_interval: DEFAULT_MILESTONE_INTERVAL,
            signing_retry_amount: DEFAULT_SIGNING_RETRY_AMOUNT,
            signing_retry_timeout: DEFAULT_SIGNING_RETRY_TIMEOUT,
            quorum: None,
        }
    }
}

impl Options {
    pub fn with_state_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file_path = path.into();
        self
    }

    pub fn with_milestone_interval(mut self, interval: Duration) -> Self {
        self.milestone_interval = interval;
        self
    }

    pub fn with_signing_retry_amount(mut self, amount: usize) -> Self {
        self.signing_retry_amount = amount;
        self
    }

    pub fn with_signing_retry_timeout(mut self, timeout: Duration) -> Self {
        self.signing_retry_timeout = timeout;
        self
    }

    pub fn with_quorum(mut self, groups: BTreeMap<String, Vec<QuorumClientConfig>>, timeout: Duration) -> Self {
        self.quorum = Some(QuorumConfig { groups, timeout });
        self
    }
}

struct Shared {
    state: Option<State>,
    bootstrapped: bool,
}

/// Issues signed milestones and payloadless checkpoints.
pub struct Coordinator {
    merkle_root_provider: Arc<dyn MerkleRootProvider>,
    is_node_synced: IsNodeSyncedFn,
    protocol_parameters: ProtocolParametersFn,
    signer_provider: Arc<dyn MilestoneSignerProvider>,
    migrator: Option<Arc<dyn MigratorService>>,
    treasury_provider: Option<Arc<dyn TreasuryProvider>>,
    block_submitter: Arc<dyn BlockSubmitter>,
    quorum: Option<Quorum>,
    options: Options,

    /// Registered before issuance starts; `&mut self` registration keeps it
    /// append-only once the coordinator is shared.
    back_pressure_funcs: Vec<BackPressureFn>,
    observer: Arc<dyn CoordinatorObserver>,
    shared: RwLock<Shared>,
    /// Serializes `bootstrap`, `issue_checkpoint` and `issue_milestone`.
    milestone_lock: Mutex<()>,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        merkle_root_provider: Arc<dyn MerkleRootProvider>,
        is_node_synced: IsNodeSyncedFn,
        protocol_parameters: ProtocolParametersFn,
        signer_provider: Arc<dyn MilestoneSignerProvider>,
        migrator: Option<Arc<dyn MigratorService>>,
        treasury_provider: Option<Arc<dyn TreasuryProvider>>,
        block_submitter: Arc<dyn BlockSubmitter>,
        options: Options,
    ) -> Result<Self> {
        if migrator.is_some() && treasury_provider.is_none() {
            return Err(CoordinatorError::InvalidConfiguration(
                "migrator configured, but no treasury output provider given".to_string(),
            ));
        }

        let quorum = match &options.quorum {
            Some(config) => Some(Quorum::new(config.groups.clone(), config.timeout)?),
            None => None,
        };

        Ok(Self {
            merkle_root_provider,
            is_node_synced,
            protocol_parameters,
            signer_provider,
            migrator,
            treasury_provider,
            block_submitter,
            quorum,
            options,
            back_pressure_funcs: Vec::new(),
            observer: Arc::new(NoopObserver),
            shared: RwLock::new(Shared { state: None, bootstrapped: false }),
            milestone_lock: Mutex::new(()),
        })
    }

    pub fn set_observer(&mut self, observer: Arc<dyn CoordinatorObserver>) {
        self.observer = observer;
    }

    /// Registers an additional back-pressure handle. Can be called multiple
    /// times, but only before the coordinator is shared.
    pub fn add_back_pressure_func(&mut self, func: BackPressureFn) {
        self.back_pressure_funcs.push(func);
    }

    /// Loads an existing state file or seeds the state to bootstrap the
    /// network. All errors are critical.
    pub fn init_state(&self, bootstrap: bool, start_index: MilestoneIndex, latest_milestone: &LatestMilestoneInfo) -> Result<()> {
        let path = &self.options.state_file_path;
        let state_file_exists = state_file::state_file_exists(path);

        if bootstrap {
            if state_file_exists {
                return Err(CoordinatorError::NetworkBootstrapped);
            }

            // start with milestone 1 at least
            let start_index = start_index.max(1);

            if latest_milestone.index != start_index - 1 {
                return Err(CoordinatorError::IndexMismatch { ours: start_index - 1, observed: latest_milestone.index });
            }

            let previous_milestone_id = if start_index == 1 {
                MilestoneId::null()
            } else {
                // not starting a new network, so the last milestone has to be referenced
                if latest_milestone.milestone_id.is_null() {
                    return Err(CoordinatorError::PreviousMilestoneUnknown);
                }
                latest_milestone.milestone_id
            };

            let state = State::for_bootstrap(start_index, previous_milestone_id, unix_seconds_now()?);
            let mut shared = self.shared.write();
            shared.state = Some(state);
            shared.bootstrapped = false;

            info!("bootstrapping coordinator at {}", start_index);
            return Ok(());
        }

        let state = state_file::load_state(path)?;
        if latest_milestone.index != state.latest_milestone_index {
            return Err(CoordinatorError::IndexMismatch {
                ours: state.latest_milestone_index,
                observed: latest_milestone.index,
            });
        }

        info!("resuming coordinator at {}", state.latest_milestone_index);

        let mut shared = self.shared.write();
        shared.state = Some(state);
        shared.bootstrapped = true;
        Ok(())
    }

    /// Creates the first milestone if the network was not bootstrapped yet;
    /// otherwise a no-op returning the latest milestone block id. Failures
    /// are always critical.
    pub async fn bootstrap(&self) -> Result<BlockId> {
        let _lock = self.milestone_lock.lock().await;

        let (state, bootstrapped) = {
            let shared = self.shared.read();
            (shared.state.clone().ok_or(CoordinatorError::NotInitialized)?, shared.bootstrapped)
        };

        if !bootstrapped {
            // the first milestone references the last known milestone block,
            // which is the null block id when starting a new network
            let result = self
                .create_and_send_milestone(
                    vec![state.latest_milestone_block_id],
                    state.latest_milestone_index + 1,
                    state.latest_milestone_id,
                )
                .await;
            if let Err(err) = result {
                return Err(if err.is_critical() {
                    err
                } else {
                    CoordinatorError::Message(format!("bootstrap failed: {}", err))
                });
            }
            self.shared.write().bootstrapped = true;
        }

        let shared = self.shared.read();
        let state = shared.state.as_ref().ok_or(CoordinatorError::NotInitialized)?;
        Ok(state.latest_milestone_block_id)
    }

    /// Issues one or more chained checkpoint blocks referencing the given
    /// tips, so large parts of the unreferenced cone stay confirmable even
    /// under attack. Returns the id of the last block in the chain.
    pub async fn issue_checkpoint(
        &self,
        checkpoint_index: u32,
        last_checkpoint_block_id: BlockId,
        tips: Vec<BlockId>,
    ) -> Result<BlockId> {
        if tips.is_empty() {
            return Err(self.soft(CoordinatorError::NoTipsGiven));
        }

        let _lock = self.milestone_lock.lock().await;
        self.ensure_initialized()?;

        if !(self.is_node_synced)() {
            return Err(self.soft(CoordinatorError::NodeNotSynced));
        }
        if self.check_back_pressure() {
            return Err(self.soft(CoordinatorError::NodeLoadTooHigh));
        }

        let protocol_parameters = (self.protocol_parameters)();
        let chunk_count = checkpoint::chunk_count(tips.len());
        let mut last_block_id = last_checkpoint_block_id;

        for (chunk_index, chunk) in checkpoint::tip_chunks(&tips).enumerate() {
            let parents = checkpoint::checkpoint_parents(last_block_id, chunk);
            let block = builder::build_checkpoint_block(&protocol_parameters, parents);

            last_block_id = self
                .block_submitter
                .send_block(block, None)
                .await
                .map_err(|err| self.soft(CoordinatorError::CheckpointFailed { operation: "send".to_string(), details: err.to_string() }))?;

            debug!(
                "issued checkpoint {} block {}/{} ({})",
                checkpoint_index,
                chunk_index + 1,
                chunk_count,
                encode_hex_short(last_block_id.as_bytes())
            );
            self.observer.on_issued_checkpoint_block(checkpoint_index, chunk_index, chunk_count, last_block_id);
        }

        Ok(last_block_id)
    }

    /// Creates the next milestone. Returns soft and critical errors.
    pub async fn issue_milestone(&self, parents: Vec<BlockId>) -> Result<BlockId> {
        let _lock = self.milestone_lock.lock().await;

        let state = {
            let shared = self.shared.read();
            shared.state.clone().ok_or(CoordinatorError::NotInitialized)?
        };

        if !(self.is_node_synced)() {
            return Err(self.soft(CoordinatorError::NodeNotSynced));
        }
        if self.check_back_pressure() {
            return Err(self.soft(CoordinatorError::NodeLoadTooHigh));
        }

        self.create_and_send_milestone(parents, state.latest_milestone_index + 1, state.latest_milestone_id)
            .await
            .map_err(|err| {
                if err.is_soft() {
                    self.observer.on_soft_error(&err);
                }
                err
            })
    }

    /// The interval milestones should be issued at.
    pub fn interval(&self) -> Duration {
        self.options.milestone_interval
    }

    /// Snapshot of the current coordinator state.
    pub fn state(&self) -> Option<State> {
        self.shared.read().state.clone()
    }

    /// Statistics about response time and errors of every quorum client, or
    /// `None` if no quorum is configured.
    pub async fn quorum_stats(&self) -> Option<Vec<QuorumClientStatistic>> {
        match &self.quorum {
            Some(quorum) => Some(quorum.stats_snapshot().await),
            None => None,
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.shared.read().state.is_none() {
            return Err(CoordinatorError::NotInitialized);
        }
        Ok(())
    }

    fn check_back_pressure(&self) -> bool {
        self.back_pressure_funcs.iter().any(|func| func())
    }

    fn soft(&self, err: CoordinatorError) -> CoordinatorError {
        self.observer.on_soft_error(&err);
        err
    }

    /// Creates a milestone, broadcasts it and persists the fresh state.
    ///
    /// The on-disk state is renamed to its `_old` form *before* the
    /// broadcast and rewritten only *after* it succeeded: a crash inside
    /// this window leaves just the `_old` file, and the operator has to
    /// resolve the situation by hand instead of the coordinator re-issuing
    /// from stale state.
    async fn create_and_send_milestone(
        &self,
        parents: Vec<BlockId>,
        new_index: MilestoneIndex,
        previous_milestone_id: MilestoneId,
    ) -> Result<BlockId> {
        let parents = canonicalize_parents(&parents);

        // One timestamp for the whiteflag computation, the quorum round and
        // the emitted record; the semantic validation requires them to agree.
        let new_timestamp = unix_seconds_now()?;

        // Awaited to completion on purpose: aborting the whiteflag
        // computation mid-pipeline at shutdown could leave a half-emitted
        // milestone behind.
        let merkle_roots = self
            .merkle_root_provider
            .compute_merkle_roots(new_index, new_timestamp, &parents, previous_milestone_id)
            .await
            .map_err(|err| CoordinatorError::MerkleRootComputation(err.to_string()))?;

        if let Some(quorum) = &self.quorum {
            self.run_quorum(quorum, &merkle_roots, new_index, new_timestamp, &parents, previous_milestone_id).await?;
        }

        let mut receipt = None;
        if let Some(migrator) = &self.migrator {
            receipt = migrator.receipt().await;
            if let Some(receipt_opt) = receipt.as_mut() {
                migrator
                    .persist_state(true)
                    .await
                    .map_err(|err| CoordinatorError::MigratorState(format!("unable to persist migrator state before send: {}", err)))?;

                let treasury = self
                    .treasury_provider
                    .as_ref()
                    .ok_or_else(|| CoordinatorError::InvalidConfiguration("migrator without treasury provider".to_string()))?
                    .latest_treasury_output()
                    .await
                    .map_err(|err| CoordinatorError::TreasuryFetch(err.to_string()))?;

                let remainder = treasury
                    .amount
                    .checked_sub(receipt_opt.sum())
                    .ok_or_else(|| CoordinatorError::MigratorState("migrated amount exceeds treasury output".to_string()))?;
                receipt_opt.transaction =
                    Some(TreasuryTransaction { input_milestone_id: treasury.milestone_id, output_amount: remainder });
                receipt_opt.sort_funds();
            }
        }
        let receipt_attached = receipt.is_some();

        let protocol_parameters = (self.protocol_parameters)();
        let block = builder::build_signed_milestone(
            &self.signer_provider,
            &protocol_parameters,
            new_index,
            new_timestamp,
            parents,
            receipt,
            previous_milestone_id,
            &merkle_roots,
            self.options.signing_retry_amount,
            self.options.signing_retry_timeout,
        )
        .await?;

        let milestone_id = block
            .payload
            .as_ref()
            .ok_or_else(|| CoordinatorError::Message("milestone block without payload".to_string()))?
            .id()?;

        // mark the on-disk state invalid until the fresh state is written below
        state_file::mark_state_stale(&self.options.state_file_path)?;

        let block_id = self
            .block_submitter
            .send_block(block, Some(new_index))
            .await
            .map_err(|err| CoordinatorError::SendBlockFailed(err.to_string()))?;

        if receipt_attached {
            if let Some(migrator) = &self.migrator {
                migrator
                    .persist_state(false)
                    .await
                    .map_err(|err| CoordinatorError::MigratorState(format!("unable to persist migrator state after send: {}", err)))?;
            }
        }

        let new_state = State {
            latest_milestone_index: new_index,
            latest_milestone_id: milestone_id,
            // always reference the last milestone block directly to speed up syncing
            latest_milestone_block_id: block_id,
            latest_milestone_time: new_timestamp,
        };
        self.shared.write().state = Some(new_state.clone());
        state_file::write_state(&self.options.state_file_path, &new_state)?;

        info!("issued milestone {} ({})", new_index, encode_hex_short(block_id.as_bytes()));
        self.observer.on_issued_milestone(new_index, milestone_id, block_id);

        Ok(block_id)
    }

    async fn run_quorum(
        &self,
        quorum: &Quorum,
        merkle_roots: &MilestoneMerkleRoots,
        new_index: MilestoneIndex,
        new_timestamp: u32,
        parents: &[BlockId],
        previous_milestone_id: MilestoneId,
    ) -> Result<()> {
        let started = Instant::now();
        let result = quorum
            .check_merkle_tree_hash(
                merkle_roots,
                new_index,
                new_timestamp,
                parents,
                previous_milestone_id,
                Some(Arc::new(|group: &str, client: &QuorumClientConfig, err: &CoordinatorError| {
                    warn!("quorum group encountered an error, group: {}, base_url: {}, err: {}", group, client.base_url, err);
                })),
            )
            .await;
        let duration = started.elapsed();

        self.observer.on_quorum_finished(duration, result.as_ref().err());

        match result {
            Ok(()) => {
                info!("quorum took {}ms", duration.as_millis());
                Ok(())
            }
            Err(err) => {
                info!("quorum failed after {}ms, err: {}", duration.as_millis(), err);
                Err(err)
            }
        }
    }
}
