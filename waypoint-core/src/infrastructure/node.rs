//! Seams towards the attached node and the optional sub-services.
//!
//! The coordinator never opens sockets itself; everything it needs from the
//! outside world comes in through these traits and function handles.

use crate::domain::{Block, MilestoneMerkleRoots, ReceiptOption};
use crate::foundation::{BlockId, MilestoneId, MilestoneIndex, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Tells the coordinator whether the attached node is synced.
pub type IsNodeSyncedFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Signals congestion; issuance is held while any registered handle returns
/// `true`.
pub type BackPressureFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Returns the currently valid protocol parameters.
pub type ProtocolParametersFn = Arc<dyn Fn() -> ProtocolParameters + Send + Sync>;

#[derive(Clone, Debug)]
pub struct ProtocolParameters {
    pub protocol_version: u8,
    pub network_name: String,
    pub below_max_depth: u8,
    pub token_supply: u64,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self { protocol_version: 2, network_name: "waypoint".to_string(), below_max_depth: 15, token_supply: 0 }
    }
}

/// Computes the whiteflag merkle roots for a candidate milestone.
#[async_trait]
pub trait MerkleRootProvider: Send + Sync {
    /// Must be deterministic on its inputs.
    ///
    /// The coordinator awaits this to completion and never races it against
    /// a shutdown signal: aborting between quorum and persistence would leave
    /// a half-emitted milestone behind.
    async fn compute_merkle_roots(
        &self,
        index: MilestoneIndex,
        timestamp: u32,
        parents: &[BlockId],
        previous_milestone_id: MilestoneId,
    ) -> Result<MilestoneMerkleRoots>;
}

/// Broadcasts a finished record to the network.
#[async_trait]
pub trait BlockSubmitter: Send + Sync {
    /// `milestone_index` is set when the block carries a milestone payload.
    async fn send_block(&self, block: Block, milestone_index: Option<MilestoneIndex>) -> Result<BlockId>;
}

/// The latest treasury output, created by the last milestone that carried a
/// migration receipt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LatestTreasuryOutput {
    pub milestone_id: MilestoneId,
    pub amount: u64,
}

#[async_trait]
pub trait TreasuryProvider: Send + Sync {
    async fn latest_treasury_output(&self) -> Result<LatestTreasuryOutput>;
}

/// Optional migration receipt service.
#[async_trait]
pub trait MigratorService: Send + Sync {
    /// The receipt to embed into the next milestone, if any entries
    /// accumulated.
    async fn receipt(&self) -> Option<ReceiptOption>;

    /// Persists the migrator state; called once before the milestone is sent
    /// and once after.
    async fn persist_state(&self, pre_send: bool) -> Result<()>;
}
