//! The durable record of the last-issued milestone.

use crate::foundation::{BlockId, MilestoneId, MilestoneIndex};
use serde::{Deserialize, Serialize};

/// Persisted coordinator state. After a successful emission all four fields
/// refer to the same milestone; persistence is all-or-nothing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub latest_milestone_index: MilestoneIndex,
    pub latest_milestone_id: MilestoneId,
    /// Identity of the record containing the latest milestone; referenced as
    /// a default parent so nodes sync up quickly.
    pub latest_milestone_block_id: BlockId,
    /// Unix seconds of the last emission.
    pub latest_milestone_time: u32,
}

impl State {
    /// Seeds the in-memory state for a bootstrap at `start_index`.
    ///
    /// The state describes the milestone *before* the first one this
    /// coordinator will emit: for `start_index == 1` that is the genesis
    /// (null ids), otherwise the externally observed previous milestone.
    pub fn for_bootstrap(start_index: MilestoneIndex, previous_milestone_id: MilestoneId, now: u32) -> Self {
        Self {
            latest_milestone_index: start_index - 1,
            latest_milestone_id: previous_milestone_id,
            latest_milestone_block_id: BlockId::null(),
            latest_milestone_time: now,
        }
    }
}

/// The attached node's view of the latest milestone, used only to cross-check
/// the coordinator's own state at startup.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LatestMilestoneInfo {
    pub index: MilestoneIndex,
    pub timestamp: u32,
    pub milestone_id: MilestoneId,
}
