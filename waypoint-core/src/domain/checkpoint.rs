//! Checkpoint partitioning.
//!
//! A checkpoint batch references up to [`CHECKPOINT_MAX_TIPS`] tips per
//! block; the remaining parent slot chains back to the previous checkpoint
//! (or the last milestone for the first checkpoint after one).

use crate::domain::milestone::canonicalize_parents;
use crate::foundation::{BlockId, CHECKPOINT_MAX_TIPS};

/// Number of checkpoint blocks needed to reference `tip_count` tips.
pub fn chunk_count(tip_count: usize) -> usize {
    tip_count.div_ceil(CHECKPOINT_MAX_TIPS)
}

/// Splits tips into per-checkpoint chunks.
pub fn tip_chunks(tips: &[BlockId]) -> impl Iterator<Item = &[BlockId]> {
    tips.chunks(CHECKPOINT_MAX_TIPS)
}

/// Parents of one checkpoint block: the chain-back pointer plus the chunk,
/// deduplicated and sorted.
pub fn checkpoint_parents(last_checkpoint_block_id: BlockId, chunk: &[BlockId]) -> Vec<BlockId> {
    let mut parents = Vec::with_capacity(chunk.len() + 1);
    parents.push(last_checkpoint_block_id);
    parents.extend_from_slice(chunk);
    canonicalize_parents(&parents)
}
