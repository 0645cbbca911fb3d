use crate::foundation::{BlockId, CoordinatorError, MilestoneId, MilestoneIndex};
use std::sync::Arc;
use std::time::Duration;

/// Receives coordinator lifecycle events.
///
/// `on_issued_milestone` and `on_issued_checkpoint_block` fire only after
/// the corresponding durable action succeeded; `on_soft_error` fires at the
/// point the soft condition is detected.
pub trait CoordinatorObserver: Send + Sync {
    fn on_issued_checkpoint_block(&self, _checkpoint_index: u32, _chunk_index: usize, _chunk_count: usize, _block_id: BlockId) {}
    fn on_issued_milestone(&self, _index: MilestoneIndex, _milestone_id: MilestoneId, _block_id: BlockId) {}
    fn on_soft_error(&self, _error: &CoordinatorError) {}
    fn on_quorum_finished(&self, _duration: Duration, _error: Option<&CoordinatorError>) {}
}

pub struct NoopObserver;

impl CoordinatorObserver for NoopObserver {}

pub struct CompositeObserver {
    observers: Vec<Arc<dyn CoordinatorObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn CoordinatorObserver>) {
        self.observers.push(observer);
    }
}

impl Default for CompositeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatorObserver for CompositeObserver {
    fn on_issued_checkpoint_block(&self, checkpoint_index: u32, chunk_index: usize, chunk_count: usize, block_id: BlockId) {
        for observer in &self.observers {
            observer.on_issued_checkpoint_block(checkpoint_index, chunk_index, chunk_count, block_id);
        }
    }

    fn on_issued_milestone(&self, index: MilestoneIndex, milestone_id: MilestoneId, block_id: BlockId) {
        for observer in &self.observers {
            observer.on_issued_milestone(index, milestone_id, block_id);
        }
    }

    fn on_soft_error(&self, error: &CoordinatorError) {
        for observer in &self.observers {
            observer.on_soft_error(error);
        }
    }

    fn on_quorum_finished(&self, duration: Duration, error: Option<&CoordinatorError>) {
        for observer in &self.observers {
            observer.on_quorum_finished(duration, error);
        }
    }
}
