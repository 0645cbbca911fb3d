use std::time::Duration;

/// Default path of the coordinator state file.
pub const DEFAULT_STATE_FILE_PATH: &str = "coordinator.state";

/// Default interval between two milestones.
pub const DEFAULT_MILESTONE_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of signing attempts before the coordinator gives up.
pub const DEFAULT_SIGNING_RETRY_AMOUNT: usize = 10;

/// Default pause between two signing attempts.
pub const DEFAULT_SIGNING_RETRY_TIMEOUT: Duration = Duration::from_secs(2);

/// Suffix appended to the state file path while an emission is in flight.
/// A leftover file with this suffix and no fresh state file means the last
/// emission aborted between broadcast and persistence and an operator has to
/// intervene.
pub const STALE_STATE_FILE_SUFFIX: &str = "_old";

/// The record format permits at most this many parents per block.
pub const MAX_BLOCK_PARENTS: usize = 8;

/// Tips per checkpoint block. One parent slot is reserved for the chain-back
/// pointer to the previous checkpoint.
pub const CHECKPOINT_MAX_TIPS: usize = MAX_BLOCK_PARENTS - 1;
