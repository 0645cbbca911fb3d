//! Time utilities for consistent timestamp handling across the codebase.

use crate::foundation::CoordinatorError;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time as unix seconds.
///
/// Milestone timestamps are 32-bit on the wire, so the value is checked
/// against that range.
pub fn unix_seconds_now() -> Result<u32, CoordinatorError> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CoordinatorError::Message(format!("system clock before epoch: {}", e)))?;
    u32::try_from(duration.as_secs()).map_err(|_| CoordinatorError::Message("timestamp overflow".to_string()))
}
