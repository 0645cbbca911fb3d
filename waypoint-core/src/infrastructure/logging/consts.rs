//! Logging constants for the coordinator.

/// Log file name.
pub const LOG_FILE_NAME: &str = "waypoint.log";

/// Console log pattern (colored).
pub const LOG_LINE_PATTERN_COLORED: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l:5})}] {m} [{M}]{n}";

/// File log pattern (no colors).
pub const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l:5}] {m} [{M}]{n}";

/// Maximum log file size before rotation (50 MB).
pub const LOG_FILE_MAX_SIZE: u64 = 50_000_000;

/// Maximum number of archived log files.
pub const LOG_FILE_MAX_ROLLS: u32 = 5;

/// Our crates log at the requested level by default; everything else is
/// opt-in (whitelist approach).
pub const WHITELISTED_CRATES: &[&str] = &["waypoint_core"];
