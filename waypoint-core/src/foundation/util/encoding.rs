//! Encoding utilities for hex and helpers used across the codebase.

use crate::foundation::{CoordinatorError, Hash32};

/// Encodes bytes to lowercase hex string.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes a 32-byte hash from hex, with or without a `0x` prefix.
pub fn parse_hex_32bytes(s: &str) -> Result<Hash32, CoordinatorError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CoordinatorError::Encoding(format!("hex length mismatch: expected 32 bytes, got {}", len)))
}

/// Short hex for logs (first 8 chars).
pub fn encode_hex_short(bytes: &[u8]) -> String {
    let full = hex::encode(bytes);
    if full.len() > 8 {
        format!("{}...", &full[..8])
    } else {
        full
    }
}
