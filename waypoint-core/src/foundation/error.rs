use std::io;
use thiserror::Error;

/// Operational classification of a [`CoordinatorError`].
///
/// Soft errors are reported and may be retried after back-off; critical
/// errors halt issuance until an operator intervenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Soft,
    Critical,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("no tips given")]
    NoTipsGiven,

    #[error("node is not synced")]
    NodeNotSynced,

    #[error("node load too high")]
    NodeLoadTooHigh,

    #[error("network already bootstrapped")]
    NetworkBootstrapped,

    #[error("coordinator state not initialized")]
    NotInitialized,

    #[error("state file not found: {path}")]
    StateFileNotFound { path: String },

    #[error("previous milestone does not match latest milestone in node: previous {ours}, node {observed}")]
    IndexMismatch { ours: u32, observed: u32 },

    #[error("previous milestone id must not be the genesis id")]
    PreviousMilestoneUnknown,

    #[error("quorum merkle tree hash mismatch in group {group}")]
    QuorumMerkleHashMismatch { group: String },

    #[error("quorum group {group} did not answer in time")]
    QuorumGroupNoAnswer { group: String },

    #[error("quorum client error: {0}")]
    QuorumClient(String),

    #[error("failed to compute merkle roots: {0}")]
    MerkleRootComputation(String),

    #[error("signing failed after {attempts} attempts: {details}")]
    SigningFailed { attempts: usize, details: String },

    #[error("failed to send milestone: {0}")]
    SendBlockFailed(String),

    #[error("checkpoint {operation} failed: {details}")]
    CheckpointFailed { operation: String, details: String },

    #[error("state file error during {operation}: {details}")]
    StateFileError { operation: String, details: String },

    #[error("migrator state error: {0}")]
    MigratorState(String),

    #[error("unable to fetch unspent treasury output: {0}")]
    TreasuryFetch(String),

    #[error("configuration error: {0}")]
    InvalidConfiguration(String),

    #[error("{format} serialization error: {details}")]
    Serialization { format: String, details: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

impl CoordinatorError {
    /// Maps each variant to its operational classification.
    pub fn severity(&self) -> Severity {
        match self {
            CoordinatorError::NoTipsGiven
            | CoordinatorError::NodeNotSynced
            | CoordinatorError::NodeLoadTooHigh
            | CoordinatorError::QuorumGroupNoAnswer { .. }
            | CoordinatorError::QuorumClient(_)
            | CoordinatorError::CheckpointFailed { .. } => Severity::Soft,

            CoordinatorError::NetworkBootstrapped
            | CoordinatorError::NotInitialized
            | CoordinatorError::StateFileNotFound { .. }
            | CoordinatorError::IndexMismatch { .. }
            | CoordinatorError::PreviousMilestoneUnknown
            | CoordinatorError::QuorumMerkleHashMismatch { .. }
            | CoordinatorError::MerkleRootComputation(_)
            | CoordinatorError::SigningFailed { .. }
            | CoordinatorError::SendBlockFailed(_)
            | CoordinatorError::StateFileError { .. }
            | CoordinatorError::MigratorState(_)
            | CoordinatorError::TreasuryFetch(_)
            | CoordinatorError::InvalidConfiguration(_)
            | CoordinatorError::Serialization { .. }
            | CoordinatorError::Encoding(_)
            | CoordinatorError::Message(_) => Severity::Critical,
        }
    }

    pub fn is_soft(&self) -> bool {
        self.severity() == Severity::Soft
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Severity::Critical
    }
}

impl From<io::Error> for CoordinatorError {
    fn from(err: io::Error) -> Self {
        CoordinatorError::StateFileError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(err: serde_json::Error) -> Self {
        CoordinatorError::Serialization { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<bincode::Error> for CoordinatorError {
    fn from(err: bincode::Error) -> Self {
        CoordinatorError::Serialization { format: "bincode".to_string(), details: err.to_string() }
    }
}

impl From<hex::FromHexError> for CoordinatorError {
    fn from(err: hex::FromHexError) -> Self {
        CoordinatorError::Encoding(format!("hex decode error: {}", err))
    }
}

impl From<reqwest::Error> for CoordinatorError {
    fn from(err: reqwest::Error) -> Self {
        CoordinatorError::QuorumClient(err.to_string())
    }
}
