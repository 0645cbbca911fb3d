//! Migration receipt and treasury record formats.

use crate::foundation::{Hash32, MilestoneId, MilestoneIndex};
use serde::{Deserialize, Serialize};

/// A single fund entry migrated from the legacy network.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MigratedFundsEntry {
    pub tail_transaction_hash: Hash32,
    pub address: Hash32,
    pub deposit: u64,
}

/// Moves the migrated amount out of the treasury. The input references the
/// treasury output created by the last milestone that carried a receipt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TreasuryTransaction {
    pub input_milestone_id: MilestoneId,
    pub output_amount: u64,
}

/// Receipt attached to a milestone when the migrator has accumulated entries.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReceiptOption {
    /// Index of the legacy milestone the funds were migrated at.
    pub migrated_at: MilestoneIndex,
    /// Whether this receipt is the last one for `migrated_at`.
    pub last: bool,
    pub funds: Vec<MigratedFundsEntry>,
    pub transaction: Option<TreasuryTransaction>,
}

impl ReceiptOption {
    /// Total deposit carried by this receipt.
    pub fn sum(&self) -> u64 {
        self.funds.iter().map(|entry| entry.deposit).sum()
    }

    /// Sorts funds by their tail transaction hash, the canonical order.
    pub fn sort_funds(&mut self) {
        self.funds.sort_unstable_by(|a, b| a.tail_transaction_hash.cmp(&b.tail_transaction_hash));
    }
}
