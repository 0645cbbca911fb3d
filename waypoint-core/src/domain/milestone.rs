//! Milestone and block record formats.
//!
//! Records are hashed over their deterministic binary encoding, so the same
//! inputs always produce the same ids. The encoding is bincode with fixed-int
//! encoding; field order is part of the format.

use crate::domain::receipt::ReceiptOption;
use crate::foundation::{BlockId, MerkleRoot, MilestoneId, MilestoneIndex, Result};
use bincode::Options;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The merkle roots produced by whiteflag confirmation over the subgraph
/// reachable from a milestone's parents.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MilestoneMerkleRoots {
    /// Root over all blocks referenced by the milestone.
    pub inclusion_merkle_root: MerkleRoot,
    /// Root over the referenced blocks that mutate the ledger.
    pub applied_merkle_root: MerkleRoot,
}

/// Removes duplicates and sorts the given parents.
///
/// The result is the canonical parent list used for merkle computation, the
/// quorum cross-check and the emitted record alike.
pub fn canonicalize_parents(parents: &[BlockId]) -> Vec<BlockId> {
    let mut canonical = parents.to_vec();
    canonical.sort_unstable();
    canonical.dedup();
    canonical
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MilestoneEssence {
    pub index: MilestoneIndex,
    /// Unix seconds; identical to the timestamp fed into the whiteflag
    /// computation for this milestone.
    pub timestamp: u32,
    pub previous_milestone_id: MilestoneId,
    pub parents: Vec<BlockId>,
    pub inclusion_merkle_root: MerkleRoot,
    pub applied_merkle_root: MerkleRoot,
    pub metadata: Vec<u8>,
    pub receipt: Option<ReceiptOption>,
}

impl MilestoneEssence {
    /// Deterministic binary encoding, the input to signing.
    pub fn pack(&self) -> Result<Vec<u8>> {
        Ok(packer().serialize(self)?)
    }
}

/// A single ed25519 signature over a packed [`MilestoneEssence`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MilestoneSignature {
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

// Serde is hand-written: human-readable formats carry hex strings, the
// binary form is exactly 96 raw bytes (public key, then signature) with no
// length prefixes. The signature is split into two 32-byte words on the
// binary wire because that is the widest array serde speaks natively.
impl Serialize for MilestoneSignature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            #[derive(Serialize)]
            struct Wire {
                public_key: String,
                signature: String,
            }
            Wire { public_key: hex::encode(self.public_key), signature: hex::encode(self.signature) }.serialize(serializer)
        } else {
            let mut head = [0u8; 32];
            let mut tail = [0u8; 32];
            head.copy_from_slice(&self.signature[..32]);
            tail.copy_from_slice(&self.signature[32..]);
            (self.public_key, head, tail).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for MilestoneSignature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            #[derive(Deserialize)]
            struct Wire {
                public_key: String,
                signature: String,
            }
            let wire = Wire::deserialize(deserializer)?;
            let public_key: [u8; 32] = hex::decode(&wire.public_key)
                .map_err(serde::de::Error::custom)?
                .try_into()
                .map_err(|_| serde::de::Error::custom("public key must be 32 bytes"))?;
            let signature_bytes = hex::decode(&wire.signature).map_err(serde::de::Error::custom)?;
            if signature_bytes.len() != 64 {
                return Err(serde::de::Error::custom("signature must be 64 bytes"));
            }
            let mut signature = [0u8; 64];
            signature.copy_from_slice(&signature_bytes);
            Ok(Self { public_key, signature })
        } else {
            let (public_key, head, tail): ([u8; 32], [u8; 32], [u8; 32]) = Deserialize::deserialize(deserializer)?;
            let mut signature = [0u8; 64];
            signature[..32].copy_from_slice(&head);
            signature[32..].copy_from_slice(&tail);
            Ok(Self { public_key, signature })
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MilestonePayload {
    pub essence: MilestoneEssence,
    /// Sorted by public key.
    pub signatures: Vec<MilestoneSignature>,
}

impl MilestonePayload {
    pub fn id(&self) -> Result<MilestoneId> {
        let bytes = packer().serialize(self)?;
        Ok(MilestoneId::new(*blake3::hash(&bytes).as_bytes()))
    }
}

/// The containing record broadcast to the network. Checkpoints are blocks
/// without a payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub protocol_version: u8,
    pub parents: Vec<BlockId>,
    pub payload: Option<MilestonePayload>,
}

impl Block {
    pub fn id(&self) -> Result<BlockId> {
        let bytes = packer().serialize(self)?;
        Ok(BlockId::new(*blake3::hash(&bytes).as_bytes()))
    }
}

fn packer() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}
