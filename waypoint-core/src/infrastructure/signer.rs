//! Milestone signing seam.
//!
//! Key management lives outside the coordinator; signing is a blob-in,
//! signatures-out interface. The in-tree ed25519 provider serves tests and
//! single-operator deployments where the keys are held in process.

use crate::domain::MilestoneSignature;
use crate::foundation::{CoordinatorError, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};

#[async_trait]
pub trait MilestoneSignerProvider: Send + Sync {
    /// Number of public keys this provider signs with.
    fn public_key_count(&self) -> usize;

    /// Signs the packed milestone essence with every key.
    ///
    /// Returns the signatures sorted by public key; with the same key set
    /// and the same essence the result is byte-identical across calls.
    async fn sign(&self, essence: &[u8]) -> Result<Vec<MilestoneSignature>>;
}

/// Signs with a fixed set of in-memory ed25519 keys.
pub struct Ed25519SignerProvider {
    keys: Vec<SigningKey>,
}

impl Ed25519SignerProvider {
    pub fn new(keys: Vec<SigningKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(CoordinatorError::InvalidConfiguration("signer provider needs at least one key".to_string()));
        }
        Ok(Self { keys })
    }

    pub fn from_seeds(seeds: &[[u8; 32]]) -> Result<Self> {
        Self::new(seeds.iter().map(SigningKey::from_bytes).collect())
    }
}

#[async_trait]
impl MilestoneSignerProvider for Ed25519SignerProvider {
    fn public_key_count(&self) -> usize {
        self.keys.len()
    }

    async fn sign(&self, essence: &[u8]) -> Result<Vec<MilestoneSignature>> {
        let mut signatures: Vec<MilestoneSignature> = self
            .keys
            .iter()
            .map(|key| MilestoneSignature {
                public_key: key.verifying_key().to_bytes(),
                signature: key.sign(essence).to_bytes(),
            })
            .collect();
        signatures.sort_unstable_by(|a, b| a.public_key.cmp(&b.public_key));
        Ok(signatures)
    }
}
