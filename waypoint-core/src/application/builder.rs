//! Record assembly: turning issuance parameters into signed milestone blocks
//! and payloadless checkpoint blocks.

use crate::domain::{Block, MilestoneEssence, MilestoneMerkleRoots, MilestonePayload, ReceiptOption};
use crate::foundation::{BlockId, CoordinatorError, MilestoneId, MilestoneIndex, Result};
use crate::infrastructure::node::ProtocolParameters;
use crate::infrastructure::signer::MilestoneSignerProvider;
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Builds and signs a milestone block. Parents must already be canonical.
///
/// Signing is retried with a fixed pause; once the attempts are exhausted
/// the failure is critical and the coordinator has to stop.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn build_signed_milestone(
    signer: &Arc<dyn MilestoneSignerProvider>,
    protocol_parameters: &ProtocolParameters,
    index: MilestoneIndex,
    timestamp: u32,
    parents: Vec<BlockId>,
    receipt: Option<ReceiptOption>,
    previous_milestone_id: MilestoneId,
    roots: &MilestoneMerkleRoots,
    signing_retry_amount: usize,
    signing_retry_timeout: Duration,
) -> Result<Block> {
    let essence = MilestoneEssence {
        index,
        timestamp,
        previous_milestone_id,
        parents: parents.clone(),
        inclusion_merkle_root: roots.inclusion_merkle_root,
        applied_merkle_root: roots.applied_merkle_root,
        metadata: Vec::new(),
        receipt,
    };
    let packed = essence.pack()?;

    // Signing is retried in place with a fixed pause between attempts; the
    // attempt count travels with the surfaced error so operators can see how
    // long the signer was unreachable.
    let mut attempt = 0;
    let signatures = loop {
        attempt += 1;
        match signer.sign(&packed).await {
            Ok(signatures) => break signatures,
            Err(err) if attempt < signing_retry_amount => {
                warn!("milestone {} signing attempt {}/{} failed: {}", index, attempt, signing_retry_amount, err);
                sleep(signing_retry_timeout).await;
            }
            Err(err) => {
                return Err(CoordinatorError::SigningFailed { attempts: attempt, details: err.to_string() });
            }
        }
    };

    if signatures.len() != signer.public_key_count() {
        return Err(CoordinatorError::SigningFailed {
            attempts: attempt,
            details: format!("expected {} signatures, got {}", signer.public_key_count(), signatures.len()),
        });
    }

    Ok(Block {
        protocol_version: protocol_parameters.protocol_version,
        parents,
        payload: Some(MilestonePayload { essence, signatures }),
    })
}

/// A checkpoint is a bare block referencing its parents.
pub(crate) fn build_checkpoint_block(protocol_parameters: &ProtocolParameters, parents: Vec<BlockId>) -> Block {
    Block { protocol_version: protocol_parameters.protocol_version, parents, payload: None }
}
