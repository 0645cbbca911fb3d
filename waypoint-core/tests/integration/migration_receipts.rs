use crate::fixtures::{testbed_with, MockMigrator, MockTreasury, TestBedConfig};
use std::sync::Arc;
use waypoint_core::application::{Coordinator, Options};
use waypoint_core::domain::{LatestMilestoneInfo, MigratedFundsEntry, ReceiptOption};
use waypoint_core::foundation::MilestoneId;
use waypoint_core::infrastructure::node::LatestTreasuryOutput;
use waypoint_core::CoordinatorError;

fn entry(hash_byte: u8, deposit: u64) -> MigratedFundsEntry {
    MigratedFundsEntry { tail_transaction_hash: [hash_byte; 32], address: [0xEE; 32], deposit }
}

fn receipt() -> ReceiptOption {
    ReceiptOption { migrated_at: 7, last: false, funds: vec![entry(9, 400), entry(2, 100)], transaction: None }
}

#[tokio::test]
async fn receipt_embeds_a_treasury_transaction() {
    let migrator = Arc::new(MockMigrator::with_receipt(Some(receipt())));
    let treasury_id = MilestoneId::new([0x77; 32]);
    let bed = testbed_with(TestBedConfig {
        migrator: Some(migrator.clone()),
        treasury: Some(Arc::new(MockTreasury {
            output: LatestTreasuryOutput { milestone_id: treasury_id, amount: 10_000 },
        })),
        ..TestBedConfig::default()
    });
    bed.coordinator.init_state(true, 1, &LatestMilestoneInfo::default()).expect("init");

    bed.coordinator.bootstrap().await.expect("bootstrap");

    let sent = bed.submitter.sent.lock();
    let essence = &sent[0].0.payload.as_ref().expect("payload").essence;
    let embedded = essence.receipt.as_ref().expect("receipt");

    // funds sorted by tail hash, treasury drained by the receipt sum
    let hashes: Vec<u8> = embedded.funds.iter().map(|f| f.tail_transaction_hash[0]).collect();
    assert_eq!(hashes, vec![2, 9]);
    let transaction = embedded.transaction.expect("treasury transaction");
    assert_eq!(transaction.input_milestone_id, treasury_id);
    assert_eq!(transaction.output_amount, 10_000 - 500);

    // migrator state persisted once before and once after the send
    assert_eq!(*migrator.persists.lock(), vec![true, false]);
}

#[tokio::test]
async fn no_receipt_means_no_migrator_persistence() {
    let migrator = Arc::new(MockMigrator::with_receipt(None));
    let bed = testbed_with(TestBedConfig {
        migrator: Some(migrator.clone()),
        treasury: Some(Arc::new(MockTreasury {
            output: LatestTreasuryOutput { milestone_id: MilestoneId::null(), amount: 0 },
        })),
        ..TestBedConfig::default()
    });
    bed.coordinator.init_state(true, 1, &LatestMilestoneInfo::default()).expect("init");

    bed.coordinator.bootstrap().await.expect("bootstrap");

    let sent = bed.submitter.sent.lock();
    assert!(sent[0].0.payload.as_ref().expect("payload").essence.receipt.is_none());
    assert!(migrator.persists.lock().is_empty());
}

#[tokio::test]
async fn receipt_larger_than_the_treasury_is_critical() {
    let migrator = Arc::new(MockMigrator::with_receipt(Some(receipt())));
    let bed = testbed_with(TestBedConfig {
        migrator: Some(migrator),
        treasury: Some(Arc::new(MockTreasury {
            output: LatestTreasuryOutput { milestone_id: MilestoneId::null(), amount: 100 },
        })),
        ..TestBedConfig::default()
    });
    bed.coordinator.init_state(true, 1, &LatestMilestoneInfo::default()).expect("init");

    let err = bed.coordinator.bootstrap().await.expect_err("must fail");
    assert!(err.is_critical());
    assert_eq!(bed.submitter.sent_count(), 0);
}

#[tokio::test]
async fn migrator_without_treasury_provider_is_rejected_at_construction() {
    let bed_parts = testbed_with(TestBedConfig::default());
    let err = Coordinator::new(
        bed_parts.merkle.clone(),
        crate::fixtures::synced(),
        crate::fixtures::protocol_parameters(),
        crate::fixtures::test_signer(),
        Some(Arc::new(MockMigrator::with_receipt(None))),
        None,
        bed_parts.submitter.clone(),
        Options::default(),
    )
    .err()
    .expect("must fail");
    assert!(matches!(err, CoordinatorError::InvalidConfiguration(_)));
}
