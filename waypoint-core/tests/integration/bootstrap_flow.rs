use crate::fixtures::{testbed, testbed_with, TestBedConfig};
use waypoint_core::domain::LatestMilestoneInfo;
use waypoint_core::foundation::{BlockId, MilestoneId};
use waypoint_core::infrastructure::state_file::{load_state, write_state};
use waypoint_core::CoordinatorError;

fn genesis_info() -> LatestMilestoneInfo {
    LatestMilestoneInfo { index: 0, timestamp: 0, milestone_id: MilestoneId::null() }
}

#[tokio::test]
async fn bootstrap_issues_the_first_milestone() {
    let bed = testbed();
    bed.coordinator.init_state(true, 1, &genesis_info()).expect("init");

    let block_id = bed.coordinator.bootstrap().await.expect("bootstrap");

    let state = bed.coordinator.state().expect("state");
    assert_eq!(state.latest_milestone_index, 1);
    assert_eq!(state.latest_milestone_block_id, block_id);

    let on_disk = load_state(&bed.state_path).expect("state file");
    assert_eq!(on_disk, state);

    // the very first milestone references only the null block id
    let sent = bed.submitter.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0.parents, vec![BlockId::null()]);
    assert_eq!(sent[0].1, Some(1));

    let payload = sent[0].0.payload.as_ref().expect("milestone payload");
    assert!(payload.essence.previous_milestone_id.is_null());
}

#[tokio::test]
async fn second_bootstrap_is_a_no_op_with_the_same_result() {
    let bed = testbed();
    bed.coordinator.init_state(true, 1, &genesis_info()).expect("init");

    let first = bed.coordinator.bootstrap().await.expect("bootstrap");
    let second = bed.coordinator.bootstrap().await.expect("bootstrap again");

    assert_eq!(first, second);
    assert_eq!(bed.submitter.sent_count(), 1);
    assert_eq!(bed.observer.milestones.lock().len(), 1);
}

#[tokio::test]
async fn bootstrap_with_existing_state_file_is_rejected() {
    let bed = testbed();
    write_state(&bed.state_path, &waypoint_core::domain::State::default()).expect("pre-existing state");

    let err = bed.coordinator.init_state(true, 1, &genesis_info()).expect_err("must fail");
    assert!(matches!(err, CoordinatorError::NetworkBootstrapped));
    assert!(err.is_critical());
}

#[tokio::test]
async fn start_index_zero_is_normalized_to_one() {
    let bed = testbed();
    bed.coordinator.init_state(true, 0, &genesis_info()).expect("init");

    bed.coordinator.bootstrap().await.expect("bootstrap");
    assert_eq!(bed.coordinator.state().expect("state").latest_milestone_index, 1);
}

#[tokio::test]
async fn later_start_requires_a_known_previous_milestone() {
    let bed = testbed();

    let unknown_previous = LatestMilestoneInfo { index: 4, timestamp: 0, milestone_id: MilestoneId::null() };
    let err = bed.coordinator.init_state(true, 5, &unknown_previous).expect_err("must fail");
    assert!(matches!(err, CoordinatorError::PreviousMilestoneUnknown));

    let known_previous = LatestMilestoneInfo { index: 4, timestamp: 0, milestone_id: MilestoneId::new([6u8; 32]) };
    bed.coordinator.init_state(true, 5, &known_previous).expect("init");

    bed.coordinator.bootstrap().await.expect("bootstrap");
    let state = bed.coordinator.state().expect("state");
    assert_eq!(state.latest_milestone_index, 5);

    let sent = bed.submitter.sent.lock();
    let payload = sent[0].0.payload.as_ref().expect("milestone payload");
    assert_eq!(payload.essence.previous_milestone_id, MilestoneId::new([6u8; 32]));
}

#[tokio::test]
async fn observed_index_must_match_the_start() {
    let bed = testbed();
    let off_by_one = LatestMilestoneInfo { index: 1, timestamp: 0, milestone_id: MilestoneId::null() };
    let err = bed.coordinator.init_state(true, 1, &off_by_one).expect_err("must fail");
    assert!(matches!(err, CoordinatorError::IndexMismatch { ours: 0, observed: 1 }));
}

#[tokio::test]
async fn issuing_before_init_state_is_rejected() {
    let bed = testbed();
    let err = bed.coordinator.bootstrap().await.expect_err("must fail");
    assert!(matches!(err, CoordinatorError::NotInitialized));
}

#[tokio::test]
async fn bootstrap_failures_are_always_critical() {
    let bed = testbed_with(TestBedConfig::default());
    bed.coordinator.init_state(true, 1, &genesis_info()).expect("init");
    bed.submitter.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    let err = bed.coordinator.bootstrap().await.expect_err("must fail");
    assert!(err.is_critical());
    assert!(bed.coordinator.state().expect("state").latest_milestone_block_id.is_null());
}
