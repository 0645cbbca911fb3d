use crate::fixtures::{block_id, testbed};
use waypoint_core::domain::{LatestMilestoneInfo, State};
use waypoint_core::foundation::{BlockId, MilestoneId};
use waypoint_core::infrastructure::state_file::write_state;
use waypoint_core::CoordinatorError;

fn stored_state() -> State {
    State {
        latest_milestone_index: 12,
        latest_milestone_id: MilestoneId::new([3u8; 32]),
        latest_milestone_block_id: BlockId::new([4u8; 32]),
        latest_milestone_time: 1_700_000_000,
    }
}

#[tokio::test]
async fn resume_continues_from_the_stored_state() {
    let bed = testbed();
    write_state(&bed.state_path, &stored_state()).expect("seed state file");

    let observed = LatestMilestoneInfo { index: 12, timestamp: 0, milestone_id: stored_state().latest_milestone_id };
    bed.coordinator.init_state(false, 0, &observed).expect("resume");
    assert_eq!(bed.coordinator.state().expect("state"), stored_state());

    // a resumed coordinator is bootstrapped: bootstrap() is a no-op
    let block_id_result = bed.coordinator.bootstrap().await.expect("bootstrap no-op");
    assert_eq!(block_id_result, stored_state().latest_milestone_block_id);
    assert_eq!(bed.submitter.sent_count(), 0);

    bed.coordinator.issue_milestone(vec![block_id(1)]).await.expect("issue");
    assert_eq!(bed.coordinator.state().expect("state").latest_milestone_index, 13);
}

#[tokio::test]
async fn resume_with_missing_state_file_is_fatal() {
    let bed = testbed();
    let err = bed.coordinator.init_state(false, 0, &LatestMilestoneInfo::default()).expect_err("must fail");
    assert!(matches!(err, CoordinatorError::StateFileNotFound { .. }));
    assert!(err.is_critical());
}

#[tokio::test]
async fn resume_with_diverging_node_view_is_fatal() {
    let bed = testbed();
    write_state(&bed.state_path, &stored_state()).expect("seed state file");

    let observed = LatestMilestoneInfo { index: 11, timestamp: 0, milestone_id: MilestoneId::null() };
    let err = bed.coordinator.init_state(false, 0, &observed).expect_err("must fail");
    assert!(matches!(err, CoordinatorError::IndexMismatch { ours: 12, observed: 11 }));
}

#[tokio::test]
async fn corrupt_state_file_does_not_load() {
    let bed = testbed();
    std::fs::write(&bed.state_path, b"{not json").expect("write garbage");

    let err = bed.coordinator.init_state(false, 0, &LatestMilestoneInfo::default()).expect_err("must fail");
    assert!(matches!(err, CoordinatorError::Serialization { .. }));
}
