use crate::fixtures::block_id;
use waypoint_core::domain::checkpoint::{checkpoint_parents, chunk_count, tip_chunks};
use waypoint_core::foundation::MAX_BLOCK_PARENTS;

fn tips(n: usize) -> Vec<waypoint_core::foundation::BlockId> {
    (0..n).map(|i| block_id(i as u8 + 1)).collect()
}

#[test]
fn test_chunk_count_when_ten_tips_then_two_checkpoints() {
    assert_eq!(chunk_count(10), 2);
}

#[test]
fn test_chunk_count_when_fifteen_tips_then_three_checkpoints() {
    assert_eq!(chunk_count(15), 3);
}

#[test]
fn fifteen_tips_chunk_into_seven_seven_one() {
    let tips = tips(15);
    let sizes: Vec<usize> = tip_chunks(&tips).map(<[_]>::len).collect();
    assert_eq!(sizes, vec![7, 7, 1]);
}

#[test]
fn ten_tips_chunk_into_seven_three() {
    let tips = tips(10);
    let sizes: Vec<usize> = tip_chunks(&tips).map(<[_]>::len).collect();
    assert_eq!(sizes, vec![7, 3]);
}

#[test]
fn full_chunk_with_chain_pointer_hits_the_parent_limit() {
    let tips = tips(7);
    let parents = checkpoint_parents(block_id(0xFF), &tips);
    assert_eq!(parents.len(), MAX_BLOCK_PARENTS);
}

#[test]
fn checkpoint_parents_are_sorted_and_unique() {
    let tips = vec![block_id(5), block_id(2), block_id(5)];
    let parents = checkpoint_parents(block_id(9), &tips);
    assert_eq!(parents, vec![block_id(2), block_id(5), block_id(9)]);
}
