mod checkpoint_partitioning;
mod state_roundtrip;
