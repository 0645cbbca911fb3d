//! Application layer: orchestration across domain logic and infrastructure I/O.

pub(crate) mod builder;
pub mod coordinator;
pub mod lifecycle;

pub use coordinator::{Coordinator, Options, QuorumConfig};
pub use lifecycle::{CompositeObserver, CoordinatorObserver, NoopObserver};
