//! Incremental reuse
//!
//! Files whose content digest matches the previous run's snapshot keep
//! their stored facts; everything else is scanned again.
//!
//! @module incremental

pub mod reuse;
pub mod snapshot;
pub mod storage;

pub use reuse::{apply_snapshot, compute_digests, ReuseStats};
pub use snapshot::Snapshot;
pub use storage::{load_previous, load_snapshot, save_snapshot};
