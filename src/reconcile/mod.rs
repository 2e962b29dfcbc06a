//! Batch reconciliation: the work queue and the async driver.

mod driver;
mod queue;

pub use driver::{BatchDriver, BatchSummary, ReconcileError};
pub use queue::{MAX_CASCADE_DEPTH, WorkItem, WorkQueue};
