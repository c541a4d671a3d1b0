mod committer;
mod orchestrator;
mod reconciler;
mod report;

pub use committer::{BillCommitter, CommitError};
pub use orchestrator::{BillSyncOrchestrator, SyncSettings};
pub use reconciler::{reconcile, Reconciliation};
