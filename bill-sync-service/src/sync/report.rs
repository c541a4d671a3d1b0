use crate::models::{CommitFailure, CommitStep, RunSummary};
use crate::sync::committer::CommitError;
use service_core::error::AppError;

/// Folds settled per-bill outcomes into a summary, logging each failure.
pub fn summarize(
    fetched: usize,
    commits: Vec<(String, Result<String, CommitError>)>,
    backfills: Vec<(String, Result<String, AppError>)>,
) -> RunSummary {
    let mut summary = RunSummary {
        fetched,
        new_bills: commits.len(),
        ..Default::default()
    };

    for (bill_id, outcome) in commits {
        match outcome {
            Ok(_) => summary.committed.push(bill_id),
            Err(e) => {
                tracing::error!(
                    bill_id = %bill_id,
                    step = %e.step,
                    error = %e.source,
                    "Failed to register bill"
                );
                summary.failures.push(CommitFailure {
                    bill_id,
                    step: e.step,
                    detail: e.source.to_string(),
                });
            }
        }
    }

    for (bill_id, outcome) in backfills {
        match outcome {
            Ok(_) => summary.rearchived.push(bill_id),
            Err(e) => {
                tracing::error!(bill_id = %bill_id, error = %e, "Failed to backfill bill archive");
                summary.failures.push(CommitFailure {
                    bill_id,
                    step: CommitStep::Archive,
                    detail: e.to_string(),
                });
            }
        }
    }

    summary
}
