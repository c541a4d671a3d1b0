use crate::models::{ExpenseTemplate, RunResponse, RunSummary};
use crate::services::{BillSource, ExpenseService, RecordStore, Storage};
use crate::sync::committer::BillCommitter;
use crate::sync::reconciler::{reconcile, Reconciliation};
use crate::sync::report::summarize;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::Instrument;

/// Per-deployment knobs for a sweep.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Namespace for archive keys, e.g. "octopus".
    pub source: String,
    pub lookback_days: u32,
    pub max_bills: u32,
    pub expense: ExpenseTemplate,
}

pub struct BillSyncOrchestrator {
    source: Arc<dyn BillSource>,
    records: Arc<dyn RecordStore>,
    committer: BillCommitter,
    settings: SyncSettings,
}

impl BillSyncOrchestrator {
    pub fn new(
        source: Arc<dyn BillSource>,
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn Storage>,
        expenses: Arc<dyn ExpenseService>,
        settings: SyncSettings,
    ) -> Self {
        let committer = BillCommitter::new(
            source.clone(),
            records.clone(),
            storage,
            expenses,
            settings.expense.clone(),
            settings.source.clone(),
        );

        Self {
            source,
            records,
            committer,
            settings,
        }
    }

    /// One sweep, reduced to what the invoker sees.
    pub async fn run(&self) -> Result<RunResponse, AppError> {
        let summary = self.sync().await?;
        Ok(summary.response())
    }

    /// Fetch, reconcile, then commit every new bill and backfill missing
    /// archives.
    ///
    /// Fetch and reconciliation errors abort the sweep. Anything that goes
    /// wrong for an individual bill after that lands in the summary instead.
    pub async fn sync(&self) -> Result<RunSummary, AppError> {
        let window_start = lookback_window_start(Utc::now(), self.settings.lookback_days)?;

        let bills = self
            .source
            .fetch_recent_bills(window_start, self.settings.max_bills)
            .await?;
        let fetched = bills.len();

        let Reconciliation {
            new_bills,
            unarchived,
        } = reconcile(self.records.as_ref(), bills).await?;

        tracing::info!(
            fetched,
            new_bills = new_bills.len(),
            unarchived = unarchived.len(),
            "Reconciled bills"
        );

        let commits = join_all(new_bills.iter().map(|bill| {
            let span = tracing::info_span!("commit", bill_id = %bill.id);
            async move { (bill.id.clone(), self.committer.commit(bill).await) }.instrument(span)
        }));

        let backfills = join_all(unarchived.iter().map(|bill| {
            let span = tracing::info_span!("backfill", bill_id = %bill.id);
            async move { (bill.id.clone(), self.committer.archive(bill).await) }.instrument(span)
        }));

        let (commit_outcomes, backfill_outcomes) = tokio::join!(commits, backfills);

        let summary = summarize(fetched, commit_outcomes, backfill_outcomes);
        tracing::info!(
            new_bills = summary.new_bills,
            committed = summary.committed.len(),
            failed = summary.failures.len(),
            rearchived = summary.rearchived.len(),
            "{}",
            summary.message()
        );

        Ok(summary)
    }
}

/// Start of the fetch window, `lookback_days` before `now`.
fn lookback_window_start(
    now: DateTime<Utc>,
    lookback_days: u32,
) -> Result<DateTime<Utc>, AppError> {
    Duration::try_days(i64::from(lookback_days))
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!(
                "Lookback of {} days is out of range",
                lookback_days
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_start_subtracts_days() {
        let now = Utc.with_ymd_and_hms(2024, 2, 8, 18, 0, 0).unwrap();
        let start = lookback_window_start(now, 7).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_window_start_out_of_range_is_config_error() {
        let err = lookback_window_start(Utc::now(), u32::MAX).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
