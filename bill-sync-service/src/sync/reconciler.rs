use crate::models::Bill;
use crate::services::RecordStore;
use futures::future::join_all;
use service_core::error::AppError;
use std::collections::HashSet;

/// Fetched bills split by what the ledger already knows about them.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// No record yet: these get the full commit sequence.
    pub new_bills: Vec<Bill>,
    /// Recorded, but the document never reached the blob store.
    pub unarchived: Vec<Bill>,
}

/// Looks every fetched bill up in the record store.
///
/// All lookups run concurrently and are allowed to settle. If any of them
/// failed the whole sweep stops: guessing "new" risks a duplicate expense and
/// guessing "seen" silently drops a bill.
pub async fn reconcile(
    records: &dyn RecordStore,
    bills: Vec<Bill>,
) -> Result<Reconciliation, AppError> {
    let bills = dedupe_by_id(bills);
    let checked = bills.len();

    let lookups = bills.into_iter().map(|bill| async move {
        let found = records.find_record(&bill.id).await;
        (bill, found)
    });

    let mut reconciliation = Reconciliation::default();
    let mut failed = Vec::new();

    for (bill, found) in join_all(lookups).await {
        match found {
            Ok(None) => reconciliation.new_bills.push(bill),
            Ok(Some(record)) if !record.is_archived() => {
                tracing::warn!(bill_id = %bill.id, "Known bill has no archived document");
                reconciliation.unarchived.push(bill);
            }
            Ok(Some(_)) => {
                tracing::debug!(bill_id = %bill.id, "Bill already recorded");
            }
            Err(e) => {
                tracing::error!(bill_id = %bill.id, error = %e, "Existence check failed");
                failed.push(bill.id);
            }
        }
    }

    if !failed.is_empty() {
        return Err(AppError::DatabaseError(anyhow::anyhow!(
            "{} of {} existence checks failed: {}",
            failed.len(),
            checked,
            failed.join(", ")
        )));
    }

    Ok(reconciliation)
}

/// Keeps the first occurrence of each id so a bill is never committed twice
/// in one sweep.
fn dedupe_by_id(bills: Vec<Bill>) -> Vec<Bill> {
    let mut seen = HashSet::new();
    bills
        .into_iter()
        .filter(|bill| {
            let first = seen.insert(bill.id.clone());
            if !first {
                tracing::warn!(bill_id = %bill.id, "Duplicate bill in fetch ignored");
            }
            first
        })
        .collect()
}
