use crate::models::BillRecord;
use async_trait::async_trait;
use service_core::error::AppError;

/// The dedup ledger. A bill is known iff a record with its id exists.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_record(&self, id: &str) -> Result<Option<BillRecord>, AppError>;

    async fn record_exists(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.find_record(id).await?.is_some())
    }

    async fn put_record(&self, record: &BillRecord) -> Result<(), AppError>;

    /// Records that the bill's document now lives under `archive_key`.
    async fn mark_archived(&self, id: &str, archive_key: &str) -> Result<(), AppError>;
}
