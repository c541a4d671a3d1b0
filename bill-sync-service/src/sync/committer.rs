use crate::models::{Bill, BillRecord, CommitStep, Expense, ExpenseTemplate};
use crate::services::{BillSource, ExpenseService, RecordStore, Storage, PDF_CONTENT_TYPE};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

/// A bill's commit sequence stopped at `step`.
#[derive(Debug, Error)]
#[error("{step} step failed: {source}")]
pub struct CommitError {
    pub step: CommitStep,
    pub source: AppError,
}

impl CommitError {
    fn at(step: CommitStep) -> impl FnOnce(AppError) -> Self {
        move |source| Self { step, source }
    }
}

/// Runs the three ordered writes for one new bill.
pub struct BillCommitter {
    source: Arc<dyn BillSource>,
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn Storage>,
    expenses: Arc<dyn ExpenseService>,
    template: ExpenseTemplate,
    source_name: String,
}

impl BillCommitter {
    pub fn new(
        source: Arc<dyn BillSource>,
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn Storage>,
        expenses: Arc<dyn ExpenseService>,
        template: ExpenseTemplate,
        source_name: String,
    ) -> Self {
        Self {
            source,
            records,
            storage,
            expenses,
            template,
            source_name,
        }
    }

    /// Expense, then record, then archive. The expense goes first so that a
    /// bill is never marked seen without one; the record goes before the
    /// archive so a failed upload cannot lead to a second expense. A bill left
    /// recorded but unarchived is picked up by [`BillCommitter::archive`] on a
    /// later sweep.
    pub async fn commit(&self, bill: &Bill) -> Result<String, CommitError> {
        tracing::info!(bill_id = %bill.id, total = bill.total, "Registering bill");

        // A bill that cannot be recorded must never reach Splitwise.
        let record = BillRecord::from_bill(bill).map_err(CommitError::at(CommitStep::Record))?;

        self.submit_expense(bill)
            .await
            .map_err(CommitError::at(CommitStep::Expense))?;

        self.persist_record(&record)
            .await
            .map_err(CommitError::at(CommitStep::Record))?;

        let key = self
            .archive(bill)
            .await
            .map_err(CommitError::at(CommitStep::Archive))?;

        tracing::info!(bill_id = %bill.id, archive_key = %key, "Bill registered");
        Ok(key)
    }

    async fn submit_expense(&self, bill: &Bill) -> Result<(), AppError> {
        let expense = Expense::for_bill(bill, &self.template);
        tracing::info!(bill_id = %bill.id, cost = %expense.cost, "Adding bill to Splitwise");
        self.expenses.submit_expense(&expense).await?;
        Ok(())
    }

    async fn persist_record(&self, record: &BillRecord) -> Result<(), AppError> {
        tracing::info!(bill_id = %record.id, "Recording bill");
        self.records.put_record(record).await
    }

    /// Downloads the bill PDF, stores it and marks the record archived.
    /// Returns the object key.
    pub async fn archive(&self, bill: &Bill) -> Result<String, AppError> {
        let key = bill.archive_key(&self.source_name);
        tracing::info!(bill_id = %bill.id, key = %key, "Archiving bill document");

        let document = self.source.download_document(&bill.temporary_url).await?;
        self.storage
            .upload(&key, document, PDF_CONTENT_TYPE)
            .await?;
        self.records.mark_archived(&bill.id, &key).await?;

        Ok(key)
    }
}
