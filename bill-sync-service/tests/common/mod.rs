#![allow(dead_code)]

use async_trait::async_trait;
use bill_sync_service::models::{Bill, BillRecord, CreateExpenseResponse, Expense, ExpenseTemplate};
use bill_sync_service::services::{BillSource, ExpenseService, RecordStore, Storage};
use bill_sync_service::sync::{BillSyncOrchestrator, SyncSettings};
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

pub const TEST_GROUP_ID: i64 = 4242;

pub fn bill(id: &str, total: u64) -> Bill {
    Bill {
        id: id.to_string(),
        bill_type: "STATEMENT".to_string(),
        from_date: "2024-01-01".to_string(),
        to_date: "2024-01-31".to_string(),
        issued_date: "2024-02-03".to_string(),
        total,
        temporary_url: format!("https://kraken.example/bills/{}.pdf?sig=abc", id),
    }
}

pub fn pdf_bytes(id: &str) -> Vec<u8> {
    format!("%PDF-1.7 {}", id).into_bytes()
}

pub fn settings() -> SyncSettings {
    SyncSettings {
        source: "octopus".to_string(),
        lookback_days: 7,
        max_bills: 10,
        expense: ExpenseTemplate {
            group_id: TEST_GROUP_ID,
            currency_code: "GBP".to_string(),
        },
    }
}

/// Bill source serving a fixed page of bills.
#[derive(Default)]
pub struct FakeBillSource {
    bills: Mutex<Vec<Bill>>,
    fail_fetch: bool,
    failing_downloads: Mutex<HashSet<String>>,
    pub fetch_calls: Mutex<Vec<(DateTime<Utc>, u32)>>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeBillSource {
    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            bills: Mutex::new(bills),
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail_fetch: true,
            ..Default::default()
        }
    }

    pub fn failing_download(self, bill_id: &str) -> Self {
        self.failing_downloads
            .lock()
            .unwrap()
            .insert(bill_id.to_string());
        self
    }

    /// Later sweeps see freshly signed URLs that work again.
    pub fn heal_downloads(&self) {
        self.failing_downloads.lock().unwrap().clear();
    }
}

#[async_trait]
impl BillSource for FakeBillSource {
    async fn fetch_recent_bills(
        &self,
        window_start: DateTime<Utc>,
        max_count: u32,
    ) -> Result<Vec<Bill>, AppError> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push((window_start, max_count));
        if self.fail_fetch {
            return Err(AppError::BadGateway("Kraken API unreachable".to_string()));
        }
        Ok(self.bills.lock().unwrap().clone())
    }

    async fn download_document(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.downloads.lock().unwrap().push(url.to_string());

        let bill = self
            .bills
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.temporary_url == url)
            .cloned()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("unknown url {}", url)))?;

        if self.failing_downloads.lock().unwrap().contains(&bill.id) {
            return Err(AppError::BadGateway(
                "Bill download returned 403 Forbidden".to_string(),
            ));
        }
        Ok(pdf_bytes(&bill.id))
    }
}

/// Record store held in a map, with per-id failure injection.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, BillRecord>>,
    failing_lookups: HashSet<String>,
    failing_puts: HashSet<String>,
    pub puts: Mutex<Vec<String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: BillRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
        self
    }

    pub fn with_archived(self, bill: &Bill) -> Self {
        let mut record = BillRecord::from_bill(bill).unwrap();
        record.archive_key = Some(format!("octopus/{}.pdf", bill.id));
        self.with_record(record)
    }

    pub fn failing_lookup(mut self, id: &str) -> Self {
        self.failing_lookups.insert(id.to_string());
        self
    }

    pub fn failing_put(mut self, id: &str) -> Self {
        self.failing_puts.insert(id.to_string());
        self
    }

    pub fn get(&self, id: &str) -> Option<BillRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_record(&self, id: &str) -> Result<Option<BillRecord>, AppError> {
        if self.failing_lookups.contains(id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "lookup timed out for {}",
                id
            )));
        }
        Ok(self.get(id))
    }

    async fn put_record(&self, record: &BillRecord) -> Result<(), AppError> {
        self.puts.lock().unwrap().push(record.id.clone());
        if self.failing_puts.contains(&record.id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "write rejected for {}",
                record.id
            )));
        }

        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "duplicate key {}",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn mark_archived(&self, id: &str, archive_key: &str) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No bill record with id {}", id)))?;
        record.archive_key = Some(archive_key.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

type Rejection = Box<dyn Fn(&Expense) -> bool + Send + Sync>;

/// Expense ledger that accepts everything unless told otherwise.
#[derive(Default)]
pub struct FakeExpenseService {
    reject_if: Option<Rejection>,
    rendezvous: Option<Arc<Barrier>>,
    pub submitted: Mutex<Vec<Expense>>,
}

impl FakeExpenseService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers like Splitwise does for a bad payload: 200 with errors.
    pub fn rejecting<F>(predicate: F) -> Self
    where
        F: Fn(&Expense) -> bool + Send + Sync + 'static,
    {
        Self {
            reject_if: Some(Box::new(predicate)),
            ..Default::default()
        }
    }

    /// Every submission waits until `parties` submissions are in flight.
    pub fn with_rendezvous(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn submitted(&self) -> Vec<Expense> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExpenseService for FakeExpenseService {
    async fn submit_expense(&self, expense: &Expense) -> Result<CreateExpenseResponse, AppError> {
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }

        self.submitted.lock().unwrap().push(expense.clone());

        let rejected = self.reject_if.as_ref().is_some_and(|reject| reject(expense));
        if rejected {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Splitwise rejected expense: {{\"base\":[\"Invalid cost\"]}}"
            )));
        }

        Ok(CreateExpenseResponse {
            expenses: vec![serde_json::json!({ "id": 1 })],
            errors: serde_json::json!({}),
        })
    }
}

/// Fakes for every collaborator, kept around for inspection after a run.
pub struct Harness {
    pub source: Arc<FakeBillSource>,
    pub records: Arc<InMemoryRecordStore>,
    pub storage: Arc<InMemoryStorage>,
    pub expenses: Arc<FakeExpenseService>,
}

impl Harness {
    pub fn new(
        source: FakeBillSource,
        records: InMemoryRecordStore,
        expenses: FakeExpenseService,
    ) -> Self {
        Self {
            source: Arc::new(source),
            records: Arc::new(records),
            storage: Arc::new(InMemoryStorage::new()),
            expenses: Arc::new(expenses),
        }
    }

    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self::new(
            FakeBillSource::with_bills(bills),
            InMemoryRecordStore::new(),
            FakeExpenseService::new(),
        )
    }

    pub fn orchestrator(&self) -> BillSyncOrchestrator {
        self.orchestrator_with(settings())
    }

    pub fn orchestrator_with(&self, settings: SyncSettings) -> BillSyncOrchestrator {
        BillSyncOrchestrator::new(
            self.source.clone(),
            self.records.clone(),
            self.storage.clone(),
            self.expenses.clone(),
            settings,
        )
    }
}
