use crate::models::BillRecord;
use crate::services::record_store::RecordStore;
use async_trait::async_trait;
use mongodb::{bson::doc, Client as MongoClient, Collection, Database};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn bills(&self, collection: &str) -> Collection<BillRecord> {
        self.db.collection(collection)
    }
}

/// Bill ledger backed by a MongoDB collection keyed on `_id`.
///
/// `_id` is always indexed and unique, so no index setup is needed.
#[derive(Clone)]
pub struct MongoRecordStore {
    bills: Collection<BillRecord>,
}

impl MongoRecordStore {
    pub fn new(db: &MongoDb, collection: &str) -> Self {
        Self {
            bills: db.bills(collection),
        }
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn find_record(&self, id: &str) -> Result<Option<BillRecord>, AppError> {
        Ok(self.bills.find_one(doc! { "_id": id }, None).await?)
    }

    async fn put_record(&self, record: &BillRecord) -> Result<(), AppError> {
        self.bills.insert_one(record, None).await?;
        Ok(())
    }

    async fn mark_archived(&self, id: &str, archive_key: &str) -> Result<(), AppError> {
        let result = self
            .bills
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "archiveKey": archive_key } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No bill record with id {}",
                id
            )));
        }
        Ok(())
    }
}
