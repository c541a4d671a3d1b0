use crate::config::{BillSyncConfig, StorageBackend};
use crate::models::{ExpenseTemplate, RunResponse};
use crate::services::{
    BillSource, ExpenseService, LocalStorage, MongoDb, MongoRecordStore, OctopusClient,
    RecordStore, S3Storage, SplitwiseClient, Storage,
};
use crate::sync::{BillSyncOrchestrator, SyncSettings};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Arc;

/// A fully wired sweep, built once per invocation from configuration.
pub struct Application {
    orchestrator: BillSyncOrchestrator,
}

impl Application {
    pub async fn build(config: BillSyncConfig) -> Result<Self, AppError> {
        let source: Arc<dyn BillSource> = Arc::new(OctopusClient::new(config.octopus.clone())?);
        let expenses: Arc<dyn ExpenseService> =
            Arc::new(SplitwiseClient::new(config.splitwise.clone())?);

        let db = MongoDb::connect(
            config.mongodb.uri.expose_secret(),
            &config.mongodb.database,
        )
        .await?;
        db.health_check().await?;
        let records: Arc<dyn RecordStore> =
            Arc::new(MongoRecordStore::new(&db, &config.mongodb.collection));

        let storage = build_storage(&config).await?;

        let settings = SyncSettings {
            source: config.sync.source.clone(),
            lookback_days: config.sync.lookback_days,
            max_bills: config.sync.max_bills,
            expense: ExpenseTemplate {
                group_id: config.splitwise.group_id,
                currency_code: config.splitwise.currency_code.clone(),
            },
        };

        let orchestrator = BillSyncOrchestrator::new(source, records, storage, expenses, settings);

        Ok(Self { orchestrator })
    }

    pub async fn run(&self) -> Result<RunResponse, AppError> {
        self.orchestrator.run().await
    }
}

async fn build_storage(config: &BillSyncConfig) -> Result<Arc<dyn Storage>, AppError> {
    match config.storage.backend {
        StorageBackend::Local => {
            let storage = LocalStorage::new(&config.storage.local_path)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?;
            Ok(Arc::new(storage))
        }
        StorageBackend::S3 => {
            let bucket = config.storage.s3_bucket.clone().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("STORAGE_S3_BUCKET is not set"))
            })?;
            tracing::info!(bucket = %bucket, region = %config.storage.s3_region, "Using S3 storage");
            Ok(Arc::new(
                S3Storage::from_env(bucket, config.storage.s3_region.clone()).await,
            ))
        }
    }
}
