pub mod database;
pub mod octopus;
pub mod record_store;
pub mod splitwise;
pub mod storage;

pub use database::{MongoDb, MongoRecordStore};
pub use octopus::{BillSource, OctopusClient};
pub use record_store::RecordStore;
pub use splitwise::{ExpenseService, SplitwiseClient};
pub use storage::{LocalStorage, S3Storage, Storage, PDF_CONTENT_TYPE};
