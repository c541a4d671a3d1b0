//! service-core: shared infrastructure for the bill-sync jobs.
pub mod config;
pub mod error;
pub mod observability;

pub use async_trait;
pub use mongodb;
pub use reqwest;
pub use secrecy;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
