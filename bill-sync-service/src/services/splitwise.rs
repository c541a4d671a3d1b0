//! Splitwise expense client.

use crate::config::SplitwiseConfig;
use crate::models::{CreateExpenseResponse, Expense};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::observability::TracedClientExt;

/// The shared-expense ledger.
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// Fails if the call fails or the response carries any error.
    async fn submit_expense(&self, expense: &Expense) -> Result<CreateExpenseResponse, AppError>;
}

#[derive(Clone)]
pub struct SplitwiseClient {
    client: Client,
    config: SplitwiseConfig,
}

impl SplitwiseClient {
    pub fn new(config: SplitwiseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn create_expense_url(&self) -> String {
        format!(
            "{}/create_expense",
            self.config.api_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ExpenseService for SplitwiseClient {
    async fn submit_expense(&self, expense: &Expense) -> Result<CreateExpenseResponse, AppError> {
        let response = self
            .client
            .traced_post(&self.create_expense_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(expense)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Splitwise create_expense response");

        if !status.is_success() {
            return Err(AppError::BadGateway(format!(
                "Splitwise returned {}: {}",
                status, body
            )));
        }

        let result: CreateExpenseResponse = serde_json::from_str(&body)?;
        if result.has_errors() {
            tracing::error!(errors = %result.errors, "Splitwise rejected expense");
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Splitwise rejected expense: {}",
                result.errors
            )));
        }

        tracing::info!(
            expense_id = ?result.expense_id(),
            cost = %expense.cost,
            "Splitwise expense created"
        );
        Ok(result)
    }
}
