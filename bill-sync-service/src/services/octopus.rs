//! Octopus Energy (Kraken) GraphQL client.
//!
//! Authenticates with an account API key, lists the most recent bills on an
//! account and downloads bill PDFs from their signed temporary URLs.

use crate::config::OctopusConfig;
use crate::models::Bill;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use service_core::observability::TracedClientExt;

/// Where bills come from.
#[async_trait]
pub trait BillSource: Send + Sync {
    /// Bills issued after `window_start`, at most `max_count` of them.
    async fn fetch_recent_bills(
        &self,
        window_start: DateTime<Utc>,
        max_count: u32,
    ) -> Result<Vec<Bill>, AppError>;

    /// Downloads a bill document. Only valid while the URL's signature is.
    async fn download_document(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

const LOGIN_MUTATION: &str = r#"
mutation ObtainKrakenToken($apiKey: String!) {
    obtainKrakenToken(input: { APIKey: $apiKey }) {
        token
    }
}
"#;

const BILLS_QUERY: &str = r#"
query Account($accountNumber: String!, $first: Int, $fromDate: String) {
    account(accountNumber: $accountNumber) {
        id
        number
        bills(first: $first, after: $fromDate) {
            edges {
                node {
                    id
                    billType
                    fromDate
                    toDate
                    temporaryUrl
                    issuedDate
                    ... on StatementType {
                        totalCharges {
                            grossTotal
                        }
                    }
                }
            }
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

impl<T> GraphQlResponse<T> {
    fn error_messages(&self) -> Option<String> {
        let errors = self.errors.as_deref().filter(|e| !e.is_empty())?;
        Some(
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    obtain_kraken_token: Option<TokenPayload>,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    account: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    bills: Option<BillConnection>,
}

#[derive(Debug, Deserialize)]
struct BillConnection {
    #[serde(default)]
    edges: Vec<BillEdge>,
}

#[derive(Debug, Deserialize)]
struct BillEdge {
    node: BillNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillNode {
    id: String,
    bill_type: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    issued_date: Option<String>,
    temporary_url: Option<String>,
    total_charges: Option<TotalCharges>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCharges {
    gross_total: Option<i64>,
}

impl BillNode {
    /// Bills we cannot split or archive are reported as `Err(reason)`.
    fn into_bill(self) -> Result<Bill, String> {
        // The id becomes part of the archive key.
        let id_is_plain = !self.id.is_empty()
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !id_is_plain {
            return Err(format!("bill id {:?} is not usable as a key", self.id));
        }

        let gross_total = self
            .total_charges
            .and_then(|c| c.gross_total)
            .ok_or_else(|| "bill has no gross total".to_string())?;
        let total = u64::try_from(gross_total)
            .map_err(|_| format!("bill total {} is negative", gross_total))?;
        let temporary_url = self
            .temporary_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "bill has no download URL".to_string())?;

        Ok(Bill {
            id: self.id,
            bill_type: self.bill_type.unwrap_or_default(),
            from_date: self.from_date.unwrap_or_default(),
            to_date: self.to_date.unwrap_or_default(),
            issued_date: self.issued_date.unwrap_or_default(),
            total,
            temporary_url,
        })
    }
}

#[derive(Clone)]
pub struct OctopusClient {
    client: Client,
    config: OctopusConfig,
}

impl OctopusClient {
    pub fn new(config: OctopusConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        token: Option<&str>,
    ) -> Result<GraphQlResponse<T>, AppError> {
        let mut request = self
            .client
            .traced_post(&self.config.api_url)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Kraken API request failed");
            return Err(AppError::BadGateway(format!(
                "Kraken API returned {}: {}",
                status, body
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Exchanges the API key for a short-lived Kraken token.
    pub async fn obtain_token(&self) -> Result<String, AppError> {
        let response: GraphQlResponse<TokenData> = self
            .graphql(
                LOGIN_MUTATION,
                json!({ "apiKey": self.config.api_key.expose_secret() }),
                None,
            )
            .await?;

        if let Some(messages) = response.error_messages() {
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Kraken token request rejected: {}",
                messages
            )));
        }

        response
            .data
            .and_then(|d| d.obtain_kraken_token)
            .and_then(|t| t.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("No token returned")))
    }

    pub async fn get_bills(
        &self,
        token: &str,
        window_start: DateTime<Utc>,
        first: u32,
    ) -> Result<Vec<Bill>, AppError> {
        let from_date = window_start.to_rfc3339_opts(SecondsFormat::Millis, true);
        tracing::debug!(from_date = %from_date, first, "Querying Kraken bills");

        let response: GraphQlResponse<AccountData> = self
            .graphql(
                BILLS_QUERY,
                json!({
                    "accountNumber": self.config.account_number,
                    "first": first,
                    "fromDate": from_date,
                }),
                Some(token),
            )
            .await?;

        if let Some(messages) = response.error_messages() {
            return Err(AppError::BadGateway(format!(
                "Kraken bills query failed: {}",
                messages
            )));
        }

        let edges = response
            .data
            .and_then(|d| d.account)
            .ok_or_else(|| {
                AppError::BadGateway(format!(
                    "Account {} not returned by Kraken",
                    self.config.account_number
                ))
            })?
            .bills
            .map(|b| b.edges)
            .unwrap_or_default();

        let mut bills = Vec::with_capacity(edges.len());
        for edge in edges {
            let id = edge.node.id.clone();
            match edge.node.into_bill() {
                Ok(bill) => bills.push(bill),
                Err(reason) => {
                    tracing::warn!(bill_id = %id, reason = %reason, "Skipping bill");
                }
            }
        }

        Ok(bills)
    }
}

#[async_trait]
impl BillSource for OctopusClient {
    async fn fetch_recent_bills(
        &self,
        window_start: DateTime<Utc>,
        max_count: u32,
    ) -> Result<Vec<Bill>, AppError> {
        let token = self.obtain_token().await?;
        let bills = self.get_bills(&token, window_start, max_count).await?;
        tracing::info!(count = bills.len(), "Found bills");
        Ok(bills)
    }

    async fn download_document(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.client.traced_get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BadGateway(format!(
                "Bill download returned {}",
                status
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
