use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// A bill as fetched from the supplier. Lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bill {
    pub id: String,
    pub bill_type: String,
    pub from_date: String,
    pub to_date: String,
    pub issued_date: String,
    /// Gross total in minor units (pence).
    pub total: u64,
    /// Short-lived signed download link; never persisted.
    pub temporary_url: String,
}

impl Bill {
    /// Object key the bill's PDF is archived under.
    pub fn archive_key(&self, source: &str) -> String {
        format!("{}/{}.pdf", source, self.id)
    }
}

/// The persisted form of a bill. Its presence is what marks a bill as seen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub bill_type: String,
    pub from_date: String,
    pub to_date: String,
    pub issued_date: String,
    pub total: i64,
    /// Set once the document is in the blob store.
    #[serde(default)]
    pub archive_key: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub recorded_at: DateTime<Utc>,
}

impl BillRecord {
    /// Fails if the total does not fit BSON's signed 64-bit integer.
    pub fn from_bill(bill: &Bill) -> Result<Self, AppError> {
        let total = i64::try_from(bill.total).map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!(
                "Bill {} total {} cannot be recorded",
                bill.id,
                bill.total
            ))
        })?;

        Ok(Self {
            id: bill.id.clone(),
            bill_type: bill.bill_type.clone(),
            from_date: bill.from_date.clone(),
            to_date: bill.to_date.clone(),
            issued_date: bill.issued_date.clone(),
            total,
            archive_key: None,
            recorded_at: Utc::now(),
        })
    }

    pub fn is_archived(&self) -> bool {
        self.archive_key.is_some()
    }
}
