use serde::Serialize;
use std::fmt;

/// The three writes performed for a new bill, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStep {
    Expense,
    Record,
    Archive,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStep::Expense => "expense",
            CommitStep::Record => "record",
            CommitStep::Archive => "archive",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFailure {
    pub bill_id: String,
    pub step: CommitStep,
    pub detail: String,
}

/// Everything a sweep did, for logs and tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub new_bills: usize,
    pub committed: Vec<String>,
    pub failures: Vec<CommitFailure>,
    /// Known bills whose missing archive was repaired this run.
    pub rearchived: Vec<String>,
}

impl RunSummary {
    pub fn message(&self) -> String {
        format!("Processed {} new bills", self.new_bills)
    }

    /// Per-bill failures never change the status; only fatal errors do, and
    /// those never produce a summary.
    pub fn response(&self) -> RunResponse {
        RunResponse {
            status_code: 200,
            message: self.message(),
        }
    }
}

/// What the invoker sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub status_code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_do_not_change_status() {
        let summary = RunSummary {
            fetched: 3,
            new_bills: 2,
            committed: vec!["B2".to_string()],
            failures: vec![CommitFailure {
                bill_id: "B1".to_string(),
                step: CommitStep::Expense,
                detail: "rejected".to_string(),
            }],
            rearchived: vec![],
        };

        let response = summary.response();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.message, "Processed 2 new bills");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let json = serde_json::to_value(RunSummary::default().response()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "statusCode": 200, "message": "Processed 0 new bills" })
        );
    }
}
