use crate::models::Bill;
use serde::{Deserialize, Serialize};

/// Splitwise's "Utilities" category.
pub const UTILITIES_CATEGORY_ID: u32 = 1;

/// Settings that stay fixed for a deployment and shape every expense.
#[derive(Debug, Clone)]
pub struct ExpenseTemplate {
    pub group_id: i64,
    pub currency_code: String,
}

/// Request body for Splitwise's `create_expense`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    /// Decimal amount with two fraction digits, e.g. "10.50".
    pub cost: String,
    pub description: String,
    pub details: String,
    pub date: String,
    pub repeat_interval: String,
    pub currency_code: String,
    pub category_id: u32,
    pub group_id: i64,
    pub split_equally: bool,
}

impl Expense {
    pub fn for_bill(bill: &Bill, template: &ExpenseTemplate) -> Self {
        Self {
            cost: format_minor_units(bill.total),
            description: bill.bill_type.clone(),
            details: format!(
                "Octopus Energy Bill from {} to {}",
                bill.from_date, bill.to_date
            ),
            date: bill.issued_date.clone(),
            repeat_interval: "never".to_string(),
            currency_code: template.currency_code.clone(),
            category_id: UTILITIES_CATEGORY_ID,
            group_id: template.group_id,
            split_equally: true,
        }
    }
}

/// Renders pence as a major-unit decimal string without going through floats.
pub fn format_minor_units(total: u64) -> String {
    format!("{}.{:02}", total / 100, total % 100)
}

/// Response from `create_expense`.
///
/// Splitwise reports validation problems with a 200 status and a populated
/// `errors` member, which may be an object, an array or a bare string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateExpenseResponse {
    #[serde(default)]
    pub expenses: Vec<serde_json::Value>,
    #[serde(default)]
    pub errors: serde_json::Value,
}

impl CreateExpenseResponse {
    pub fn has_errors(&self) -> bool {
        match &self.errors {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Array(items) => !items.is_empty(),
            serde_json::Value::Object(map) => map.values().any(|v| match v {
                serde_json::Value::Array(items) => !items.is_empty(),
                serde_json::Value::Null => false,
                _ => true,
            }),
            serde_json::Value::Number(_) => true,
        }
    }

    pub fn expense_id(&self) -> Option<i64> {
        self.expenses
            .first()
            .and_then(|e| e.get("id"))
            .and_then(|id| id.as_i64())
    }
}
