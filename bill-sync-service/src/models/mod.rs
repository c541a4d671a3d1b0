pub mod bill;
pub mod expense;
pub mod summary;

pub use bill::{Bill, BillRecord};
pub use expense::{CreateExpenseResponse, Expense, ExpenseTemplate, UTILITIES_CATEGORY_ID};
pub use summary::{CommitFailure, CommitStep, RunResponse, RunSummary};
