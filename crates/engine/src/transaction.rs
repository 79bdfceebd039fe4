//! Expense records and their row layout in the transactions sheet.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::grid::CellValue;

/// Number of cells in a stored row (columns `A..=F`).
pub const ROW_WIDTH: usize = 6;

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a user typed, once parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    pub amount: Decimal,
    pub category: String,
    /// Never `Some(vec![])`.
    pub tags: Option<Vec<String>>,
    pub comment: Option<String>,
}

/// A stored expense.
///
/// `message_id` is the only key: the row of a transaction is found again by
/// searching for it, rows are never addressed by number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub created_at: DateTime<Utc>,
    pub message_id: String,
    pub amount: Decimal,
    pub category: String,
    pub tags: Option<Vec<String>>,
    pub comment: Option<String>,
}

impl Transaction {
    pub fn from_input(
        input: TransactionInput,
        message_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            created_at,
            message_id: message_id.into(),
            amount: input.amount,
            category: input.category,
            tags: input.tags,
            comment: input.comment,
        }
    }

    /// Serializes the transaction into its fixed six-cell row:
    /// created-at, message id, amount, category, tags, comment.
    ///
    /// The timestamp is rendered in `timezone` so the sheet shows local time.
    /// Absent tags and comment become blank cells, which clears them on an
    /// overwrite.
    #[must_use]
    pub fn to_row(&self, timezone: Tz) -> Vec<CellValue> {
        let created_at = self
            .created_at
            .with_timezone(&timezone)
            .format(CREATED_AT_FORMAT)
            .to_string();
        let amount = self
            .amount
            .to_f64()
            .map_or_else(|| CellValue::Text(self.amount.to_string()), CellValue::Number);

        vec![
            CellValue::Text(created_at),
            CellValue::Text(self.message_id.clone()),
            amount,
            CellValue::Text(self.category.clone()),
            self.tags.as_ref().map(|tags| tags.join(",")).into(),
            self.comment.clone().into(),
        ]
    }
}
