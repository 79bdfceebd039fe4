//! Expense tracking core.
//!
//! Turns chat messages such as `9,5 lunch (grenka, dumplings) I need food!`
//! into [`Transaction`]s and keeps them as rows of a spreadsheet-like grid,
//! keyed by the id of the message they came from.
//!
//! - [`parse_transaction_input`] implements the message grammar.
//! - [`grid`] holds A1 coordinates, the [`GridStore`] trait and the value search.
//! - [`TransactionRepository`] maps insert/update/delete onto grid ranges.

pub use error::{CoordinateError, ParseError, RepositoryError, StoreError};
pub use grid::GridStore;
pub use parsing::parse_transaction_input;
pub use repository::TransactionRepository;
pub use transaction::{ROW_WIDTH, Transaction, TransactionInput};

// Re-exported so adapters can build amounts and timezones without extra deps.
pub use chrono_tz::Tz;
pub use rust_decimal::Decimal;

mod error;
pub mod grid;
mod parsing;
mod repository;
mod transaction;
