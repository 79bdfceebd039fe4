//! The module contains the errors the engine can return.
//!
//! The errors are grouped by layer:
//!
//! - [`ParseError`] returned when a chat message is not a valid transaction.
//! - [`CoordinateError`] returned when a column letter or index is outside `A..=Z`.
//! - [`StoreError`] returned by a [`GridStore`] when the remote call fails.
//! - [`RepositoryError`] returned by the [`TransactionRepository`].
//!
//!  [`GridStore`]: crate::grid::GridStore
//!  [`TransactionRepository`]: crate::repository::TransactionRepository
use thiserror::Error;

/// Reasons a message cannot be turned into a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("amount is missing")]
    MissingAmount,
    #[error("invalid amount format: \"{0}\"")]
    InvalidAmountFormat(String),
    #[error("category is missing")]
    MissingCategory,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("\"{0}\" is not a column letter (A-Z)")]
    InvalidColumn(char),
    #[error("column index {0} is outside 1..=26")]
    ColumnOutOfRange(usize),
}

/// Failures of the primitive grid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("remote read failed: {0}")]
    RemoteReadFailed(String),
    #[error("remote write failed: {0}")]
    RemoteWriteFailed(String),
    #[error(transparent)]
    OutOfGrid(#[from] CoordinateError),
}

/// Repository errors.
///
/// [`TransactionNotFound`] is an expected outcome: callers usually fall back
/// to an insert. Everything else is an [`OperationFailed`].
///
///  [`TransactionNotFound`]: RepositoryError::TransactionNotFound
///  [`OperationFailed`]: RepositoryError::OperationFailed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("transaction for message \"{0}\" not found")]
    TransactionNotFound(String),
    #[error("storage operation failed: {0}")]
    OperationFailed(#[from] StoreError),
}
