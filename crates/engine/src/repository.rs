//! Transactions stored as rows of a grid.
//!
//! Layout of the transactions sheet:
//!
//! | row | A          | B          | C      | D        | E    | F       |
//! |-----|------------|------------|--------|----------|------|---------|
//! | 1-2 | header     |            |        |          |      |         |
//! | 3.. | created at | message id | amount | category | tags | comment |
//!
//! Rows are located by searching column B for the message id, so an update
//! or delete is always two remote calls: a scan, then a write. Nothing
//! serializes those calls: a concurrent writer moving rows in between makes
//! the write land on whatever now sits at the scanned position.

use chrono_tz::Tz;

use crate::{
    RepositoryError, StoreError,
    grid::{CellLocation, Column, GridRange, GridStore, find_value_location},
    transaction::Transaction,
};

type ResultRepository<T> = Result<T, RepositoryError>;

const fn column(letter: char) -> Column {
    match Column::from_letter(letter) {
        Some(column) => column,
        None => panic!("schema columns are single letters"),
    }
}

const FIRST_COLUMN: Column = column('A');
const MESSAGE_ID_COLUMN: Column = column('B');
const LAST_COLUMN: Column = column('F');
const FIRST_DATA_ROW: u32 = 3;

#[derive(Debug)]
pub struct TransactionRepository<S> {
    store: S,
    sheet: String,
    timezone: Tz,
    message_id_scan_range: GridRange,
    append_range: GridRange,
}

impl<S: GridStore> TransactionRepository<S> {
    /// Creates a repository over `sheet`. Timestamps are written in UTC
    /// unless [`with_timezone`](Self::with_timezone) says otherwise.
    pub fn new(store: S, sheet: impl Into<String>) -> Self {
        let sheet = sheet.into();
        let message_id_scan_range = GridRange::span(
            sheet.clone(),
            CellLocation::new(MESSAGE_ID_COLUMN, FIRST_DATA_ROW),
            CellLocation::whole_column(MESSAGE_ID_COLUMN),
        );
        let append_range = GridRange::span(
            sheet.clone(),
            CellLocation::new(FIRST_COLUMN, FIRST_DATA_ROW),
            CellLocation::whole_column(LAST_COLUMN),
        );

        Self {
            store,
            sheet,
            timezone: chrono_tz::UTC,
            message_id_scan_range,
            append_range,
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Appends `transaction` as a new row.
    pub async fn insert(&self, transaction: &Transaction) -> ResultRepository<()> {
        let row = transaction.to_row(self.timezone);
        self.store
            .append(&self.append_range, &row)
            .await
            .map_err(|err| failed("insert", &transaction.message_id, err))?;

        tracing::info!(message_id = %transaction.message_id, "transaction inserted");
        Ok(())
    }

    /// Overwrites the row holding `transaction.message_id`.
    ///
    /// Returns [`RepositoryError::TransactionNotFound`] when there is no such
    /// row; nothing is written in that case.
    pub async fn update(&self, transaction: &Transaction) -> ResultRepository<()> {
        let row = self.locate(&transaction.message_id).await?;
        let values = transaction.to_row(self.timezone);
        self.store
            .overwrite(&self.row_range(row), &values)
            .await
            .map_err(|err| failed("update", &transaction.message_id, err))?;

        tracing::info!(message_id = %transaction.message_id, row, "transaction updated");
        Ok(())
    }

    /// Clears the row holding `message_id`.
    pub async fn delete_by_message_id(&self, message_id: &str) -> ResultRepository<()> {
        let row = self.locate(message_id).await?;
        self.store
            .clear(&self.row_range(row))
            .await
            .map_err(|err| failed("delete", message_id, err))?;

        tracing::info!(message_id, row, "transaction deleted");
        Ok(())
    }

    /// Row number holding `message_id`.
    async fn locate(&self, message_id: &str) -> ResultRepository<u32> {
        let location = find_value_location(&self.store, &self.message_id_scan_range, message_id)
            .await
            .map_err(|err| failed("locate", message_id, err))?
            .ok_or_else(|| RepositoryError::TransactionNotFound(message_id.to_string()))?;

        location.row().ok_or_else(|| {
            let err = StoreError::RemoteReadFailed(format!("{location} has no row"));
            failed("locate", message_id, err)
        })
    }

    /// Columns `A..=F` of `row`.
    fn row_range(&self, row: u32) -> GridRange {
        GridRange::span(
            self.sheet.clone(),
            CellLocation::new(FIRST_COLUMN, row),
            CellLocation::new(LAST_COLUMN, row),
        )
    }
}

fn failed(operation: &str, message_id: &str, err: StoreError) -> RepositoryError {
    tracing::error!(operation, message_id, %err, "transaction storage failed");
    RepositoryError::OperationFailed(err)
}
