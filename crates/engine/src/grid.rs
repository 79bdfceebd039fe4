//! Grid storage abstraction.
//!
//! A [`GridStore`] exposes the four primitive operations the repository needs
//! against a range-addressed store: append a row, overwrite a row, clear a
//! range and fetch the values of a range. Ranges are described with
//! [`GridRange`] and rendered in A1 notation.

use std::future::Future;

pub use cell::CellValue;
pub use coord::{CellLocation, Column, GridRange, column_to_index, index_to_column};
pub use locate::find_value_location;
pub use memory::{GridCall, MemoryGrid};

use crate::StoreError;

mod cell;
mod coord;
mod locate;
mod memory;

/// Rows of cells as returned by [`GridStore::fetch_values`].
///
/// Rows are not guaranteed to have the same width: trailing blank cells may
/// be omitted.
pub type Values = Vec<Vec<CellValue>>;

/// Primitive operations against one spreadsheet.
///
/// Every operation is a single remote call. Implementations must report
/// success only when the call completed *and* the remote status was OK.
pub trait GridStore: Send + Sync {
    /// Appends `row` after the existing data of the range's column band.
    fn append(
        &self,
        range: &GridRange,
        row: &[CellValue],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes `row` into the top row of `range`, left to right.
    fn overwrite(
        &self,
        range: &GridRange,
        row: &[CellValue],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Empties every cell of `range`. Formatting is kept.
    fn clear(&self, range: &GridRange) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn fetch_values(
        &self,
        range: &GridRange,
    ) -> impl Future<Output = Result<Values, StoreError>> + Send;
}
