use super::{CellLocation, Column, GridRange, GridStore};
use crate::StoreError;

/// Finds the first cell of `scan_range` whose text equals `target`.
///
/// Cells are scanned row by row, left to right, so the earliest row wins and
/// then the earliest column. The result is an absolute location: the in-block
/// indices are shifted by the range's top-left corner (`A1` when the range
/// has none).
///
/// `Ok(None)` means the value is not there; read failures are returned as-is.
/// The store has no secondary index, so this is a linear scan over the range.
pub async fn find_value_location<S: GridStore>(
    store: &S,
    scan_range: &GridRange,
    target: &str,
) -> Result<Option<CellLocation>, StoreError> {
    let values = store.fetch_values(scan_range).await?;

    let hit = values.iter().enumerate().find_map(|(row_idx, row)| {
        row.iter()
            .position(|cell| cell.as_text() == target)
            .map(|column_idx| (row_idx, column_idx))
    });
    let Some((row_idx, column_idx)) = hit else {
        tracing::debug!(range = %scan_range, target, "value not found");
        return Ok(None);
    };

    let origin = scan_range.top_left();
    let first_column = origin.map_or(Column::A, |loc| loc.column());
    let first_row = origin.and_then(|loc| loc.row()).unwrap_or(1);

    let column = first_column.offset(column_idx)?;
    let row = u32::try_from(row_idx)
        .ok()
        .and_then(|idx| first_row.checked_add(idx))
        .ok_or_else(|| StoreError::RemoteReadFailed(format!("row offset {row_idx} overflows")))?;

    let location = CellLocation::new(column, row);
    tracing::debug!(range = %scan_range, target, %location, "value found");
    Ok(Some(location))
}
