//! In-process [`GridStore`].
//!
//! Follows the remote store's A1 semantics closely enough for the repository:
//! a range with only a top-left corner is a single cell, a missing bottom row
//! means "to the end of the data", fetched rows drop trailing blanks and
//! appends land after the last occupied row of the range's column band.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{CellValue, Column, GridRange, GridStore, Values};
use crate::StoreError;

/// A primitive operation received by a [`MemoryGrid`], with its rendered range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridCall {
    Append(String),
    Overwrite(String),
    Clear(String),
    Fetch(String),
}

#[derive(Default)]
struct State {
    sheets: HashMap<String, Vec<Vec<CellValue>>>,
    calls: Vec<GridCall>,
}

#[derive(Default)]
pub struct MemoryGrid {
    state: Mutex<State>,
}

/// Inclusive, 1-based bounds of a range. `last_row == None` is unbounded.
struct Bounds {
    first_column: usize,
    last_column: usize,
    first_row: usize,
    last_row: Option<usize>,
}

impl Bounds {
    fn of(range: &GridRange) -> Self {
        let top_left = range.top_left();
        let first_column = top_left.map_or(Column::A, |loc| loc.column());
        let first_row = top_left.and_then(|loc| loc.row()).unwrap_or(1);

        let (last_column, last_row) = match (top_left, range.bottom_right()) {
            (None, _) => (Column::Z, None),
            (Some(_), Some(bottom_right)) => (bottom_right.column(), bottom_right.row()),
            (Some(loc), None) => (loc.column(), loc.row()),
        };

        Self {
            first_column: usize::from(first_column.index()),
            last_column: usize::from(last_column.index()),
            first_row: first_row as usize,
            last_row: last_row.map(|row| row as usize),
        }
    }

    fn width(&self) -> usize {
        self.last_column.saturating_sub(self.first_column) + 1
    }

    fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row && self.last_row.is_none_or(|last| row <= last)
    }
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `values` into `row` starting at `first_column`. Row `0` does
    /// not exist and is ignored.
    pub fn set_row(&self, sheet: &str, row: u32, first_column: Column, values: Vec<CellValue>) {
        if row == 0 {
            tracing::warn!(sheet, "ignoring write to row 0");
            return;
        }
        let mut state = self.lock();
        let rows = state.sheets.entry(sheet.to_string()).or_default();
        write_cells(rows, row as usize, usize::from(first_column.index()), values);
    }

    /// Returns `row` of `sheet` from column A, without trailing blanks.
    pub fn row(&self, sheet: &str, row: u32) -> Vec<CellValue> {
        let state = self.lock();
        let mut cells = state
            .sheets
            .get(sheet)
            .and_then(|rows| rows.get((row as usize).saturating_sub(1)))
            .cloned()
            .unwrap_or_default();
        trim_trailing_blanks(&mut cells);
        cells
    }

    /// Operations received so far, oldest first.
    pub fn calls(&self) -> Vec<GridCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GridStore for MemoryGrid {
    async fn append(&self, range: &GridRange, row: &[CellValue]) -> Result<(), StoreError> {
        let bounds = Bounds::of(range);
        if row.len() > bounds.width() {
            return Err(StoreError::RemoteWriteFailed(format!(
                "{} values do not fit in {range}",
                row.len()
            )));
        }

        let mut state = self.lock();
        state.calls.push(GridCall::Append(range.to_string()));
        let rows = state.sheets.entry(range.sheet_name().to_string()).or_default();

        let last_used = rows
            .iter()
            .enumerate()
            .filter(|(idx, cells)| {
                bounds.contains_row(idx + 1) && band(cells, &bounds).iter().any(|c| !c.is_blank())
            })
            .map(|(idx, _)| idx + 1)
            .max();
        let target = last_used.map_or(bounds.first_row, |last| last + 1);
        if !bounds.contains_row(target) {
            return Err(StoreError::RemoteWriteFailed(format!("{range} is full")));
        }

        write_cells(rows, target, bounds.first_column, row.to_vec());
        Ok(())
    }

    async fn overwrite(&self, range: &GridRange, row: &[CellValue]) -> Result<(), StoreError> {
        let bounds = Bounds::of(range);
        if row.len() > bounds.width() {
            return Err(StoreError::RemoteWriteFailed(format!(
                "{} values do not fit in {range}",
                row.len()
            )));
        }

        let mut state = self.lock();
        state.calls.push(GridCall::Overwrite(range.to_string()));
        let rows = state.sheets.entry(range.sheet_name().to_string()).or_default();
        write_cells(rows, bounds.first_row, bounds.first_column, row.to_vec());
        Ok(())
    }

    async fn clear(&self, range: &GridRange) -> Result<(), StoreError> {
        let bounds = Bounds::of(range);

        let mut state = self.lock();
        state.calls.push(GridCall::Clear(range.to_string()));
        let Some(rows) = state.sheets.get_mut(range.sheet_name()) else {
            return Ok(());
        };
        for (idx, cells) in rows.iter_mut().enumerate() {
            if !bounds.contains_row(idx + 1) {
                continue;
            }
            let end = bounds.last_column.min(cells.len());
            for cell in cells.iter_mut().take(end).skip(bounds.first_column - 1) {
                *cell = CellValue::Blank;
            }
        }
        Ok(())
    }

    async fn fetch_values(&self, range: &GridRange) -> Result<Values, StoreError> {
        let bounds = Bounds::of(range);

        let mut state = self.lock();
        state.calls.push(GridCall::Fetch(range.to_string()));
        let Some(rows) = state.sheets.get(range.sheet_name()) else {
            return Ok(Vec::new());
        };

        let mut values: Values = rows
            .iter()
            .enumerate()
            .skip(bounds.first_row - 1)
            .take_while(|(idx, _)| bounds.contains_row(idx + 1))
            .map(|(_, cells)| {
                let mut cells = band(cells, &bounds).to_vec();
                trim_trailing_blanks(&mut cells);
                cells
            })
            .collect();
        while values.last().is_some_and(Vec::is_empty) {
            values.pop();
        }
        Ok(values)
    }
}

fn band<'a>(cells: &'a [CellValue], bounds: &Bounds) -> &'a [CellValue] {
    let start = (bounds.first_column - 1).min(cells.len());
    let end = bounds.last_column.min(cells.len());
    &cells[start..end]
}

fn write_cells(
    rows: &mut Vec<Vec<CellValue>>,
    row: usize,
    first_column: usize,
    values: Vec<CellValue>,
) {
    if rows.len() < row {
        rows.resize_with(row, Vec::new);
    }
    let cells = &mut rows[row - 1];
    let end = first_column - 1 + values.len();
    if cells.len() < end {
        cells.resize(end, CellValue::Blank);
    }
    for (offset, value) in values.into_iter().enumerate() {
        cells[first_column - 1 + offset] = value;
    }
}

fn trim_trailing_blanks(cells: &mut Vec<CellValue>) {
    while cells.last().is_some_and(CellValue::is_blank) {
        cells.pop();
    }
}
