//! Spreadsheet coordinates in A1 notation.
//!
//! Only single-letter columns are supported, so a [`Column`] is always one of
//! `A..=Z`. Rows are 1-based; a location without a row stands for the whole
//! column and is only meaningful as a range corner (`B3:B`).

use std::fmt;

use crate::CoordinateError;

const FIRST_LETTER: u8 = b'A';
const COLUMNS: u8 = 26;

/// Maps a column letter to its 1-based index (`'A'` → 1, `'Z'` → 26).
pub fn column_to_index(letter: char) -> Result<u8, CoordinateError> {
    Column::from_letter(letter)
        .map(Column::index)
        .ok_or(CoordinateError::InvalidColumn(letter))
}

/// Maps a 1-based column index back to its letter.
pub fn index_to_column(index: usize) -> Result<char, CoordinateError> {
    u8::try_from(index)
        .ok()
        .and_then(Column::from_index)
        .map(Column::letter)
        .ok_or(CoordinateError::ColumnOutOfRange(index))
}

/// A single-letter spreadsheet column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(u8);

impl Column {
    pub const A: Self = Self(1);
    pub const Z: Self = Self(COLUMNS);

    /// Returns the column for an uppercase ASCII letter.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        if letter.is_ascii_uppercase() {
            Some(Self(letter as u8 - FIRST_LETTER + 1))
        } else {
            None
        }
    }

    /// Returns the column for a 1-based index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index >= 1 && index <= COLUMNS {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn letter(self) -> char {
        (FIRST_LETTER + self.0 - 1) as char
    }

    /// Returns the column `offset` positions to the right, if it still fits in `A..=Z`.
    pub fn offset(self, offset: usize) -> Result<Self, CoordinateError> {
        let index = usize::from(self.0) + offset;
        u8::try_from(index)
            .ok()
            .and_then(Self::from_index)
            .ok_or(CoordinateError::ColumnOutOfRange(index))
    }
}

impl TryFrom<char> for Column {
    type Error = CoordinateError;

    fn try_from(letter: char) -> Result<Self, Self::Error> {
        Self::from_letter(letter).ok_or(CoordinateError::InvalidColumn(letter))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A cell, or a whole column when `row` is `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellLocation {
    column: Column,
    row: Option<u32>,
}

impl CellLocation {
    /// A concrete cell. Row `0` is treated as "no row".
    #[must_use]
    pub fn new(column: Column, row: u32) -> Self {
        Self {
            column,
            row: (row != 0).then_some(row),
        }
    }

    /// The open-ended column, rendered as just its letter.
    #[must_use]
    pub fn whole_column(column: Column) -> Self {
        Self { column, row: None }
    }

    pub fn column(&self) -> Column {
        self.column
    }

    /// 1-based, never `Some(0)`.
    pub fn row(&self) -> Option<u32> {
        self.row
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{}{row}", self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Corners {
    Sheet,
    From(CellLocation),
    Span(CellLocation, CellLocation),
}

/// A rectangular region of one sheet.
///
/// The [`Display`](fmt::Display) output is the address handed to the remote
/// store: `Sheet`, `Sheet!B3` or `Sheet!A3:F`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridRange {
    sheet: String,
    corners: Corners,
}

impl GridRange {
    /// The entire sheet.
    pub fn sheet(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            corners: Corners::Sheet,
        }
    }

    /// Everything from `top_left` onwards.
    pub fn starting_at(sheet: impl Into<String>, top_left: CellLocation) -> Self {
        Self {
            sheet: sheet.into(),
            corners: Corners::From(top_left),
        }
    }

    pub fn span(
        sheet: impl Into<String>,
        top_left: CellLocation,
        bottom_right: CellLocation,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            corners: Corners::Span(top_left, bottom_right),
        }
    }

    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    #[must_use]
    pub fn top_left(&self) -> Option<CellLocation> {
        match self.corners {
            Corners::Sheet => None,
            Corners::From(top_left) | Corners::Span(top_left, _) => Some(top_left),
        }
    }

    #[must_use]
    pub fn bottom_right(&self) -> Option<CellLocation> {
        match self.corners {
            Corners::Span(_, bottom_right) => Some(bottom_right),
            _ => None,
        }
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheet_name(f, &self.sheet)?;
        match &self.corners {
            Corners::Sheet => Ok(()),
            Corners::From(top_left) => write!(f, "!{top_left}"),
            Corners::Span(top_left, bottom_right) => write!(f, "!{top_left}:{bottom_right}"),
        }
    }
}

// Names with spaces or punctuation must be single-quoted, with `'` doubled.
// So must names the API would read as a cell reference (`A1`, `R1C1`, `2024`).
fn write_sheet_name(f: &mut fmt::Formatter<'_>, sheet: &str) -> fmt::Result {
    let plain = !sheet.is_empty()
        && sheet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !looks_like_reference(sheet);
    if plain {
        f.write_str(sheet)
    } else {
        write!(f, "'{}'", sheet.replace('\'', "''"))
    }
}

fn looks_like_reference(sheet: &str) -> bool {
    let upper = sheet.to_ascii_uppercase();
    if upper.starts_with(|c: char| c.is_ascii_digit()) {
        return true;
    }

    let digits = upper.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let letters = upper.len() - digits.len();
    let a1 = (1..=3).contains(&letters)
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit());

    a1 || is_r1c1(&upper)
}

// `R`, `C`, `RC`, `R1`, `C2`, `R1C2`.
fn is_r1c1(upper: &str) -> bool {
    if !upper.starts_with(['R', 'C']) {
        return false;
    }
    let rest = upper.strip_prefix('R').map_or(upper, skip_digits);
    let rest = rest.strip_prefix('C').map_or(rest, skip_digits);
    rest.is_empty()
}

fn skip_digits(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_digit())
}
