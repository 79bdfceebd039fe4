use std::fmt;

/// Value of one grid cell as the remote store reports it.
///
/// Fetched rows can mix numbers and text (a message id typed into a cell
/// becomes a number), so comparisons go through [`CellValue::as_text`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Blank,
}

impl CellValue {
    /// Text form of the cell, as a user would read it.
    ///
    /// Integral numbers have no fractional part (`103.0` → `"103"`), blanks are
    /// the empty string.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{n:.0}")
            }
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Blank => String::new(),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Blank => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Blank, Into::into)
    }
}
