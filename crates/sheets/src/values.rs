//! JSON shapes of the `spreadsheets.values` resource.

use engine::grid::{CellValue, Values};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `append` and `update`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueRangeBody {
    pub range: String,
    pub major_dimension: &'static str,
    pub values: Vec<Vec<Value>>,
}

impl ValueRangeBody {
    pub(crate) fn single_row(range: String, row: &[CellValue]) -> Self {
        Self {
            range,
            major_dimension: "ROWS",
            values: vec![row.iter().map(cell_to_json).collect()],
        }
    }
}

/// Response of `values.get`. Google omits `values` for an empty range.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueRangeResponse {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRangeResponse {
    pub(crate) fn into_values(self) -> Values {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(json_to_cell).collect())
            .collect()
    }
}

/// Blank cells are sent as `""`: `null` would leave the old content in place.
pub(crate) fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(String::new())),
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Blank => Value::String(String::new()),
    }
}

pub(crate) fn json_to_cell(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Blank,
        Value::String(s) if s.is_empty() => CellValue::Blank,
        Value::String(s) => CellValue::Text(s),
        Value::Number(n) => n
            .as_f64()
            .map_or_else(|| CellValue::Text(n.to_string()), CellValue::Number),
        Value::Bool(b) => CellValue::Text(if b { "TRUE" } else { "FALSE" }.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}
