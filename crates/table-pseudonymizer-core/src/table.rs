//! In-memory table model shared by ingestion and anonymization

use crate::error::{PseudonymizeError, PseudonymizeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row: column name to cell, in column order.
pub type Row = Map<String, Value>;

/// Ordered rows. Rows are not required to share the same set of columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// Builds a table from the `data` member of a JSON request body.
    ///
    /// `None`, `null`, an empty array or an empty object count as "no data".
    /// Anything else must be an array of JSON objects.
    pub fn from_json_data(data: Option<&Value>) -> PseudonymizeResult<Self> {
        let items = match data {
            None | Some(Value::Null) => return Err(PseudonymizeError::NoData),
            Some(Value::Array(items)) if items.is_empty() => return Err(PseudonymizeError::NoData),
            Some(Value::Object(map)) if map.is_empty() => return Err(PseudonymizeError::NoData),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(PseudonymizeError::InvalidPayload(format!(
                    "Expected 'data' to be an array of rows, got {}",
                    json_type_name(other)
                )))
            }
        };

        let rows = items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(row) => Ok(row.clone()),
                other => Err(PseudonymizeError::InvalidPayload(format!(
                    "Row {} must be an object, got {}",
                    index,
                    json_type_name(other)
                ))),
            })
            .collect::<PseudonymizeResult<Vec<Row>>>()?;

        Ok(Self { rows })
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
