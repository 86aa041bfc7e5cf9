//! Tabular file ingestion (CSV and Excel) into a [`Table`]
//!
//! Both readers treat the first row as the header and infer one type per
//! column, the way common dataframe readers do:
//! - a column whose values are all integers stays integral unless it has gaps,
//!   in which case every value becomes a float
//! - a column mixing integers and floats becomes float
//! - CSV columns made only of `True`/`False` literals become booleans
//! - anything else is kept as text, exactly as read

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{PseudonymizeError, PseudonymizeResult};
use crate::table::{Row, Table};

/// Cell texts read as missing values.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    /// Picks the reader from the file extension. Extensions are matched as
    /// written, so `DATA.CSV` is not recognised.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".csv") {
            Some(FileFormat::Csv)
        } else if filename.ends_with(".xls") || filename.ends_with(".xlsx") {
            Some(FileFormat::Excel)
        } else {
            None
        }
    }
}

pub fn read_table(format: FileFormat, bytes: Vec<u8>, sheet: Option<&str>) -> PseudonymizeResult<Table> {
    match format {
        FileFormat::Csv => read_csv(&bytes),
        FileFormat::Excel => read_excel(bytes, sheet),
    }
}

pub fn read_csv(bytes: &[u8]) -> PseudonymizeResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect::<Vec<_>>(),
        None => return Ok(Table::default()),
    };
    let headers = dedupe_headers(headers);

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in records {
        let record = record?;
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(PseudonymizeError::RaggedRow {
                line,
                found: record.len(),
                expected: headers.len(),
            });
        }

        for (index, column) in columns.iter_mut().enumerate() {
            let raw = record.get(index).filter(|raw| !NA_MARKERS.contains(raw));
            column.push(raw.map(str::to_string));
        }
    }

    let typed: Vec<Vec<Value>> = columns.into_iter().map(infer_text_column).collect();
    debug!("Read CSV with {} columns", headers.len());
    Ok(assemble(&headers, typed))
}

pub fn read_excel(bytes: Vec<u8>, sheet: Option<&str>) -> PseudonymizeResult<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or(PseudonymizeError::EmptyWorkbook)??,
    };

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => dedupe_headers(header_row.iter().map(cell_to_header_string).collect()),
        None => return Ok(Table::default()),
    };

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (index, column) in columns.iter_mut().enumerate() {
            column.push(row.get(index).map_or(Value::Null, convert_cell));
        }
    }

    for column in columns.iter_mut() {
        harmonize_numeric(column);
    }

    debug!("Read Excel sheet with {} columns", headers.len());
    Ok(assemble(&headers, columns))
}

fn assemble(headers: &[String], columns: Vec<Vec<Value>>) -> Table {
    let row_count = columns.first().map_or(0, Vec::len);
    let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();

    let mut table = Table::default();
    for _ in 0..row_count {
        let mut row = Row::new();
        for (header, cells) in headers.iter().zip(iters.iter_mut()) {
            row.insert(header.clone(), cells.next().unwrap_or(Value::Null));
        }
        table.push(row);
    }
    table
}

/// Names blank headers `Unnamed: <index>` and suffixes repeats with `.1`, `.2`, ...
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (index, name) in raw.into_iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

fn infer_text_column(raw: Vec<Option<String>>) -> Vec<Value> {
    let present = || raw.iter().flatten();
    let has_gaps = raw.iter().any(Option::is_none);

    if present().next().is_none() {
        return vec![Value::Null; raw.len()];
    }

    if present().all(|s| s.trim().parse::<i64>().is_ok()) {
        return raw
            .iter()
            .map(|cell| match cell {
                Some(s) => {
                    let n = s.trim().parse::<i64>().unwrap_or_default();
                    if has_gaps {
                        float_value(n as f64)
                    } else {
                        Value::from(n)
                    }
                }
                None => Value::Null,
            })
            .collect();
    }

    if present().all(|s| s.trim().parse::<f64>().is_ok()) {
        return raw
            .iter()
            .map(|cell| {
                cell.as_ref()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .map_or(Value::Null, float_value)
            })
            .collect();
    }

    if present().all(|s| parse_bool(s).is_some()) {
        return raw
            .iter()
            .map(|cell| cell.as_deref().and_then(parse_bool).map_or(Value::Null, Value::Bool))
            .collect();
    }

    raw.into_iter().map(|cell| cell.map_or(Value::Null, Value::String)).collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

// Promotes integers to floats when a purely numeric column has gaps or floats.
fn harmonize_numeric(column: &mut [Value]) {
    let numeric = column.iter().all(|v| v.is_null() || v.is_number());
    let any_number = column.iter().any(Value::is_number);
    let needs_float = column.iter().any(|v| v.is_null() || v.is_f64());

    if numeric && any_number && needs_float {
        for value in column.iter_mut() {
            if let Some(n) = value.as_i64() {
                *value = float_value(n as f64);
            }
        }
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::from(*f as i64)
            } else {
                float_value(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::DateTime(dt) if !dt.is_duration() => dt
            .as_datetime()
            .map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or_else(|| Value::String(c.to_string())),
        Data::DateTime(_) => Value::String(c.to_string()),
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
