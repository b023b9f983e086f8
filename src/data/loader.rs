use std::collections::BTreeMap;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Record, Table, Value};
use crate::error::{FairnessError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Supported on-disk layouts, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    Parquet,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Format> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => Ok(Format::Parquet),
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            other => Err(FairnessError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Load a raw table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one instance per line, cell types inferred
/// * `.json`    – `[{ "age": 33, "credit": 1, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path) -> Result<Table> {
    let table = match Format::from_path(path)? {
        Format::Parquet => load_parquet(path)?,
        Format::Json => load_json(path)?,
        Format::Csv => load_csv(path)?,
    };
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "age": 67, "credit_amount": 1169, "credit": 1 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path)?;
    parse_json(&text)
}

pub(crate) fn parse_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text)?;

    let rows = root.as_array().ok_or_else(|| {
        FairnessError::SchemaMismatch("expected top-level JSON array".to_string())
    })?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| {
            FairnessError::SchemaMismatch(format!("row {i} is not a JSON object"))
        })?;
        let record: Record = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_value(val)))
            .collect();
        records.push(record);
    }

    Ok(Table::from_records(records))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one instance per line.
/// Each cell is typed independently, see [`Value::parse_cell`].
fn load_csv(path: &Path) -> Result<Table> {
    let reader = csv::Reader::from_path(path)?;
    read_csv(reader)
}

pub(crate) fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(col, cell)| (col.clone(), Value::parse_cell(cell)))
            .collect();
        records.push(record);
    }

    Ok(Table::new(headers, records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns.
///
/// Narrow integers, unsigned integers and `Float16` are widened; dictionary
/// (categorical) columns are decoded to their values. Any other column type
/// is a [`FairnessError::SchemaMismatch`].
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), and by [`super::writer`].
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let columns: Vec<(String, ArrayRef)> = column_names
            .iter()
            .zip(batch.columns())
            .map(|(name, col)| -> Result<(String, ArrayRef)> {
                Ok((name.clone(), normalize_column(name, col)?))
            })
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            let record: Record = columns
                .iter()
                .map(|(name, col)| -> Result<(String, Value)> {
                    Ok((name.clone(), extract_value(name, col, row)?))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            records.push(record);
        }
    }

    Ok(Table::new(column_names, records))
}

/// Scalar type a column of `ty` is read as, or `None` when it has no
/// [`Value`] representation.
fn target_type(ty: &DataType) -> Option<DataType> {
    match ty {
        DataType::Boolean => Some(DataType::Boolean),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => Some(DataType::Int64),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => Some(DataType::Float64),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Some(DataType::Utf8),
        DataType::Dictionary(_, values) => target_type(values),
        _ => None,
    }
}

/// Cast a column to Boolean, Int64, Float64 or Utf8.
///
/// Casts are checked: a `UInt64` value above `i64::MAX` is an error, not a null.
fn normalize_column(name: &str, col: &ArrayRef) -> Result<ArrayRef> {
    let target = target_type(col.data_type()).ok_or_else(|| {
        FairnessError::SchemaMismatch(format!(
            "column '{name}' has unsupported type {:?}",
            col.data_type()
        ))
    })?;
    if *col.data_type() == target {
        return Ok(col.clone());
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(col, &target, &options).map_err(|e| {
        FairnessError::SchemaMismatch(format!(
            "column '{name}': cannot read {:?} as {target:?}: {e}",
            col.data_type()
        ))
    })
}

/// Extract a single value from a normalized column at a given row.
fn extract_value(name: &str, col: &ArrayRef, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        other => {
            return Err(FairnessError::SchemaMismatch(format!(
                "column '{name}' has unsupported type {other:?}"
            )))
        }
    };
    Ok(value)
}
