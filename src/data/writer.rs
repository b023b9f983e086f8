use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Array, Float64Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value as JsonValue};

use super::loader::Format;
use super::model::{Dataset, Value, NULL};
use crate::error::Result;

/// Name of the column holding instance weights in exported files.
pub const WEIGHT_COLUMN: &str = "weight";

/// Write a weighted dataset.  Dispatch by extension.
///
/// Columns: every feature, then the protected attribute and the label
/// encoded as `1`/`0`, then [`WEIGHT_COLUMN`].
pub fn write_file(dataset: &Dataset, path: &Path) -> Result<()> {
    match Format::from_path(path)? {
        Format::Csv => write_csv(dataset, csv::Writer::from_path(path)?)?,
        Format::Json => write_json(dataset, std::fs::File::create(path)?)?,
        Format::Parquet => write_parquet(dataset, std::fs::File::create(path)?)?,
    }
    log::info!("Wrote {} weighted rows to {}", dataset.len(), path.display());
    Ok(())
}

fn header(dataset: &Dataset) -> Vec<String> {
    let schema = dataset.schema();
    let mut cols = schema.feature_names.clone();
    cols.push(schema.protected_attribute.clone());
    cols.push(schema.label.clone());
    cols.push(WEIGHT_COLUMN.to_string());
    cols
}

pub(crate) fn write_csv<W: std::io::Write>(dataset: &Dataset, mut writer: csv::Writer<W>) -> Result<()> {
    writer.write_record(header(dataset))?;
    for inst in dataset.instances() {
        let mut row: Vec<String> = dataset
            .schema()
            .feature_names
            .iter()
            .map(|c| inst.features.get(c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        row.push(u8::from(inst.protected).to_string());
        row.push(u8::from(inst.label).to_string());
        row.push(inst.weight.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<W: std::io::Write>(dataset: &Dataset, out: W) -> Result<()> {
    let schema = dataset.schema();
    let rows: Vec<JsonValue> = dataset
        .instances()
        .iter()
        .map(|inst| -> Result<JsonValue> {
            let mut obj = Map::new();
            for (name, value) in &inst.features {
                obj.insert(name.clone(), serde_json::to_value(value)?);
            }
            obj.insert(schema.protected_attribute.clone(), u8::from(inst.protected).into());
            obj.insert(schema.label.clone(), u8::from(inst.label).into());
            obj.insert(WEIGHT_COLUMN.to_string(), inst.weight.into());
            Ok(JsonValue::Object(obj))
        })
        .collect::<Result<_>>()?;
    serde_json::to_writer_pretty(out, &rows)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

/// Arrow type for a feature column, chosen from the values it holds.
fn column_type<'a>(values: impl Iterator<Item = &'a Value>) -> DataType {
    let mut ty: Option<DataType> = None;
    for v in values {
        let this = match v {
            Value::Null => continue,
            Value::Integer(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Bool(_) => DataType::Boolean,
            Value::String(_) => DataType::Utf8,
        };
        ty = Some(match (ty, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            _ => DataType::Utf8,
        });
    }
    ty.unwrap_or(DataType::Utf8)
}

fn build_column<'a>(ty: &DataType, values: impl Iterator<Item = &'a Value>) -> ArrayRef {
    match ty {
        DataType::Int64 => {
            let mut b = Int64Builder::new();
            for v in values {
                match v {
                    Value::Integer(i) => b.append_value(*i),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::new();
            for v in values {
                b.append_option(v.as_f64());
            }
            Arc::new(b.finish())
        }
        DataType::Boolean => {
            let mut b = BooleanBuilder::new();
            for v in values {
                match v {
                    Value::Bool(x) => b.append_value(*x),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        _ => {
            let mut b = StringBuilder::new();
            for v in values {
                match v {
                    Value::Null => b.append_null(),
                    other => b.append_value(other.to_string()),
                }
            }
            Arc::new(b.finish())
        }
    }
}

fn write_parquet<W: std::io::Write + Send>(dataset: &Dataset, out: W) -> Result<()> {
    let schema = dataset.schema();
    let instances = dataset.instances();

    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for name in &schema.feature_names {
        let cells = move || instances.iter().map(move |i| i.features.get(name).unwrap_or(&NULL));
        let ty = column_type(cells());
        arrays.push(build_column(&ty, cells()));
        fields.push(Field::new(name, ty, true));
    }

    let mut protected = Int64Builder::new();
    let mut label = Int64Builder::new();
    for inst in instances {
        protected.append_value(i64::from(inst.protected));
        label.append_value(i64::from(inst.label));
    }
    fields.push(Field::new(&schema.protected_attribute, DataType::Int64, false));
    arrays.push(Arc::new(protected.finish()));
    fields.push(Field::new(&schema.label, DataType::Int64, false));
    arrays.push(Arc::new(label.finish()));
    fields.push(Field::new(WEIGHT_COLUMN, DataType::Float64, false));
    arrays.push(Arc::new(Float64Array::from(dataset.weights())));

    let arrow_schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(arrow_schema.clone(), arrays)?;

    let mut writer = ArrowWriter::try_new(out, arrow_schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Instance, Schema as DatasetSchema};

    #[test]
    fn csv_output_appends_binary_columns_and_weight() {
        let mut schema = DatasetSchema::new("age", "credit");
        schema.feature_names = vec!["amount".into()];
        let ds = Dataset::new(
            schema,
            vec![
                Instance::new(true, false)
                    .with_weight(1.25)
                    .with_feature("amount", Value::Integer(500)),
                Instance::new(false, true).with_feature("amount", Value::Null),
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        write_csv(&ds, csv::Writer::from_writer(&mut buf)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "amount,age,credit,weight\n500,1,0,1.25\n,0,1,1\n");
    }

    #[test]
    fn mixed_numeric_columns_widen_to_float() {
        let vals = [Value::Integer(1), Value::Null, Value::Float(2.5)];
        assert_eq!(column_type(vals.iter()), DataType::Float64);
        let vals = [Value::Integer(1), Value::String("x".into())];
        assert_eq!(column_type(vals.iter()), DataType::Utf8);
        assert_eq!(column_type([Value::Null].iter()), DataType::Utf8);
    }
}
