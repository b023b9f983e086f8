use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::Predicate;
use super::writer::WEIGHT_COLUMN;
use crate::error::{FairnessError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of a raw table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value covering the common tabular dtypes.
/// Used as a `BTreeSet` key by predicates, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

/// Stand-in for a column a record does not have.
pub(crate) static NULL: Value = Value::Null;

impl std::str::FromStr for Value {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Value::parse_cell(s))
    }
}

impl Value {
    /// Infer the type of a text cell: empty is null, then integer, float,
    /// `true`/`false`, and string as the fallback.
    pub fn parse_cell(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }

    /// Interpret the value as an `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Equality that treats `Integer(1)` and `Float(1.0)` as the same value.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – raw rows as read from disk
// ---------------------------------------------------------------------------

/// One raw row: column name → value.
pub type Record = BTreeMap<String, Value>;

/// A parsed file before any protected attribute or label is designated.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in file order.
    pub column_names: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(column_names: Vec<String>, records: Vec<Record>) -> Self {
        Table {
            column_names,
            records,
        }
    }

    /// Build a table whose columns are the union of all record keys.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for rec in &records {
            names.extend(rec.keys().cloned());
        }
        Table {
            column_names: names.into_iter().collect(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }
}

// ---------------------------------------------------------------------------
// DatasetSpec – how to read protected attribute and label from a table
// ---------------------------------------------------------------------------

/// Designates the protected attribute and the label of a [`Table`].
///
/// ```json
/// {
///   "protected_attribute": "age",
///   "privileged": { "at_least": 25 },
///   "label": "credit",
///   "favorable": { "one_of": [1] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub protected_attribute: String,
    /// Raw protected values for which an instance is privileged.
    pub privileged: Predicate,
    pub label: String,
    /// Raw label values considered favorable.
    pub favorable: Predicate,
    /// Optional column holding initial instance weights.
    #[serde(default)]
    pub instance_weights: Option<String>,
    /// Feature columns to keep. `None` keeps every remaining column.
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

impl DatasetSpec {
    pub fn new(
        protected_attribute: impl Into<String>,
        privileged: Predicate,
        label: impl Into<String>,
        favorable: Predicate,
    ) -> Self {
        DatasetSpec {
            protected_attribute: protected_attribute.into(),
            privileged,
            label: label.into(),
            favorable,
            instance_weights: None,
            features: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Instance / Dataset – the binarized, weighted view
// ---------------------------------------------------------------------------

/// A single row with a binary protected attribute and a binary label.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Feature columns: name → raw value.
    pub features: BTreeMap<String, Value>,
    /// `true` when the instance belongs to the privileged group.
    pub protected: bool,
    /// `true` when the label is favorable.
    pub label: bool,
    pub weight: f64,
}

impl Instance {
    pub fn new(protected: bool, label: bool) -> Self {
        Instance {
            features: BTreeMap::new(),
            protected,
            label,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: Value) -> Self {
        self.features.insert(name.into(), value);
        self
    }
}

/// Column layout shared by every instance of a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub feature_names: Vec<String>,
    pub protected_attribute: String,
    pub label: String,
}

impl Schema {
    pub fn new(protected_attribute: impl Into<String>, label: impl Into<String>) -> Self {
        Schema {
            feature_names: Vec::new(),
            protected_attribute: protected_attribute.into(),
            label: label.into(),
        }
    }
}

/// An ordered, immutable collection of instances sharing one [`Schema`].
///
/// Weights are validated on construction: every weight is finite and
/// non-negative. Transforms return new datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    instances: Vec<Instance>,
}

impl Dataset {
    pub fn new(schema: Schema, instances: Vec<Instance>) -> Result<Self> {
        for (row, inst) in instances.iter().enumerate() {
            check_weight(row, inst.weight)?;
        }
        Ok(Dataset { schema, instances })
    }

    /// Binarize a raw table according to `spec`.
    pub fn from_table(table: &Table, spec: &DatasetSpec) -> Result<Self> {
        for col in [&spec.protected_attribute, &spec.label] {
            if !table.has_column(col) {
                return Err(FairnessError::SchemaMismatch(format!(
                    "missing required column '{col}'"
                )));
            }
        }
        if let Some(wcol) = &spec.instance_weights {
            if !table.has_column(wcol) {
                return Err(FairnessError::SchemaMismatch(format!(
                    "missing instance weight column '{wcol}'"
                )));
            }
        }

        let reserved = |c: &str| {
            c == spec.protected_attribute
                || c == spec.label
                || spec.instance_weights.as_deref() == Some(c)
        };
        let feature_names: Vec<String> = match &spec.features {
            Some(wanted) => {
                if let Some(missing) = wanted.iter().find(|c| !table.has_column(c)) {
                    return Err(FairnessError::SchemaMismatch(format!(
                        "missing feature column '{missing}'"
                    )));
                }
                wanted.iter().filter(|c| !reserved(c)).cloned().collect()
            }
            None => table
                .column_names
                .iter()
                .filter(|c| !reserved(c))
                .cloned()
                .collect(),
        };

        // Exports append their own weight column.
        let mut output_columns = feature_names
            .iter()
            .chain([&spec.protected_attribute, &spec.label]);
        if let Some(clash) = output_columns.find(|c| c.as_str() == WEIGHT_COLUMN) {
            return Err(FairnessError::SchemaMismatch(format!(
                "column '{clash}' collides with the exported weight column; \
                 declare it as instance_weights or rename it"
            )));
        }
        drop(output_columns);

        let mut instances = Vec::with_capacity(table.len());
        for (row, rec) in table.records.iter().enumerate() {
            let protected = evaluate(&spec.privileged, rec, &spec.protected_attribute, row)?;
            let label = evaluate(&spec.favorable, rec, &spec.label, row)?;

            let weight = match &spec.instance_weights {
                Some(wcol) => match rec.get(wcol).unwrap_or(&NULL) {
                    Value::Null => {
                        log::warn!("Row {row}: null instance weight, using 1.0");
                        1.0
                    }
                    v => v.as_f64().ok_or_else(|| {
                        FairnessError::SchemaMismatch(format!(
                            "row {row}: weight '{v}' in '{wcol}' is not numeric"
                        ))
                    })?,
                },
                None => 1.0,
            };

            let features = feature_names
                .iter()
                .map(|c| (c.clone(), rec.get(c).cloned().unwrap_or(Value::Null)))
                .collect();

            instances.push(Instance {
                features,
                protected,
                label,
                weight,
            });
        }

        log::debug!(
            "Binarized {} rows on '{}' / '{}' with {} features",
            instances.len(),
            spec.protected_attribute,
            spec.label,
            feature_names.len()
        );

        Dataset::new(
            Schema {
                feature_names,
                protected_attribute: spec.protected_attribute.clone(),
                label: spec.label.clone(),
            },
            instances,
        )
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn weights(&self) -> Vec<f64> {
        self.instances.iter().map(|i| i.weight).collect()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// A new dataset holding the instances at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            instances: indices.iter().map(|&i| self.instances[i].clone()).collect(),
        }
    }

    /// A new dataset with the same instances and the given weights.
    pub fn with_weights(&self, weights: &[f64]) -> Result<Dataset> {
        if weights.len() != self.len() {
            return Err(FairnessError::SchemaMismatch(format!(
                "expected {} weights, got {}",
                self.len(),
                weights.len()
            )));
        }
        let instances = self
            .instances
            .iter()
            .zip(weights)
            .map(|(inst, &w)| Instance {
                weight: w,
                ..inst.clone()
            })
            .collect();
        Dataset::new(self.schema.clone(), instances)
    }
}

fn check_weight(row: usize, weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(FairnessError::InvalidWeight { row, weight })
    }
}

fn evaluate(predicate: &Predicate, rec: &Record, column: &str, row: usize) -> Result<bool> {
    let value = rec.get(column).unwrap_or(&NULL);
    predicate.evaluate(value).ok_or_else(|| {
        FairnessError::SchemaMismatch(format!(
            "row {row}: value '{value}' in '{column}' cannot be evaluated by {predicate}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn credit_spec() -> DatasetSpec {
        DatasetSpec::new(
            "age",
            Predicate::AtLeast(25.0),
            "credit",
            Predicate::OneOf([Value::Integer(1)].into_iter().collect()),
        )
    }

    #[test]
    fn value_ordering_groups_by_type() {
        let mut vals = vec![
            Value::String("b".into()),
            Value::Integer(3),
            Value::Null,
            Value::Float(0.5),
            Value::Bool(true),
        ];
        vals.sort();
        assert_eq!(vals[0], Value::Null);
        assert_eq!(vals[1], Value::Bool(true));
        assert_eq!(vals[4], Value::String("b".into()));
    }

    #[test]
    fn loosely_eq_crosses_numeric_types() {
        assert!(Value::Integer(1).loosely_eq(&Value::Float(1.0)));
        assert!(!Value::Integer(1).loosely_eq(&Value::String("1".into())));
    }

    #[test]
    fn value_deserializes_untagged() {
        let vals: Vec<Value> = serde_json::from_str(r#"["a", 2, 2.5, true, null]"#).unwrap();
        assert_eq!(
            vals,
            vec![
                Value::String("a".into()),
                Value::Integer(2),
                Value::Float(2.5),
                Value::Bool(true),
                Value::Null,
            ]
        );
    }

    #[test]
    fn from_table_binarizes_protected_and_label() {
        let table = Table::from_records(vec![
            record(&[
                ("age", Value::Integer(40)),
                ("credit", Value::Integer(1)),
                ("amount", Value::Float(1200.0)),
            ]),
            record(&[
                ("age", Value::Integer(19)),
                ("credit", Value::Integer(2)),
                ("amount", Value::Float(800.0)),
            ]),
        ]);

        let ds = Dataset::from_table(&table, &credit_spec()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.schema().feature_names, vec!["amount".to_string()]);
        assert!(ds.instances()[0].protected && ds.instances()[0].label);
        assert!(!ds.instances()[1].protected && !ds.instances()[1].label);
        assert_eq!(ds.weights(), vec![1.0, 1.0]);
    }

    #[test]
    fn from_table_rejects_missing_label_column() {
        let table = Table::from_records(vec![record(&[("age", Value::Integer(40))])]);
        let err = Dataset::from_table(&table, &credit_spec()).unwrap_err();
        assert!(matches!(err, FairnessError::SchemaMismatch(_)));
    }

    #[test]
    fn from_table_rejects_non_numeric_threshold_value() {
        let table = Table::from_records(vec![record(&[
            ("age", Value::String("old".into())),
            ("credit", Value::Integer(1)),
        ])]);
        let err = Dataset::from_table(&table, &credit_spec()).unwrap_err();
        assert!(matches!(err, FairnessError::SchemaMismatch(_)));
    }

    #[test]
    fn from_table_reads_instance_weights() {
        let table = Table::from_records(vec![record(&[
            ("age", Value::Integer(40)),
            ("credit", Value::Integer(1)),
            ("w", Value::Float(2.5)),
        ])]);
        let mut spec = credit_spec();
        spec.instance_weights = Some("w".into());
        let ds = Dataset::from_table(&table, &spec).unwrap();
        assert_eq!(ds.weights(), vec![2.5]);
        assert!(ds.schema().feature_names.is_empty());
    }

    #[test]
    fn from_table_rejects_feature_named_like_weight_column() {
        let table = Table::from_records(vec![record(&[
            ("age", Value::Integer(40)),
            ("credit", Value::Integer(1)),
            ("weight", Value::Float(72.5)),
        ])]);
        let err = Dataset::from_table(&table, &credit_spec()).unwrap_err();
        assert!(matches!(err, FairnessError::SchemaMismatch(msg) if msg.contains("'weight'")));

        let mut spec = credit_spec();
        spec.instance_weights = Some("weight".into());
        let ds = Dataset::from_table(&table, &spec).unwrap();
        assert_eq!(ds.weights(), vec![72.5]);
    }

    #[test]
    fn new_rejects_negative_weight() {
        let err = Dataset::new(
            Schema::new("a", "y"),
            vec![Instance::new(true, true), Instance::new(false, true).with_weight(-1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, FairnessError::InvalidWeight { row: 1, .. }));
    }

    #[test]
    fn with_weights_keeps_original_untouched() {
        let ds = Dataset::new(
            Schema::new("a", "y"),
            vec![Instance::new(true, true), Instance::new(false, false)],
        )
        .unwrap();
        let reweighted = ds.with_weights(&[0.5, 2.0]).unwrap();
        assert_eq!(ds.weights(), vec![1.0, 1.0]);
        assert_eq!(reweighted.weights(), vec![0.5, 2.0]);
        assert!(ds.with_weights(&[f64::NAN, 1.0]).is_err());
    }
}
