use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Predicate: maps a raw column value to a binary group membership
// ---------------------------------------------------------------------------

/// Decides whether a raw value belongs to the privileged group (or, for a
/// label column, whether it is favorable).
///
/// Serialized externally tagged: `{"one_of": [1, "yes"]}`, `{"at_least": 25}`,
/// `{"below": 25}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Value equals one of the listed values (numeric types compare by value).
    OneOf(BTreeSet<Value>),
    /// Numeric value `>= threshold`.
    AtLeast(f64),
    /// Numeric value `< threshold`.
    Below(f64),
}

impl Predicate {
    pub fn equals(value: Value) -> Self {
        Predicate::OneOf([value].into_iter().collect())
    }

    /// `None` when the value cannot be evaluated, i.e. a threshold applied to
    /// a non-numeric value.
    pub fn evaluate(&self, value: &Value) -> Option<bool> {
        match self {
            Predicate::OneOf(set) => Some(set.iter().any(|v| v.loosely_eq(value))),
            Predicate::AtLeast(t) => value.as_f64().map(|x| x >= *t),
            Predicate::Below(t) => value.as_f64().map(|x| x < *t),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::OneOf(set) => {
                let items: Vec<String> = set.iter().map(|v| format!("{v:?}")).collect();
                write!(f, "one_of[{}]", items.join(", "))
            }
            Predicate::AtLeast(t) => write!(f, ">= {t}"),
            Predicate::Below(t) => write!(f, "< {t}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Group selection over a binarized dataset
// ---------------------------------------------------------------------------

/// Selects instances by protected group and/or label.
/// A `None` field places no constraint on that dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub privileged: Option<bool>,
    pub favorable: Option<bool>,
}

impl Selection {
    pub const ALL: Selection = Selection {
        privileged: None,
        favorable: None,
    };

    pub fn group(privileged: bool) -> Self {
        Selection {
            privileged: Some(privileged),
            favorable: None,
        }
    }

    pub fn label(favorable: bool) -> Self {
        Selection {
            privileged: None,
            favorable: Some(favorable),
        }
    }

    pub fn cell(privileged: bool, favorable: bool) -> Self {
        Selection {
            privileged: Some(privileged),
            favorable: Some(favorable),
        }
    }

    pub fn matches(&self, protected: bool, label: bool) -> bool {
        self.privileged.map_or(true, |p| p == protected)
            && self.favorable.map_or(true, |f| f == label)
    }
}

/// Sum of weights of instances matching `selection`.
pub fn weighted_count(dataset: &Dataset, selection: Selection) -> f64 {
    dataset
        .instances()
        .iter()
        .filter(|inst| selection.matches(inst.protected, inst.label))
        .map(|inst| inst.weight)
        .sum()
}
