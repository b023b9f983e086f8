//! Reweighing pre-processing transform.
//!
//! Each (protected, label) cell gets the factor
//!
//! ```text
//! w(p, l) = (N(p) / N) * (N(l) / N) / (N(p, l) / N)
//! ```
//!
//! computed from weighted counts. Under the new weights the joint
//! distribution of protected attribute and label equals the product of its
//! marginals, so the favorable rate is the same in both groups.

use serde::Serialize;

use crate::data::model::Dataset;
use crate::error::{FairnessError, Result};
use crate::metrics::GroupCounts;

/// Fitted cell factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reweighing {
    pub privileged_favorable: f64,
    pub privileged_unfavorable: f64,
    pub unprivileged_favorable: f64,
    pub unprivileged_unfavorable: f64,
}

impl Reweighing {
    /// Compute the four cell factors from `dataset`'s weighted counts.
    pub fn fit(dataset: &Dataset) -> Result<Self> {
        let counts = GroupCounts::from_dataset(dataset);
        let n = counts.total();

        let factor = |privileged: bool, favorable: bool| -> Result<f64> {
            let joint = counts.cell(privileged, favorable);
            if joint <= 0.0 {
                return Err(FairnessError::DegenerateGroup(format!(
                    "cell ({}, {}) has zero weighted count",
                    if privileged { "privileged" } else { "unprivileged" },
                    if favorable { "favorable" } else { "unfavorable" },
                )));
            }
            Ok(counts.group(privileged) * counts.label(favorable) / (n * joint))
        };

        let fitted = Reweighing {
            privileged_favorable: factor(true, true)?,
            privileged_unfavorable: factor(true, false)?,
            unprivileged_favorable: factor(false, true)?,
            unprivileged_unfavorable: factor(false, false)?,
        };
        log::debug!("Fitted reweighing factors: {fitted:?}");
        Ok(fitted)
    }

    pub fn weight_for(&self, privileged: bool, favorable: bool) -> f64 {
        match (privileged, favorable) {
            (true, true) => self.privileged_favorable,
            (true, false) => self.privileged_unfavorable,
            (false, true) => self.unprivileged_favorable,
            (false, false) => self.unprivileged_unfavorable,
        }
    }

    /// New dataset whose weights are the input weights times the cell factor.
    /// Labels and features are untouched.
    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let weights = dataset
            .instances()
            .iter()
            .enumerate()
            .map(|(row, inst)| {
                let weight = inst.weight * self.weight_for(inst.protected, inst.label);
                if weight.is_finite() && weight >= 0.0 {
                    Ok(weight)
                } else {
                    Err(FairnessError::InvalidWeight { row, weight })
                }
            })
            .collect::<Result<Vec<f64>>>()?;
        dataset.with_weights(&weights)
    }

    pub fn fit_transform(dataset: &Dataset) -> Result<(Self, Dataset)> {
        let fitted = Self::fit(dataset)?;
        let transformed = fitted.transform(dataset)?;
        Ok((fitted, transformed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Instance, Schema};
    use crate::metrics::DatasetMetric;

    fn credit_sample() -> Dataset {
        let mut instances = Vec::new();
        for i in 0..10 {
            instances.push(Instance::new(true, i < 6));
            instances.push(Instance::new(false, i < 3));
        }
        Dataset::new(Schema::new("age", "credit"), instances).unwrap()
    }

    #[test]
    fn factors_of_credit_sample() {
        let fitted = Reweighing::fit(&credit_sample()).unwrap();
        // N = 20, N(priv) = N(unpriv) = 10, N(fav) = 9, N(unfav) = 11
        assert!((fitted.privileged_favorable - 10.0 * 9.0 / (20.0 * 6.0)).abs() < 1e-12);
        assert!((fitted.privileged_unfavorable - 10.0 * 11.0 / (20.0 * 4.0)).abs() < 1e-12);
        assert!((fitted.unprivileged_favorable - 10.0 * 9.0 / (20.0 * 3.0)).abs() < 1e-12);
        assert!((fitted.unprivileged_unfavorable - 10.0 * 11.0 / (20.0 * 7.0)).abs() < 1e-12);
    }

    #[test]
    fn reweighing_removes_mean_difference() {
        let ds = credit_sample();
        let (_, reweighted) = Reweighing::fit_transform(&ds).unwrap();
        let md = DatasetMetric::new(&reweighted).mean_difference().unwrap();
        assert!(md.abs() < 1e-9);
        // total weight is preserved
        let total: f64 = reweighted.weights().iter().sum();
        assert!((total - 20.0).abs() < 1e-9);
    }

    #[test]
    fn input_is_not_mutated() {
        let ds = credit_sample();
        let _ = Reweighing::fit_transform(&ds).unwrap();
        assert!(ds.weights().iter().all(|&w| w == 1.0));
        assert!((DatasetMetric::new(&ds).mean_difference().unwrap() + 0.3).abs() < 1e-12);
    }

    #[test]
    fn refitting_reweighed_data_is_identity() {
        let (_, once) = Reweighing::fit_transform(&credit_sample()).unwrap();
        let (factors, twice) = Reweighing::fit_transform(&once).unwrap();
        for (p, f) in [(true, true), (true, false), (false, true), (false, false)] {
            assert!((factors.weight_for(p, f) - 1.0).abs() < 1e-9);
        }
        for (a, b) in once.weights().iter().zip(twice.weights()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_cell_is_degenerate() {
        let ds = Dataset::new(
            Schema::new("a", "y"),
            vec![
                Instance::new(true, true),
                Instance::new(true, false),
                Instance::new(false, true),
            ],
        )
        .unwrap();
        let err = Reweighing::fit(&ds).unwrap_err();
        assert!(matches!(err, FairnessError::DegenerateGroup(msg) if msg.contains("unprivileged, unfavorable")));
    }

    #[test]
    fn fitted_factors_apply_to_other_partitions() {
        let fitted = Reweighing::fit(&credit_sample()).unwrap();
        let other = Dataset::new(
            Schema::new("age", "credit"),
            vec![Instance::new(false, true).with_weight(2.0)],
        )
        .unwrap();
        let out = fitted.transform(&other).unwrap();
        assert!((out.weights()[0] - 2.0 * 1.5).abs() < 1e-12);
    }
}
