//! Group-fairness metrics over a binary-label, weighted dataset.
//!
//! All counts are weighted: an instance contributes its weight, so metrics
//! recomputed after [`crate::reweighing::Reweighing`] reflect the new weights.

use serde::Serialize;

use crate::data::filter::{weighted_count, Selection};
use crate::data::model::Dataset;
use crate::error::{FairnessError, Result};

/// Weighted sums of the four (protected, label) cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupCounts {
    pub privileged_favorable: f64,
    pub privileged_unfavorable: f64,
    pub unprivileged_favorable: f64,
    pub unprivileged_unfavorable: f64,
}

impl GroupCounts {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        GroupCounts {
            privileged_favorable: weighted_count(dataset, Selection::cell(true, true)),
            privileged_unfavorable: weighted_count(dataset, Selection::cell(true, false)),
            unprivileged_favorable: weighted_count(dataset, Selection::cell(false, true)),
            unprivileged_unfavorable: weighted_count(dataset, Selection::cell(false, false)),
        }
    }

    pub fn cell(&self, privileged: bool, favorable: bool) -> f64 {
        match (privileged, favorable) {
            (true, true) => self.privileged_favorable,
            (true, false) => self.privileged_unfavorable,
            (false, true) => self.unprivileged_favorable,
            (false, false) => self.unprivileged_unfavorable,
        }
    }

    /// Weighted size of a protected group.
    pub fn group(&self, privileged: bool) -> f64 {
        self.cell(privileged, true) + self.cell(privileged, false)
    }

    /// Weighted number of instances with the given label.
    pub fn label(&self, favorable: bool) -> f64 {
        self.cell(true, favorable) + self.cell(false, favorable)
    }

    pub fn total(&self) -> f64 {
        self.group(true) + self.group(false)
    }
}

/// Metrics of a dataset with a designated privileged group.
///
/// `group` arguments take `Some(true)` for the privileged group,
/// `Some(false)` for the unprivileged group and `None` for everything.
#[derive(Debug, Clone, Copy)]
pub struct DatasetMetric<'a> {
    dataset: &'a Dataset,
    swapped: bool,
}

impl<'a> DatasetMetric<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        DatasetMetric {
            dataset,
            swapped: false,
        }
    }

    /// Same dataset with the privileged and unprivileged groups exchanged.
    pub fn swapped(self) -> Self {
        DatasetMetric {
            swapped: !self.swapped,
            ..self
        }
    }

    fn selection(&self, group: Option<bool>, favorable: Option<bool>) -> Selection {
        Selection {
            privileged: group.map(|g| g != self.swapped),
            favorable,
        }
    }

    pub fn num_instances(&self, group: Option<bool>) -> f64 {
        weighted_count(self.dataset, self.selection(group, None))
    }

    pub fn num_positives(&self, group: Option<bool>) -> f64 {
        weighted_count(self.dataset, self.selection(group, Some(true)))
    }

    pub fn num_negatives(&self, group: Option<bool>) -> f64 {
        weighted_count(self.dataset, self.selection(group, Some(false)))
    }

    /// `P(favorable | group)`, weighted.
    pub fn base_rate(&self, group: Option<bool>) -> Result<f64> {
        let n = self.num_instances(group);
        if n <= 0.0 {
            return Err(FairnessError::DegenerateGroup(format!(
                "{} group is empty",
                group_name(group)
            )));
        }
        Ok(self.num_positives(group) / n)
    }

    /// `P(favorable | unprivileged) − P(favorable | privileged)`, in `[-1, 1]`.
    pub fn mean_difference(&self) -> Result<f64> {
        Ok(self.base_rate(Some(false))? - self.base_rate(Some(true))?)
    }

    pub fn statistical_parity_difference(&self) -> Result<f64> {
        self.mean_difference()
    }

    /// `P(favorable | unprivileged) / P(favorable | privileged)`.
    pub fn disparate_impact(&self) -> Result<f64> {
        let unpriv = self.base_rate(Some(false))?;
        let priv_rate = self.base_rate(Some(true))?;
        if priv_rate == 0.0 {
            return Err(FairnessError::DegenerateGroup(
                "privileged group has no favorable outcomes".to_string(),
            ));
        }
        Ok(unpriv / priv_rate)
    }
}

fn group_name(group: Option<bool>) -> &'static str {
    match group {
        Some(true) => "privileged",
        Some(false) => "unprivileged",
        None => "whole",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Instance, Schema};

    /// 10 privileged (6 favorable), 10 unprivileged (3 favorable).
    fn credit_sample() -> Dataset {
        let mut instances = Vec::new();
        for i in 0..10 {
            instances.push(Instance::new(true, i < 6));
            instances.push(Instance::new(false, i < 3));
        }
        Dataset::new(Schema::new("age", "credit"), instances).unwrap()
    }

    #[test]
    fn mean_difference_of_credit_sample() {
        let ds = credit_sample();
        let m = DatasetMetric::new(&ds);
        assert!((m.mean_difference().unwrap() - (-0.3)).abs() < 1e-12);
        assert!((m.disparate_impact().unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(m.num_instances(None), 20.0);
        assert_eq!(m.num_positives(Some(true)), 6.0);
        assert_eq!(m.num_negatives(Some(false)), 7.0);
    }

    #[test]
    fn swapping_groups_flips_sign() {
        let ds = credit_sample();
        let m = DatasetMetric::new(&ds);
        let d = m.mean_difference().unwrap();
        let s = m.swapped().mean_difference().unwrap();
        assert!((d + s).abs() < 1e-12);
        assert!((m.swapped().swapped().mean_difference().unwrap() - d).abs() < 1e-12);
    }

    #[test]
    fn empty_unprivileged_group_is_degenerate() {
        let ds = Dataset::new(
            Schema::new("age", "credit"),
            vec![Instance::new(true, true), Instance::new(true, false)],
        )
        .unwrap();
        let err = DatasetMetric::new(&ds).mean_difference().unwrap_err();
        assert!(matches!(err, FairnessError::DegenerateGroup(msg) if msg.contains("unprivileged")));
    }

    #[test]
    fn weights_drive_the_rates() {
        let ds = Dataset::new(
            Schema::new("a", "y"),
            vec![
                Instance::new(true, true).with_weight(3.0),
                Instance::new(true, false),
                Instance::new(false, true),
                Instance::new(false, false),
            ],
        )
        .unwrap();
        let m = DatasetMetric::new(&ds);
        assert!((m.base_rate(Some(true)).unwrap() - 0.75).abs() < 1e-12);
        assert!((m.mean_difference().unwrap() - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn group_counts_marginals() {
        let counts = GroupCounts::from_dataset(&credit_sample());
        assert_eq!(counts.cell(true, true), 6.0);
        assert_eq!(counts.group(false), 10.0);
        assert_eq!(counts.label(true), 9.0);
        assert_eq!(counts.total(), 20.0);
    }

    #[test]
    fn balanced_dataset_has_unit_disparate_impact() {
        let mut instances = Vec::new();
        for i in 0..5 {
            instances.push(Instance::new(true, i < 3));
            instances.push(Instance::new(false, i < 3));
        }
        let ds = Dataset::new(Schema::new("sex", "credit"), instances).unwrap();
        let m = DatasetMetric::new(&ds);
        assert_eq!(m.disparate_impact().unwrap(), 1.0);
        assert_eq!(m.mean_difference().unwrap(), 0.0);
    }

    #[test]
    fn reweighed_sample_has_unit_disparate_impact() {
        let (_, reweighed) = crate::reweighing::Reweighing::fit_transform(&credit_sample()).unwrap();
        let di = DatasetMetric::new(&reweighed).disparate_impact().unwrap();
        assert!((di - 1.0).abs() < 1e-9, "disparate impact {di}");
    }

    #[test]
    fn no_privileged_favorable_outcomes_is_degenerate() {
        let ds = Dataset::new(
            Schema::new("age", "credit"),
            vec![
                Instance::new(true, false),
                Instance::new(true, false),
                Instance::new(false, true),
                Instance::new(false, false),
            ],
        )
        .unwrap();
        let err = DatasetMetric::new(&ds).disparate_impact().unwrap_err();
        assert!(matches!(err, FairnessError::DegenerateGroup(msg) if msg.contains("privileged")));

        let summary = crate::pipeline::MetricSummary::of(&ds).unwrap();
        assert_eq!(summary.disparate_impact, None);
        assert!((summary.mean_difference - 0.5).abs() < 1e-12);
    }
}
