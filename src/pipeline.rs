use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Table};
use crate::error::{FairnessError, Result};
use crate::metrics::{DatasetMetric, GroupCounts};
use crate::reweighing::Reweighing;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Metric values of one partition at one point of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub counts: GroupCounts,
    pub base_rate_privileged: f64,
    pub base_rate_unprivileged: f64,
    pub mean_difference: f64,
    /// `None` when the privileged group has no favorable outcomes.
    pub disparate_impact: Option<f64>,
}

impl MetricSummary {
    pub fn of(dataset: &Dataset) -> Result<Self> {
        let metric = DatasetMetric::new(dataset);
        Ok(MetricSummary {
            counts: GroupCounts::from_dataset(dataset),
            base_rate_privileged: metric.base_rate(Some(true))?,
            base_rate_unprivileged: metric.base_rate(Some(false))?,
            mean_difference: metric.mean_difference()?,
            disparate_impact: metric.disparate_impact().ok(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FairnessReport {
    pub protected_attribute: String,
    pub label: String,
    pub train_size: usize,
    pub test_size: usize,
    /// Training partition, original weights.
    pub before: MetricSummary,
    pub factors: Reweighing,
    /// Training partition after reweighing.
    pub after: MetricSummary,
}

impl fmt::Display for FairnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "protected attribute '{}', label '{}': {} train / {} test",
            self.protected_attribute, self.label, self.train_size, self.test_size
        )?;
        writeln!(
            f,
            "original training set:   mean difference = {:.6}",
            self.before.mean_difference
        )?;
        writeln!(
            f,
            "reweighed training set:  mean difference = {:.6}",
            self.after.mean_difference
        )?;
        write!(
            f,
            "weights: priv/fav {:.4}  priv/unfav {:.4}  unpriv/fav {:.4}  unpriv/unfav {:.4}",
            self.factors.privileged_favorable,
            self.factors.privileged_unfavorable,
            self.factors.unprivileged_favorable,
            self.factors.unprivileged_unfavorable
        )
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Everything the pipeline produces: the report and both reweighed partitions.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: FairnessReport,
    /// Training partition with fitted weights.
    pub train: Dataset,
    /// Test partition with the weights fitted on the training partition.
    pub test: Dataset,
}

/// Load → split → measure → reweigh → measure again.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    dataset: Dataset,
}

impl Pipeline {
    pub fn new(table: &Table, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        if table.is_empty() {
            return Err(FairnessError::InvalidSplit(
                "dataset has no rows to split".to_string(),
            ));
        }
        let dataset = Dataset::from_table(table, &config.dataset)?;
        Ok(Pipeline { config, dataset })
    }

    pub fn from_file(path: &Path, config: PipelineConfig) -> Result<Self> {
        let table = load_file(path)?;
        Self::new(&table, config)
    }

    pub fn run(&self) -> Result<PipelineOutput> {
        let (train, test) = self
            .dataset
            .split(self.config.train_fraction, self.config.seed)?;

        let before = MetricSummary::of(&train)?;
        let (factors, train_rw) = Reweighing::fit_transform(&train)?;
        let after = MetricSummary::of(&train_rw)?;
        let test_rw = factors.transform(&test)?;

        log::info!(
            "Mean difference on training set: {:.6} -> {:.6}",
            before.mean_difference,
            after.mean_difference
        );

        let schema = self.dataset.schema();
        Ok(PipelineOutput {
            report: FairnessReport {
                protected_attribute: schema.protected_attribute.clone(),
                label: schema.label.clone(),
                train_size: train.len(),
                test_size: test.len(),
                before,
                factors,
                after,
            },
            train: train_rw,
            test: test_rw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Predicate;
    use crate::data::model::{DatasetSpec, Record, Value};

    fn table(n: i64) -> Table {
        let records: Vec<Record> = (0..n)
            .map(|i| {
                let age = 18 + (i * 7) % 50;
                // older applicants get good credit more often
                let good = if age >= 25 { i % 3 != 0 } else { i % 3 == 0 };
                [
                    ("age".to_string(), Value::Integer(age)),
                    ("credit".to_string(), Value::Integer(if good { 1 } else { 2 })),
                    ("amount".to_string(), Value::Float(100.0 * i as f64)),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        Table::from_records(records)
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::new(DatasetSpec::new(
            "age",
            Predicate::AtLeast(25.0),
            "credit",
            Predicate::equals(Value::Integer(1)),
        ));
        config.seed = 3;
        config
    }

    #[test]
    fn run_balances_training_partition() {
        let pipeline = Pipeline::new(&table(200), config()).unwrap();
        let out = pipeline.run().unwrap();

        assert_eq!(out.report.train_size, 140);
        assert_eq!(out.report.test_size, 60);
        assert!(out.report.before.mean_difference < -0.1);
        assert!(out.report.after.mean_difference.abs() < 1e-9);
        assert_eq!(out.train.len(), 140);
        assert_eq!(out.test.len(), 60);
        assert!(out.test.weights().iter().all(|w| *w > 0.0 && w.is_finite()));
    }

    #[test]
    fn report_displays_both_measurements() {
        let out = Pipeline::new(&table(200), config()).unwrap().run().unwrap();
        let text = out.report.to_string();
        assert!(text.contains("original training set"));
        assert!(text.contains("reweighed training set"));
    }

    #[test]
    fn empty_table_is_rejected_up_front() {
        let empty = Table::new(vec!["age".into(), "credit".into()], Vec::new());
        let err = Pipeline::new(&empty, config()).unwrap_err();
        assert!(matches!(err, FairnessError::InvalidSplit(msg) if msg.contains("no rows")));
    }
}
