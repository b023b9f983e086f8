//! Command-line interface.
//!
//! ```bash
//! rusty-fair report german.csv --protected age --privileged-at-least 25 \
//!     --label credit --favorable 1
//! rusty-fair report loans.csv --protected age --privileged-below 65 \
//!     --label repaid --favorable yes
//! rusty-fair report german.csv --config german.json --json
//! rusty-fair reweigh german.csv --config german.json --output train_weighted.parquet
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::{load_config, PipelineConfig};
use crate::data::filter::Predicate;
use crate::data::model::{DatasetSpec, Value};
use crate::error::{FairnessError, Result};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "rusty-fair")]
#[command(version)]
#[command(about = "Measure group fairness and reweigh binary-label datasets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print mean difference before and after reweighing the training split
    Report(ReportArgs),

    /// Reweigh the training split and write it to a file
    Reweigh(ReweighArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ReportArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ReweighArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output file for the reweighed training split (.csv, .json, .parquet)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write the test split, weighted with the training factors
    #[arg(long)]
    pub test_output: Option<PathBuf>,
}

/// Dataset location plus the settings that override the config file.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PipelineArgs {
    /// Input dataset (.csv, .json, .parquet)
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// JSON pipeline configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Protected attribute column
    #[arg(long)]
    pub protected: Option<String>,

    /// Raw values of the protected column that mark the privileged group
    #[arg(long, num_args = 1.., conflicts_with_all = ["privileged_at_least", "privileged_below"])]
    pub privileged: Vec<Value>,

    /// Privileged when the protected column is at least this value
    #[arg(long, conflicts_with = "privileged_below")]
    pub privileged_at_least: Option<f64>,

    /// Privileged when the protected column is below this value
    #[arg(long)]
    pub privileged_below: Option<f64>,

    /// Label column
    #[arg(long)]
    pub label: Option<String>,

    /// Raw label values that are favorable
    #[arg(long, num_args = 1..)]
    pub favorable: Vec<Value>,

    /// Column holding initial instance weights
    #[arg(long)]
    pub weights: Option<String>,

    /// Fraction of instances in the training split
    #[arg(long)]
    pub train_fraction: Option<f64>,

    /// Shuffle seed for the split
    #[arg(long)]
    pub seed: Option<u64>,
}

impl PipelineArgs {
    /// Start from the config file (if any) and apply the flags on top.
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let base = self.config.as_deref().map(load_config).transpose()?;
        let mut config = match base {
            Some(config) => config,
            None => PipelineConfig::new(self.spec_from_flags()?),
        };

        if let Some(col) = &self.protected {
            config.dataset.protected_attribute = col.clone();
        }
        if let Some(p) = self.privileged_predicate() {
            config.dataset.privileged = p;
        }
        if let Some(col) = &self.label {
            config.dataset.label = col.clone();
        }
        if !self.favorable.is_empty() {
            config.dataset.favorable = Predicate::OneOf(self.favorable.iter().cloned().collect());
        }
        if let Some(col) = &self.weights {
            config.dataset.instance_weights = Some(col.clone());
        }
        if let Some(f) = self.train_fraction {
            config.train_fraction = f;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn data_path(&self) -> &Path {
        &self.data
    }

    fn privileged_predicate(&self) -> Option<Predicate> {
        match (self.privileged_at_least, self.privileged_below) {
            (Some(t), _) => Some(Predicate::AtLeast(t)),
            (None, Some(t)) => Some(Predicate::Below(t)),
            (None, None) if !self.privileged.is_empty() => {
                Some(Predicate::OneOf(self.privileged.iter().cloned().collect()))
            }
            (None, None) => None,
        }
    }

    fn spec_from_flags(&self) -> Result<DatasetSpec> {
        let missing = |flag: &str| {
            FairnessError::SchemaMismatch(format!("--{flag} is required without --config"))
        };
        let protected = self.protected.clone().ok_or_else(|| missing("protected"))?;
        let privileged = self.privileged_predicate().ok_or_else(|| missing("privileged"))?;
        let label = self.label.clone().ok_or_else(|| missing("label"))?;
        if self.favorable.is_empty() {
            return Err(missing("favorable"));
        }
        let favorable = Predicate::OneOf(self.favorable.iter().cloned().collect());
        Ok(DatasetSpec::new(protected, privileged, label, favorable))
    }
}
