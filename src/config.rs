//! Pipeline configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "dataset": {
//!     "protected_attribute": "age",
//!     "privileged": { "at_least": 25 },
//!     "label": "credit",
//!     "favorable": { "one_of": [1] }
//!   },
//!   "train_fraction": 0.7,
//!   "seed": 42
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::model::DatasetSpec;
use crate::error::{FairnessError, Result};

fn default_train_fraction() -> f64 {
    0.7
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub dataset: DatasetSpec,
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
    #[serde(default)]
    pub seed: u64,
}

impl PipelineConfig {
    pub fn new(dataset: DatasetSpec) -> Self {
        PipelineConfig {
            dataset,
            train_fraction: default_train_fraction(),
            seed: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(FairnessError::InvalidSplit(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if self.dataset.protected_attribute == self.dataset.label {
            return Err(FairnessError::SchemaMismatch(format!(
                "'{}' cannot be both protected attribute and label",
                self.dataset.label
            )));
        }
        Ok(())
    }
}

/// Read and validate a config file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: PipelineConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}
