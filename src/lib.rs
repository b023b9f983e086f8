//! Group-fairness metrics and reweighing for binary-label tabular datasets.
//!
//! ```text
//! load_file ──► Table ──► Dataset::from_table(spec) ──► split
//!                                                         │
//!                     DatasetMetric::mean_difference ◄────┤
//!                                                         ▼
//!                           Reweighing::fit_transform ──► Dataset (weighted)
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod reweighing;

pub use data::filter::Predicate;
pub use data::model::{Dataset, DatasetSpec, Instance, Schema, Table, Value};
pub use error::{FairnessError, Result};
pub use metrics::{DatasetMetric, GroupCounts};
pub use pipeline::{FairnessReport, Pipeline, PipelineOutput};
pub use reweighing::Reweighing;
