//! Training run tracking
//!
//! Every per-variant training pass is recorded as a [`RunRecord`]; fit and
//! evaluation metrics are recorded as [`MetricRecord`]s.
//!
//! ```text
//! RunRecord (1 per variant pass)
//!     └──< MetricRecord (N) [train_* fit metrics, evaluation metrics]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use food_pipeline::food::FoodVariant;
//! use food_pipeline::tracking::{MetricRecord, RunLedger, RunRecord, RunStatus};
//!
//! let mut ledger = RunLedger::new();
//!
//! let mut run = RunRecord::new("run-001", FoodVariant::FoodType1);
//! run.start();
//! ledger.add_metric(MetricRecord::new(run.run_id(), "loss", 1, 0.4));
//! run.complete(RunStatus::Success);
//! ledger.add_run(run);
//!
//! assert_eq!(ledger.metrics_for_run("run-001", "loss").len(), 1);
//! ```

mod ledger;
mod metric_record;
mod run_record;

pub use ledger::RunLedger;
pub use metric_record::MetricRecord;
pub use run_record::{RunRecord, RunStatus};
