//! Run Ledger - in-memory storage for run tracking data

use std::collections::BTreeMap;

use serde::Serialize;

use super::{MetricRecord, RunRecord};
use crate::food::FoodVariant;
use crate::Result;

/// In-memory store of runs and their metrics.
///
/// Runs are keyed by ID in a `BTreeMap` so exports are ordered. Metrics are
/// appended to a vector and filtered per query.
#[derive(Debug, Default, Serialize)]
pub struct RunLedger {
    runs: BTreeMap<String, RunRecord>,
    metrics: Vec<MetricRecord>,
}

impl RunLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the ledger holds no runs and no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.metrics.is_empty()
    }

    /// Number of runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Number of metric points.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Next free run ID for `variant`, e.g. `FoodType1-run-2`.
    #[must_use]
    pub fn next_run_id(&self, variant: FoodVariant) -> String {
        let previous = self.runs.values().filter(|r| r.variant() == variant).count();
        format!("{variant}-run-{}", previous + 1)
    }

    /// Add or replace a run.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// All runs, ordered by ID.
    pub fn runs(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.values()
    }

    /// Runs of one variant.
    #[must_use]
    pub fn runs_for_variant(&self, variant: FoodVariant) -> Vec<&RunRecord> {
        self.runs.values().filter(|r| r.variant() == variant).collect()
    }

    /// Add a metric point.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Add many metric points.
    pub fn extend_metrics(&mut self, metrics: impl IntoIterator<Item = MetricRecord>) {
        self.metrics.extend(metrics);
    }

    /// Metrics of one run and key, sorted by step.
    #[must_use]
    pub fn metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.run_id() == run_id && m.key() == key)
            .cloned()
            .collect();

        metrics.sort_by_key(MetricRecord::step);

        metrics
    }

    /// Latest value of a metric for a run.
    #[must_use]
    pub fn last_value(&self, run_id: &str, key: &str) -> Option<f64> {
        self.metrics_for_run(run_id, key).last().map(MetricRecord::value)
    }

    /// Export runs and metrics as pretty JSON.
    ///
    /// Non-finite metric values serialize as `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
