//! Training/evaluation driver
//!
//! Runs one independent pass per variant:
//!
//! ```text
//! records -> Schema -> Dataset -> split -> fit -> evaluate -> registry
//! ```
//!
//! Each pass is its own failure boundary: an error in one variant is recorded
//! in the [`TrainingReport`] and the run ledger, and other variants carry on.
//! With the `rayon` feature (default) passes run in parallel.

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::food::{group_by_variant, FoodRecord, FoodVariant};
use crate::registry::ModelRegistry;
use crate::schema::Schema;
use crate::tracking::{MetricRecord, RunLedger, RunRecord, RunStatus};
use crate::trainer::{BinaryMetrics, TrainedModel, TrainingPipeline};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Ledger key of the accuracy on the training partition.
pub const TRAIN_ACCURACY: &str = "train_accuracy";
/// Ledger key of the log-loss (bits) on the training partition.
pub const TRAIN_LOG_LOSS: &str = "train_log_loss";

/// Successful pass of one variant.
#[derive(Debug, Clone)]
pub struct VariantReport {
    /// Variant trained
    pub variant: FoodVariant,
    /// Run ID in the ledger
    pub run_id: String,
    /// Rows in the training partition
    pub train_rows: usize,
    /// Rows in the evaluation partition
    pub test_rows: usize,
    /// Evaluation metrics
    pub metrics: BinaryMetrics,
    /// Registered model
    pub model: Arc<TrainedModel>,
}

/// Outcome of every variant pass, in variant order.
#[derive(Debug, Default)]
pub struct TrainingReport {
    outcomes: Vec<(FoodVariant, Result<VariantReport>)>,
}

impl TrainingReport {
    /// All outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[(FoodVariant, Result<VariantReport>)] {
        &self.outcomes
    }

    /// Successful passes.
    pub fn succeeded(&self) -> impl Iterator<Item = &VariantReport> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Failed passes.
    pub fn failed(&self) -> impl Iterator<Item = (FoodVariant, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|(v, r)| r.as_ref().err().map(|e| (*v, e)))
    }

    /// Report of one variant.
    #[must_use]
    pub fn get(&self, variant: FoodVariant) -> Option<&Result<VariantReport>> {
        self.outcomes
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, r)| r)
    }

    /// Whether every pass succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }
}

/// Drives per-variant training passes into a shared registry.
#[derive(Debug)]
pub struct TrainingDriver {
    config: PipelineConfig,
    registry: Arc<ModelRegistry>,
    ledger: Mutex<RunLedger>,
}

impl TrainingDriver {
    /// Create a driver with a fresh registry.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_registry(config, Arc::new(ModelRegistry::new()))
    }

    /// Create a driver that registers models into `registry`.
    #[must_use]
    pub fn with_registry(config: PipelineConfig, registry: Arc<ModelRegistry>) -> Self {
        Self {
            config,
            registry,
            ledger: Mutex::new(RunLedger::new()),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Registry receiving trained models.
    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Locked view of the run ledger.
    pub fn ledger(&self) -> MutexGuard<'_, RunLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Group records by variant, build one dataset per variant and train
    /// each. Schema or dataset errors fail only their own variant.
    pub fn train_records(&self, records: Vec<FoodRecord>) -> TrainingReport {
        let groups: Vec<(FoodVariant, Vec<FoodRecord>)> =
            group_by_variant(records).into_iter().collect();

        self.run_passes(groups, |variant, records| {
            let schema = Schema::introspect(variant, records.first())?;
            Dataset::build(schema, &records)
        })
    }

    /// Train every prebuilt dataset.
    pub fn train_all(&self, datasets: Vec<Dataset>) -> TrainingReport {
        let passes: Vec<(FoodVariant, Dataset)> =
            datasets.into_iter().map(|d| (d.variant(), d)).collect();
        self.run_passes(passes, |_, dataset| Ok(dataset))
    }

    fn run_passes<T, F>(&self, inputs: Vec<(FoodVariant, T)>, prepare: F) -> TrainingReport
    where
        T: Send,
        F: Fn(FoodVariant, T) -> Result<Dataset> + Sync,
    {
        let pass = |(variant, input): (FoodVariant, T)| {
            let run_id = self.open_run(variant);
            let outcome = prepare(variant, input)
                .and_then(|dataset| self.train_dataset(&run_id, &dataset));
            self.close_run(&run_id, outcome.as_ref().err());
            (variant, outcome)
        };

        #[cfg(feature = "rayon")]
        let mut outcomes: Vec<_> = inputs.into_par_iter().map(pass).collect();
        #[cfg(not(feature = "rayon"))]
        let mut outcomes: Vec<_> = inputs.into_iter().map(pass).collect();

        outcomes.sort_by_key(|(variant, _)| *variant);
        TrainingReport { outcomes }
    }

    /// Train and evaluate one dataset under a fresh run.
    ///
    /// # Errors
    ///
    /// Returns the first error of the split, fit or evaluate step.
    pub fn train_variant(&self, dataset: &Dataset) -> Result<VariantReport> {
        let run_id = self.open_run(dataset.variant());
        let outcome = self.train_dataset(&run_id, dataset);
        self.close_run(&run_id, outcome.as_ref().err());
        outcome
    }

    fn open_run(&self, variant: FoodVariant) -> String {
        let mut ledger = self.ledger();
        let run_id = ledger.next_run_id(variant);
        let mut run = RunRecord::new(run_id.clone(), variant);
        run.start();
        ledger.add_run(run);
        run_id
    }

    fn close_run(&self, run_id: &str, error: Option<&Error>) {
        let mut ledger = self.ledger();
        if let Some(mut run) = ledger.get_run(run_id).cloned() {
            match error {
                Some(e) => run.fail(e.to_string()),
                None => run.complete(RunStatus::Success),
            }
            ledger.add_run(run);
        }
    }

    fn train_dataset(&self, run_id: &str, dataset: &Dataset) -> Result<VariantReport> {
        let variant = dataset.variant();
        let span = tracing::info_span!("train", variant = %variant, run_id);
        let _guard = span.enter();

        let (train, test) = dataset.split(self.config.test_fraction, self.config.seed)?;
        if test.num_rows() == 0 {
            return Err(Error::training(
                variant,
                format!("{} rows leave nothing to evaluate on", dataset.num_rows()),
            ));
        }
        tracing::info!(
            train_rows = train.num_rows(),
            test_rows = test.num_rows(),
            columns = %dataset.column_names().join(","),
            "training"
        );

        let pipeline = TrainingPipeline::new(Arc::clone(dataset.schema()), self.config.trainer);
        let model = pipeline.fit(&train)?;
        let fitted = pipeline.evaluate(&model, &train)?;
        let metrics = pipeline.evaluate(&model, &test)?;

        {
            let mut ledger = self.ledger();
            ledger.extend_metrics([
                MetricRecord::new(run_id, TRAIN_ACCURACY, 0, fitted.accuracy),
                MetricRecord::new(run_id, TRAIN_LOG_LOSS, 0, fitted.log_loss),
            ]);
            ledger.extend_metrics(
                metrics
                    .named()
                    .into_iter()
                    .map(|(key, value)| MetricRecord::new(run_id, key, 0, value)),
            );
        }

        tracing::info!(
            accuracy = metrics.accuracy,
            log_loss = metrics.log_loss,
            log_loss_reduction = metrics.log_loss_reduction,
            train_accuracy = fitted.accuracy,
            "evaluated"
        );

        let model = self.registry.register(model);
        Ok(VariantReport {
            variant,
            run_id: run_id.to_string(),
            train_rows: train.num_rows(),
            test_rows: test.num_rows(),
            metrics,
            model,
        })
    }
}
