//! Per-variant model registry and prediction driver
//!
//! Two maps keyed by [`FoodVariant`]:
//! - variant -> trained model (`Arc`, written once per training pass)
//! - variant -> prediction engine (created on first prediction, then reused)
//!
//! Both are sharded `DashMap`s, so training passes on other threads can
//! register models while predictions are served.
//!
//! ```rust
//! use food_pipeline::food::{FoodRecord, FoodType1};
//! use food_pipeline::registry::ModelRegistry;
//! use food_pipeline::Error;
//!
//! let registry = ModelRegistry::new();
//! let record = FoodRecord::from(FoodType1::new(100.0, 5.0));
//! assert!(matches!(registry.predict(&record), Err(Error::UnknownVariant(_))));
//! ```

use crate::food::{FieldValue, FoodRecord, FoodVariant};
use crate::trainer::TrainedModel;
use crate::{Error, Result};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

pub use crate::trainer::Prediction;

/// Reusable single-record scorer bound to one model.
///
/// Construction resolves which record fields feed the model, in which order;
/// scoring then only copies values into a reused buffer.
#[derive(Debug)]
pub struct PredictionEngine {
    model: Arc<TrainedModel>,
    slots: Vec<usize>,
    buffer: Vec<f32>,
    predictions: u64,
}

impl PredictionEngine {
    /// Bind an engine to `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if a model feature column is not declared by
    /// the model's variant.
    pub fn new(model: Arc<TrainedModel>) -> Result<Self> {
        let variant = model.variant();
        let fields = variant.fields();
        let slots = model
            .feature_columns()
            .iter()
            .map(|column| {
                fields
                    .iter()
                    .position(|f| f.exposed_name() == column)
                    .ok_or_else(|| {
                        Error::Schema(format!("{variant} has no field exposed as '{column}'"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let buffer = Vec::with_capacity(model.feature_width());

        Ok(Self {
            model,
            slots,
            buffer,
            predictions: 0,
        })
    }

    /// Model this engine scores with.
    #[must_use]
    pub const fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }

    /// Number of predictions served.
    #[must_use]
    pub const fn predictions(&self) -> u64 {
        self.predictions
    }

    /// Score one record. The label field is never read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataIntegrity`] if the record's variant or feature
    /// width does not match the model.
    pub fn predict(&mut self, record: &FoodRecord) -> Result<Prediction> {
        if record.variant() != self.model.variant() {
            return Err(Error::DataIntegrity(format!(
                "{} engine given a {} record",
                self.model.variant(),
                record.variant()
            )));
        }

        let values = record.field_values();
        self.buffer.clear();
        for &slot in &self.slots {
            match values[slot] {
                FieldValue::Scalar(v) => self.buffer.push(v),
                FieldValue::Vector(v) => self.buffer.extend_from_slice(v),
                FieldValue::Boolean(_) => {
                    return Err(Error::DataIntegrity(format!(
                        "boolean field at position {slot} cannot be a feature"
                    )));
                }
            }
        }

        let prediction = self.model.predict_features(&mut self.buffer)?;
        self.predictions += 1;
        Ok(prediction)
    }
}

/// Variant-keyed models and their cached prediction engines.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: DashMap<FoodVariant, Arc<TrainedModel>, FxBuildHasher>,
    engines: DashMap<FoodVariant, PredictionEngine, FxBuildHasher>,
}

impl ModelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trained model, replacing any previous model of its variant.
    ///
    /// A cached engine bound to the replaced model is dropped.
    pub fn register(&self, model: impl Into<Arc<TrainedModel>>) -> Arc<TrainedModel> {
        let model = model.into();
        let variant = model.variant();
        if self.models.insert(variant, Arc::clone(&model)).is_some() {
            self.engines.remove(&variant);
            tracing::info!(variant = %variant, "replaced trained model");
        }
        model
    }

    /// Model of `variant`, if trained.
    #[must_use]
    pub fn model(&self, variant: FoodVariant) -> Option<Arc<TrainedModel>> {
        self.models.get(&variant).map(|m| Arc::clone(m.value()))
    }

    /// Whether a model of `variant` is registered.
    #[must_use]
    pub fn contains(&self, variant: FoodVariant) -> bool {
        self.models.contains_key(&variant)
    }

    /// Variants with a registered model, sorted.
    #[must_use]
    pub fn variants(&self) -> Vec<FoodVariant> {
        let mut variants: Vec<FoodVariant> = self.models.iter().map(|e| *e.key()).collect();
        variants.sort_unstable();
        variants
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Number of prediction engines created so far.
    #[must_use]
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Predictions served by the engine of `variant`, if one exists.
    #[must_use]
    pub fn engine_predictions(&self, variant: FoodVariant) -> Option<u64> {
        self.engines.get(&variant).map(|e| e.predictions())
    }

    /// Predict the label of `record` with its variant's model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariant`] if no model is registered for the
    /// record's variant.
    pub fn predict(&self, record: &FoodRecord) -> Result<Prediction> {
        let variant = record.variant();
        let mut engine = self.engines.entry(variant).or_try_insert_with(|| {
            let model = self.model(variant).ok_or(Error::UnknownVariant(variant))?;
            tracing::debug!(variant = %variant, "creating prediction engine");
            PredictionEngine::new(model)
        })?;
        engine.predict(record)
    }

    /// Predict every record; a failure affects only its own entry.
    pub fn predict_batch(&self, records: &[FoodRecord]) -> Vec<Result<Prediction>> {
        records.iter().map(|record| self.predict(record)).collect()
    }
}
