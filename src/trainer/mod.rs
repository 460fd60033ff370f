//! Generalized training pipeline
//!
//! One pipeline shape serves every variant:
//!
//! ```text
//! Concatenate("Features", feature columns)
//!   -> MinMaxNormalizer    (bounds from the training partition only)
//!   -> LogisticRegression  (aprender; label = label column, features = "Features")
//! ```
//!
//! The feature and label columns come from the variant's [`Schema`], so no
//! per-variant training code exists.

mod metrics;
mod normalize;

pub use metrics::BinaryMetrics;
pub use normalize::MinMaxNormalizer;

use crate::dataset::Dataset;
use crate::food::FoodVariant;
use crate::schema::Schema;
use crate::{Error, Result};
use aprender::classification::LogisticRegression;
use aprender::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the concatenated feature column.
pub const FEATURES_COLUMN: &str = "Features";

/// Probabilities are clamped to `[EPS, 1 - EPS]` before taking the logit.
const SCORE_EPSILON: f64 = 1e-7;

/// Logistic regression settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerOptions {
    /// Convergence tolerance of the optimizer
    pub optimization_tolerance: f32,
    /// Gradient descent step size on normalized features
    pub learning_rate: f32,
    /// Upper bound on optimizer iterations
    pub max_iterations: usize,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            optimization_tolerance: 1e-4,
            learning_rate: 1.0,
            max_iterations: 2000,
        }
    }
}

impl TrainerOptions {
    fn classifier(&self) -> LogisticRegression {
        LogisticRegression::new()
            .with_learning_rate(self.learning_rate)
            .with_max_iter(self.max_iterations)
            .with_tolerance(self.optimization_tolerance)
    }
}

/// Output of a binary classifier for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `probability > 0.5`
    pub predicted_label: bool,
    /// Calibrated probability of the positive class
    pub probability: f32,
    /// Log-odds of the positive class
    pub score: f32,
}

impl Prediction {
    /// Derive label and score from a positive-class probability.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_probability(probability: f32) -> Self {
        let p = f64::from(probability).clamp(SCORE_EPSILON, 1.0 - SCORE_EPSILON);
        Self {
            predicted_label: probability > 0.5,
            probability,
            score: (p / (1.0 - p)).ln() as f32,
        }
    }

    /// Derive label and probability from log-odds.
    ///
    /// Counterpart of [`Prediction::from_probability`] for callers that hold a
    /// raw margin, such as a linear score computed outside the crate. The
    /// result can be passed to [`BinaryMetrics::evaluate`] like any model
    /// output.
    ///
    /// ```rust
    /// use food_pipeline::trainer::Prediction;
    ///
    /// let prediction = Prediction::from_score(9.0f32.ln());
    /// assert!(prediction.predicted_label);
    /// assert!((prediction.probability - 0.9).abs() < 1e-5);
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_score(score: f32) -> Self {
        Self {
            predicted_label: score > 0.0,
            probability: (1.0 / (1.0 + (-f64::from(score)).exp())) as f32,
            score,
        }
    }
}

/// Fitted pipeline for one variant. Immutable after training.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    variant: FoodVariant,
    label_column: String,
    feature_columns: Vec<String>,
    feature_width: usize,
    normalizer: MinMaxNormalizer,
    classifier: LogisticRegression,
}

impl TrainedModel {
    /// Variant the model was trained for.
    #[must_use]
    pub const fn variant(&self) -> FoodVariant {
        self.variant
    }

    /// Label column name.
    #[must_use]
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Columns concatenated into the feature vector, in order.
    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Width of the concatenated feature vector.
    #[must_use]
    pub const fn feature_width(&self) -> usize {
        self.feature_width
    }

    /// Fitted normalizer.
    #[must_use]
    pub const fn normalizer(&self) -> &MinMaxNormalizer {
        &self.normalizer
    }

    /// Score one raw (unnormalized) feature vector. `features` is normalized
    /// in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataIntegrity`] if the vector has the wrong width.
    pub fn predict_features(&self, features: &mut [f32]) -> Result<Prediction> {
        if features.len() != self.feature_width {
            return Err(Error::DataIntegrity(format!(
                "{} model expects {} features, got {}",
                self.variant,
                self.feature_width,
                features.len()
            )));
        }
        self.normalizer.transform(features);
        let x = Matrix::from_vec(1, self.feature_width, features.to_vec())
            .map_err(|e| Error::DataIntegrity(e.to_string()))?;
        self.classifier
            .predict_proba(&x)
            .as_slice()
            .first()
            .map(|&p| Prediction::from_probability(p))
            .ok_or_else(|| Error::DataIntegrity(format!("{} model scored no rows", self.variant)))
    }

    /// Score every row of a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset lacks a feature column.
    pub fn transform(&self, dataset: &Dataset) -> Result<Vec<Prediction>> {
        let columns: Vec<&str> = self.feature_columns.iter().map(String::as_str).collect();
        let rows = dataset.feature_matrix(&columns)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let x = normalized_matrix(&self.normalizer, rows, self.feature_width)?;
        Ok(self
            .classifier
            .predict_proba(&x)
            .as_slice()
            .iter()
            .map(|&p| Prediction::from_probability(p))
            .collect())
    }
}

fn normalized_matrix(
    normalizer: &MinMaxNormalizer,
    rows: Vec<Vec<f32>>,
    width: usize,
) -> Result<Matrix<f32>> {
    let n_rows = rows.len();
    let mut data = Vec::with_capacity(n_rows * width);
    for mut row in rows {
        if row.len() != width {
            return Err(Error::DataIntegrity(format!(
                "expected {width} features, got {}",
                row.len()
            )));
        }
        normalizer.transform(&mut row);
        data.extend_from_slice(&row);
    }
    Matrix::from_vec(n_rows, width, data).map_err(|e| Error::DataIntegrity(e.to_string()))
}

/// Pipeline definition bound to one variant's schema.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    schema: Arc<Schema>,
    options: TrainerOptions,
}

impl TrainingPipeline {
    /// Build the pipeline for `schema`.
    #[must_use]
    pub fn new(schema: Arc<Schema>, options: TrainerOptions) -> Self {
        Self { schema, options }
    }

    /// Trainer settings.
    #[must_use]
    pub const fn options(&self) -> &TrainerOptions {
        &self.options
    }

    /// Columns fed into [`FEATURES_COLUMN`].
    #[must_use]
    pub fn feature_columns(&self) -> Vec<&'static str> {
        self.schema.feature_names()
    }

    /// Fit on the training partition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainingFailure`] if the partition has no rows, a
    /// single class, or the optimizer fails.
    pub fn fit(&self, train: &Dataset) -> Result<TrainedModel> {
        let variant = self.schema.variant();
        if train.variant() != variant {
            return Err(Error::DataIntegrity(format!(
                "pipeline for {variant} given a {} dataset",
                train.variant()
            )));
        }

        let feature_columns = self.feature_columns();
        let rows = train.feature_matrix(&feature_columns)?;
        let labels = train.labels()?;
        let width = self.schema.feature_width();

        if rows.is_empty() {
            return Err(Error::training(variant, "training partition has no rows"));
        }
        let positives = labels.iter().filter(|&&l| l).count();
        if positives == 0 || positives == labels.len() {
            return Err(Error::training(
                variant,
                format!("training partition holds a single class ({} rows)", labels.len()),
            ));
        }

        let normalizer = MinMaxNormalizer::fit(&rows, width)
            .map_err(|e| Error::training(variant, e.to_string()))?;
        let x = normalized_matrix(&normalizer, rows, width)?;
        let y: Vec<usize> = labels.iter().map(|&l| usize::from(l)).collect();

        let mut classifier = self.options.classifier();
        classifier
            .fit(&x, &y)
            .map_err(|e| Error::training(variant, e.to_string()))?;
        if classifier.predict_proba(&x).as_slice().iter().any(|p| !p.is_finite()) {
            return Err(Error::training(variant, "optimizer produced non-finite probabilities"));
        }

        tracing::debug!(
            variant = %variant,
            rows = y.len(),
            features = %feature_columns.join(","),
            "fitted logistic regression"
        );

        Ok(TrainedModel {
            variant,
            label_column: self.schema.label().exposed_name().to_string(),
            feature_columns: feature_columns.iter().map(ToString::to_string).collect(),
            feature_width: width,
            normalizer,
            classifier,
        })
    }

    /// Score `test` with `model` and compute metrics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainingFailure`] if the partition is empty.
    pub fn evaluate(&self, model: &TrainedModel, test: &Dataset) -> Result<BinaryMetrics> {
        let predictions = model.transform(test)?;
        let labels = test.labels()?;
        BinaryMetrics::evaluate(&predictions, &labels).ok_or_else(|| {
            Error::training(model.variant(), "evaluation partition is empty")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SyntheticGenerator;

    fn dataset(variant: FoodVariant, count: usize) -> Dataset {
        let records = SyntheticGenerator::new(21).generate_variant(variant, count);
        let schema = Schema::introspect(variant, records.first()).unwrap();
        Dataset::build(schema, &records).unwrap()
    }

    #[test]
    fn test_prediction_from_probability() {
        let p = Prediction::from_probability(0.5);
        assert!(!p.predicted_label);
        assert!(p.score.abs() < 1e-6);

        let high = Prediction::from_probability(0.9);
        assert!(high.predicted_label);
        assert!((high.score - 9.0f32.ln()).abs() < 1e-4);

        // Saturated probabilities keep a finite score
        assert!(Prediction::from_probability(1.0).score.is_finite());
        assert!(Prediction::from_probability(0.0).score.is_finite());
    }

    #[test]
    fn test_prediction_from_score() {
        let p = Prediction::from_score(0.0);
        assert!(!p.predicted_label);
        assert!((p.probability - 0.5).abs() < 1e-6);
        assert!(Prediction::from_score(2.0).predicted_label);
    }

    #[test]
    fn test_from_score_inverts_from_probability() {
        for probability in [0.1f32, 0.35, 0.5, 0.8, 0.97] {
            let expected = Prediction::from_probability(probability);
            let p = Prediction::from_score(expected.score);
            assert_eq!(p.predicted_label, expected.predicted_label);
            assert!((p.probability - probability).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fit_and_evaluate_each_variant() {
        for variant in FoodVariant::ALL {
            let data = dataset(variant, 200);
            let (train, test) = data.split(0.2, 3).unwrap();
            let pipeline = TrainingPipeline::new(Arc::clone(data.schema()), TrainerOptions::default());

            let model = pipeline.fit(&train).unwrap();
            let metrics = pipeline.evaluate(&model, &test).unwrap();

            assert_eq!(model.feature_width(), data.schema().feature_width());
            assert!(metrics.accuracy > 0.85, "{variant}: {metrics:?}");
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = dataset(FoodVariant::FoodType3, 120);
        let pipeline = TrainingPipeline::new(Arc::clone(data.schema()), TrainerOptions::default());

        let a = pipeline.fit(&data).unwrap().transform(&data).unwrap();
        let b = pipeline.fit(&data).unwrap().transform(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalizer_uses_training_rows_only() {
        let data = dataset(FoodVariant::FoodType1, 100);
        let (train, test) = data.split(0.2, 8).unwrap();
        let pipeline = TrainingPipeline::new(Arc::clone(data.schema()), TrainerOptions::default());
        let model = pipeline.fit(&train).unwrap();

        let train_max = train
            .feature_matrix(&["Value1"])
            .unwrap()
            .iter()
            .map(|r| r[0])
            .fold(f32::MIN, f32::max);
        assert!((model.normalizer().maxs()[0] - train_max).abs() < f32::EPSILON);

        // A held-out row beyond the training maximum maps above 1
        let test_max = test
            .feature_matrix(&["Value1"])
            .unwrap()
            .iter()
            .map(|r| r[0])
            .fold(f32::MIN, f32::max);
        if test_max > train_max {
            let mut row = vec![test_max, 0.0];
            model.normalizer().transform(&mut row);
            assert!(row[0] > 1.0);
        }
    }

    #[test]
    fn test_fit_single_class_is_training_failure() {
        let records = SyntheticGenerator::new(1).generate_variant(FoodVariant::FoodType1, 20);
        let schema = Schema::introspect(FoodVariant::FoodType1, None).unwrap();
        let data = Dataset::build(schema, &records).unwrap();
        let pipeline = TrainingPipeline::new(Arc::clone(data.schema()), TrainerOptions::default());

        let err = pipeline.fit(&data).unwrap_err();
        assert!(matches!(err, Error::TrainingFailure { .. }));
        assert!(err.to_string().contains("single class"));
    }

    #[test]
    fn test_predict_features_checks_width() {
        let data = dataset(FoodVariant::FoodType1, 100);
        let pipeline = TrainingPipeline::new(Arc::clone(data.schema()), TrainerOptions::default());
        let model = pipeline.fit(&data).unwrap();

        let mut short = vec![1.0];
        assert!(matches!(
            model.predict_features(&mut short),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_predict_features_matches_transform() {
        let data = dataset(FoodVariant::FoodType2, 100);
        let pipeline = TrainingPipeline::new(Arc::clone(data.schema()), TrainerOptions::default());
        let model = pipeline.fit(&data).unwrap();

        let batch = model.transform(&data).unwrap();
        let mut rows = data.feature_matrix(&pipeline.feature_columns()).unwrap();
        for (row, expected) in rows.iter_mut().zip(&batch).take(10) {
            let single = model.predict_features(row).unwrap();
            assert_eq!(single.predicted_label, expected.predicted_label);
            assert!((single.probability - expected.probability).abs() < 1e-6);
        }
    }
}
