//! Pipeline configuration
//!
//! Defaults reproduce the reference run: 3000 records per variant, 20% of
//! each dataset held out for evaluation, 5% of all records reserved as the
//! prediction pool, seed 42.
//!
//! ```rust
//! use food_pipeline::config::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .seed(7)
//!     .samples_per_variant(500)
//!     .build()?;
//! assert_eq!(config.seed, 7);
//! assert!((config.test_fraction - 0.2).abs() < f64::EPSILON);
//! # Ok::<(), food_pipeline::Error>(())
//! ```

use crate::trainer::TrainerOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of one training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for generation, pooling and splitting
    pub seed: u64,
    /// Synthetic records generated per variant
    pub samples_per_variant: usize,
    /// Fraction of each dataset held out for evaluation
    pub test_fraction: f64,
    /// Fraction of all records reserved for prediction, never trained on
    pub holdout_fraction: f64,
    /// Logistic regression settings
    pub trainer: TrainerOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            samples_per_variant: 3000,
            test_fraction: 0.2,
            holdout_fraction: 0.05,
            trainer: TrainerOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Start from defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Parse and validate a JSON document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed input or [`Error::Config`] if a
    /// value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`PipelineConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(Error::Config(format!(
                "holdout_fraction must be in [0, 1), got {}",
                self.holdout_fraction
            )));
        }
        if self.samples_per_variant == 0 {
            return Err(Error::Config(
                "samples_per_variant must be positive".to_string(),
            ));
        }
        let trainer = &self.trainer;
        if !(trainer.optimization_tolerance > 0.0) {
            return Err(Error::Config(format!(
                "optimization_tolerance must be positive, got {}",
                trainer.optimization_tolerance
            )));
        }
        if !(trainer.learning_rate > 0.0 && trainer.learning_rate.is_finite()) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                trainer.learning_rate
            )));
        }
        if trainer.max_iterations == 0 {
            return Err(Error::Config(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set synthetic records per variant.
    #[must_use]
    pub const fn samples_per_variant(mut self, count: usize) -> Self {
        self.config.samples_per_variant = count;
        self
    }

    /// Set the evaluation hold-out fraction.
    #[must_use]
    pub const fn test_fraction(mut self, fraction: f64) -> Self {
        self.config.test_fraction = fraction;
        self
    }

    /// Set the prediction pool fraction.
    #[must_use]
    pub const fn holdout_fraction(mut self, fraction: f64) -> Self {
        self.config.holdout_fraction = fraction;
        self
    }

    /// Set logistic regression options.
    #[must_use]
    pub const fn trainer(mut self, options: TrainerOptions) -> Self {
        self.config.trainer = options;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is out of range.
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
