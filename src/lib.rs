//! # food-pipeline: Schema-Driven Training over Heterogeneous Records
//!
//! Trains one binary classifier per record variant ("food type") with a
//! single generalized pipeline. Each variant's fields, roles and exposed
//! column names come from a compile-time field table; the pipeline reads
//! them instead of hard-coding columns.
//!
//! ## Design Principles
//!
//! - **One pipeline shape**: concatenate features, min-max normalize,
//!   `aprender` logistic regression. Only the schema varies per variant.
//! - **Isolated passes**: a failing variant never stops the others.
//! - **Lazy engines**: a variant's prediction engine is built on its first
//!   prediction and reused afterwards.
//!
//! ## Example Usage
//!
//! ```rust
//! use food_pipeline::config::PipelineConfig;
//! use food_pipeline::food::{FoodRecord, FoodType1};
//! use food_pipeline::generator::SyntheticGenerator;
//! use food_pipeline::pipeline::TrainingDriver;
//!
//! let config = PipelineConfig::builder().samples_per_variant(150).build()?;
//! let records = SyntheticGenerator::new(config.seed).generate(config.samples_per_variant);
//!
//! let driver = TrainingDriver::new(config);
//! let report = driver.train_records(records);
//! assert!(report.is_complete());
//!
//! let prediction = driver
//!     .registry()
//!     .predict(&FoodRecord::from(FoodType1::new(100.0, 5.0)))?;
//! assert!(prediction.predicted_label);
//! # Ok::<(), food_pipeline::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod food;
pub mod generator;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod tracking;
pub mod trainer;

pub use error::{Error, Result};
