//! `food-pipeline [RECORD_DIR]`
//!
//! Trains one model per food variant and predicts the reserved pool.
//! With `RECORD_DIR`, records come from the `*.json` files in that
//! directory; otherwise they are generated. `FOOD_PIPELINE_CONFIG` may name
//! a JSON config file.

use anyhow::{bail, Context, Result};
use food_pipeline::config::PipelineConfig;
use food_pipeline::generator::SyntheticGenerator;
use food_pipeline::pipeline::TrainingDriver;
use food_pipeline::storage::{load_record_dir, LoadedRecords};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "FOOD_PIPELINE_CONFIG";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path.to_string_lossy()))?,
        None => PipelineConfig::default(),
    };

    let mut args = std::env::args_os().skip(1);
    let record_dir = args.next();
    if args.next().is_some() {
        bail!("usage: food-pipeline [RECORD_DIR]");
    }

    let pools = match &record_dir {
        Some(dir) => load_record_dir(dir, config.holdout_fraction, config.seed)
            .with_context(|| format!("loading records from {}", dir.to_string_lossy()))?,
        None => {
            let records =
                SyntheticGenerator::new(config.seed).generate(config.samples_per_variant);
            LoadedRecords::split(records, config.holdout_fraction, config.seed)?
        }
    };
    if pools.training.is_empty() {
        bail!("no training records");
    }
    tracing::info!(
        training = pools.training.len(),
        holdout = pools.holdout.len(),
        "prepared records"
    );

    let driver = TrainingDriver::new(config);
    let report = driver.train_records(pools.training);
    for (variant, error) in report.failed() {
        tracing::warn!(variant = %variant, error = %error, "training failed");
    }
    if report.succeeded().next().is_none() {
        bail!("every variant failed to train");
    }

    let mut agreed = 0usize;
    let mut scored = 0usize;
    for record in &pools.holdout {
        match driver.registry().predict(record) {
            Ok(prediction) => {
                scored += 1;
                if prediction.predicted_label == record.answer() {
                    agreed += 1;
                }
                tracing::debug!(
                    variant = %record.variant(),
                    predicted = prediction.predicted_label,
                    probability = prediction.probability,
                    actual = record.answer(),
                    "prediction"
                );
            }
            Err(e) => tracing::warn!(variant = %record.variant(), error = %e, "prediction failed"),
        }
    }
    tracing::info!(scored, agreed, "predicted holdout pool");

    tracing::debug!(ledger = %driver.ledger().to_json()?, "run ledger");
    Ok(())
}
