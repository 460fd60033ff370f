//! Basic food-pipeline usage: train one model per variant, then predict
//!
//! This example demonstrates:
//! - Seeded synthetic records for every food variant
//! - Schema-driven training (one pipeline shape, per-variant columns)
//! - Evaluation metrics per variant
//! - Predictions through the lazily created engines
//!
//! Run with: cargo run --example basic_usage

use food_pipeline::config::PipelineConfig;
use food_pipeline::food::{FoodRecord, FoodType1, FoodType2, FoodType3};
use food_pipeline::generator::SyntheticGenerator;
use food_pipeline::pipeline::TrainingDriver;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== food-pipeline Basic Usage Example ===\n");

    let config = PipelineConfig::builder()
        .seed(42)
        .samples_per_variant(1_000)
        .build()?;

    // Generate labeled records
    println!("Generating synthetic records ({} per variant)...", config.samples_per_variant);
    let records = SyntheticGenerator::new(config.seed).generate(config.samples_per_variant);
    println!("  ✓ Generated {} records\n", records.len());

    // Train every variant through the same pipeline
    println!("Training one model per variant...");
    let driver = TrainingDriver::new(config);
    let report = driver.train_records(records);

    for outcome in report.succeeded() {
        println!(
            "  ✓ {}: {} train / {} test rows, features [{}]",
            outcome.variant,
            outcome.train_rows,
            outcome.test_rows,
            outcome.model.feature_columns().join(", ")
        );
        println!(
            "      accuracy {:.4}, AUC {:.4}, log-loss {:.4} bits, F1 {:.4}",
            outcome.metrics.accuracy,
            outcome.metrics.auc,
            outcome.metrics.log_loss,
            outcome.metrics.f1_score
        );
    }
    for (variant, error) in report.failed() {
        println!("  ✗ {variant}: {error}");
    }
    println!();

    // Predict unseen records; each variant's engine is built on first use
    println!("Predicting new records:");
    let samples = [
        FoodRecord::from(FoodType1::new(100.0, 5.0)),
        FoodRecord::from(FoodType1::new(10.0, 1.0)),
        FoodRecord::from(FoodType2::new(120.0, 124.0, 8.0)),
        FoodRecord::from(FoodType3::new(37.0, vec![4.5, 2.25, 18.5], 3.0)),
    ];
    for record in &samples {
        let prediction = driver.registry().predict(record)?;
        println!(
            "  {}: label={} probability={:.4} score={:.3}",
            record.variant(),
            prediction.predicted_label,
            prediction.probability,
            prediction.score
        );
    }
    println!(
        "\n  ✓ Engines created: {} (one per predicted variant)\n",
        driver.registry().engine_count()
    );

    Ok(())
}
