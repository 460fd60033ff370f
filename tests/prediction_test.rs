//! Integration tests for the per-variant registry and prediction driver
//!
//! Covers:
//! 1. Label agreement on known scenarios
//! 2. Unknown variants
//! 3. Engine caching across many predictions
//! 4. Concurrent prediction

use food_pipeline::config::PipelineConfig;
use food_pipeline::food::{FoodRecord, FoodType1, FoodType2, FoodType3, FoodVariant};
use food_pipeline::generator::SyntheticGenerator;
use food_pipeline::pipeline::TrainingDriver;
use food_pipeline::registry::ModelRegistry;
use food_pipeline::storage::LoadedRecords;
use food_pipeline::Error;
use std::sync::Arc;

fn trained_driver(seed: u64) -> TrainingDriver {
    let config = PipelineConfig::builder()
        .seed(seed)
        .samples_per_variant(150)
        .build()
        .unwrap();
    let records = SyntheticGenerator::new(seed).generate(config.samples_per_variant);
    let driver = TrainingDriver::new(config);
    let report = driver.train_records(records);
    assert!(report.is_complete());
    driver
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_food_type1_scenarios() {
    let driver = trained_driver(42);
    let registry = driver.registry();

    // 100 + 5 + 5 = 110 > 50
    let high = registry
        .predict(&FoodRecord::from(FoodType1::new(100.0, 5.0)))
        .unwrap();
    assert!(high.predicted_label);
    assert!(high.probability > 0.5);

    // 1 + 0 + 1 = 2 < 50
    let low = registry
        .predict(&FoodRecord::from(FoodType1::new(1.0, 0.0)))
        .unwrap();
    assert!(!low.predicted_label);
    assert!(low.probability < 0.5);
}

#[test]
fn test_food_type2_and_type3_scenarios() {
    let driver = trained_driver(7);
    let registry = driver.registry();

    assert!(
        registry
            .predict(&FoodRecord::from(FoodType2::new(120.0, 124.0, 8.0)))
            .unwrap()
            .predicted_label
    );
    assert!(
        !registry
            .predict(&FoodRecord::from(FoodType2::new(1.0, 1.0, 0.0)))
            .unwrap()
            .predicted_label
    );

    // 37 + 4.5 + 2.25 + 18.5 = 62.25 > 50
    assert!(
        registry
            .predict(&FoodRecord::from(FoodType3::new(37.0, vec![4.5, 2.25, 18.5], 3.0)))
            .unwrap()
            .predicted_label
    );
    assert!(
        !registry
            .predict(&FoodRecord::from(FoodType3::new(0.5, vec![0.0, 0.0, 0.25], 2.0)))
            .unwrap()
            .predicted_label
    );
}

#[test]
fn test_holdout_agreement_is_high() {
    let config = PipelineConfig::builder()
        .seed(11)
        .samples_per_variant(400)
        .holdout_fraction(0.1)
        .build()
        .unwrap();
    let records = SyntheticGenerator::new(config.seed).generate(config.samples_per_variant);
    let pools = LoadedRecords::split(records, config.holdout_fraction, config.seed).unwrap();
    let holdout = pools.holdout.clone();

    let driver = TrainingDriver::new(config);
    assert!(driver.train_records(pools.training).is_complete());

    let agreed = holdout
        .iter()
        .filter(|r| driver.registry().predict(r).unwrap().predicted_label == r.answer())
        .count();
    #[allow(clippy::cast_precision_loss)]
    let agreement = agreed as f64 / holdout.len() as f64;
    assert!(agreement > 0.85, "agreement {agreement}");
}

// ============================================================================
// Registry Behaviour
// ============================================================================

#[test]
fn test_untrained_variant_is_unknown() {
    let config = PipelineConfig::builder()
        .samples_per_variant(150)
        .build()
        .unwrap();
    let records = SyntheticGenerator::new(1).generate_variant(FoodVariant::FoodType1, 150);
    let driver = TrainingDriver::new(config);
    assert!(driver.train_records(records).is_complete());

    let err = driver
        .registry()
        .predict(&FoodRecord::from(FoodType2::new(1.0, 1.0, 1.0)))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownVariant(FoodVariant::FoodType2)));
    assert_eq!(driver.registry().variants(), vec![FoodVariant::FoodType1]);
}

#[test]
fn test_engines_created_once_per_variant() {
    let driver = trained_driver(3);
    let registry = driver.registry();
    assert_eq!(registry.engine_count(), 0);

    let records = SyntheticGenerator::new(99).generate(20);
    for record in &records {
        registry.predict(record).unwrap();
    }

    assert_eq!(registry.engine_count(), 3);
    for variant in FoodVariant::ALL {
        assert_eq!(registry.engine_predictions(variant), Some(20));
    }
}

#[test]
fn test_concurrent_predictions_share_engines() {
    let driver = trained_driver(5);
    let registry: Arc<ModelRegistry> = Arc::clone(driver.registry());

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let records = SyntheticGenerator::new(t).generate(25);
                records
                    .iter()
                    .map(|r| registry.predict(r).map(|p| p.predicted_label))
                    .collect::<Result<Vec<_>, _>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap().len(), 75);
    }
    assert_eq!(registry.engine_count(), 3);
    assert_eq!(registry.engine_predictions(FoodVariant::FoodType1), Some(100));
}
