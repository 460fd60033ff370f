//! Synthetic labeled data
//!
//! Stand-in for a real ingestion pipeline. Row `i` gets a perturbation `r`
//! drawn uniformly from the integers `0..10`; the perturbation feeds both the
//! noise fields and the label rule.

use crate::food::{FoodRecord, FoodType1, FoodType2, FoodType3, FoodVariant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator of labeled records.
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    /// Create a generator with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate `count` labeled records of every variant, interleaved.
    pub fn generate(&mut self, count: usize) -> Vec<FoodRecord> {
        let mut records = Vec::with_capacity(count * FoodVariant::ALL.len());
        for i in 0..count {
            let perturbation = self.perturbation();
            for variant in FoodVariant::ALL {
                records.push(Self::labeled(variant, i, perturbation));
            }
        }
        tracing::debug!(count, total = records.len(), "generated synthetic records");
        records
    }

    /// Generate `count` labeled records of one variant.
    pub fn generate_variant(&mut self, variant: FoodVariant, count: usize) -> Vec<FoodRecord> {
        (0..count)
            .map(|i| {
                let perturbation = self.perturbation();
                Self::labeled(variant, i, perturbation)
            })
            .collect()
    }

    fn perturbation(&mut self) -> f32 {
        f32::from(self.rng.gen_range(0u8..10))
    }

    #[allow(clippy::cast_precision_loss)]
    fn labeled(variant: FoodVariant, i: usize, r: f32) -> FoodRecord {
        let x = i as f32;
        let mut record = match variant {
            FoodVariant::FoodType1 => FoodRecord::from(FoodType1::new(x, r / 2.0)),
            FoodVariant::FoodType2 => FoodRecord::from(FoodType2::new(x, x + r / 2.0, r)),
            FoodVariant::FoodType3 => FoodRecord::from(FoodType3::new(
                x / 4.0,
                vec![r / 2.0, r / 4.0, x / 8.0],
                (i % 7) as f32,
            )),
        };
        record.submit_answer(r);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_all_variants() {
        let records = SyntheticGenerator::new(1).generate(10);
        assert_eq!(records.len(), 30);
        for variant in FoodVariant::ALL {
            assert_eq!(records.iter().filter(|r| r.variant() == variant).count(), 10);
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = SyntheticGenerator::new(7).generate(50);
        let b = SyntheticGenerator::new(7).generate(50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_labels_follow_rule() {
        let records = SyntheticGenerator::new(3).generate_variant(FoodVariant::FoodType1, 200);
        // value1 = i, so rows past 50 are always positive and rows below 36 never are
        for (i, record) in records.iter().enumerate() {
            if i > 50 {
                assert!(record.answer());
            }
            if i < 36 {
                assert!(!record.answer());
            }
        }
    }

    #[test]
    fn test_both_classes_present() {
        for variant in FoodVariant::ALL {
            let records = SyntheticGenerator::new(11).generate_variant(variant, 500);
            assert!(records.iter().any(FoodRecord::answer));
            assert!(records.iter().any(|r| !r.answer()));
        }
    }
}
