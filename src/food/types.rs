//! Concrete food shapes
//!
//! Serde names follow the exposed column names declared in each field table,
//! so record files and datasets agree on naming.

use super::{FieldValue, Food, FoodVariant, ANSWER_THRESHOLD};
use crate::schema::FieldSpec;
use serde::{Deserialize, Serialize};

/// Two scalar inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodType1 {
    /// Primary measurement
    #[serde(rename = "Value1")]
    pub value1: f32,
    /// Observed noise
    #[serde(rename = "Random")]
    pub random: f32,
    /// Label
    #[serde(rename = "Answer", default)]
    pub answer: bool,
}

impl FoodType1 {
    /// Create an unlabeled record.
    #[must_use]
    pub const fn new(value1: f32, random: f32) -> Self {
        Self {
            value1,
            random,
            answer: false,
        }
    }
}

impl Food for FoodType1 {
    const VARIANT: FoodVariant = FoodVariant::FoodType1;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::scalar("value1").exposed_as("Value1"),
        FieldSpec::scalar("random").exposed_as("Random"),
        FieldSpec::label("answer").exposed_as("Answer"),
    ];

    fn answer(&self) -> bool {
        self.answer
    }

    fn submit_answer(&mut self, perturbation: f32) {
        self.answer = self.value1 + self.random + perturbation > ANSWER_THRESHOLD;
    }

    fn field_values(&self) -> Vec<FieldValue<'_>> {
        vec![
            FieldValue::Scalar(self.value1),
            FieldValue::Scalar(self.random),
            FieldValue::Boolean(self.answer),
        ]
    }
}

/// Three scalar inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodType2 {
    /// Primary measurement
    #[serde(rename = "Value1")]
    pub value1: f32,
    /// Observed noise
    #[serde(rename = "Random")]
    pub random: f32,
    /// Secondary measurement
    #[serde(rename = "Value3")]
    pub value3: f32,
    /// Label
    #[serde(rename = "Answer", default)]
    pub answer: bool,
}

impl FoodType2 {
    /// Create an unlabeled record.
    #[must_use]
    pub const fn new(value1: f32, random: f32, value3: f32) -> Self {
        Self {
            value1,
            random,
            value3,
            answer: false,
        }
    }
}

impl Food for FoodType2 {
    const VARIANT: FoodVariant = FoodVariant::FoodType2;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::scalar("value1").exposed_as("Value1"),
        FieldSpec::scalar("random").exposed_as("Random"),
        FieldSpec::scalar("value3").exposed_as("Value3"),
        FieldSpec::label("answer").exposed_as("Answer"),
    ];

    fn answer(&self) -> bool {
        self.answer
    }

    fn submit_answer(&mut self, perturbation: f32) {
        self.answer = self.value1 + self.random + self.value3 + perturbation > ANSWER_THRESHOLD;
    }

    fn field_values(&self) -> Vec<FieldValue<'_>> {
        vec![
            FieldValue::Scalar(self.value1),
            FieldValue::Scalar(self.random),
            FieldValue::Scalar(self.value3),
            FieldValue::Boolean(self.answer),
        ]
    }
}

/// Scalar weight plus a vector of sensor readings.
///
/// `batch` is recorded after the fact and is not available when predicting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodType3 {
    /// Weight
    #[serde(rename = "Weight")]
    pub weight: f32,
    /// Sensor readings; every record of a dataset has the same length
    #[serde(rename = "Readings")]
    pub readings: Vec<f32>,
    /// Production batch number
    pub batch: f32,
    /// Label
    #[serde(rename = "Answer", default)]
    pub answer: bool,
}

impl FoodType3 {
    /// Create an unlabeled record.
    #[must_use]
    pub fn new(weight: f32, readings: Vec<f32>, batch: f32) -> Self {
        Self {
            weight,
            readings,
            batch,
            answer: false,
        }
    }
}

impl Food for FoodType3 {
    const VARIANT: FoodVariant = FoodVariant::FoodType3;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::scalar("weight").exposed_as("Weight"),
        FieldSpec::vector("readings").exposed_as("Readings"),
        FieldSpec::scalar("batch").ignored(),
        FieldSpec::label("answer").exposed_as("Answer"),
    ];

    fn answer(&self) -> bool {
        self.answer
    }

    fn submit_answer(&mut self, perturbation: f32) {
        let readings: f32 = self.readings.iter().sum();
        self.answer = self.weight + readings + perturbation > ANSWER_THRESHOLD;
    }

    fn field_values(&self) -> Vec<FieldValue<'_>> {
        vec![
            FieldValue::Scalar(self.weight),
            FieldValue::Vector(&self.readings),
            FieldValue::Scalar(self.batch),
            FieldValue::Boolean(self.answer),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_type1_label_rule() {
        let mut high = FoodType1::new(100.0, 5.0);
        high.submit_answer(5.0);
        assert!(high.answer());

        let mut low = FoodType1::new(1.0, 0.0);
        low.submit_answer(1.0);
        assert!(!low.answer());
    }

    #[test]
    fn test_food_type2_includes_value3() {
        let mut food = FoodType2::new(20.0, 10.0, 15.0);
        food.submit_answer(4.0);
        assert!(!food.answer());
        food.value3 = 25.0;
        food.submit_answer(4.0);
        assert!(food.answer());
    }

    #[test]
    fn test_food_type3_sums_readings() {
        let mut food = FoodType3::new(10.0, vec![20.0, 15.0], 1.0);
        food.submit_answer(6.0);
        assert!(food.answer());
        food.submit_answer(0.0);
        assert!(!food.answer());
    }

    #[test]
    fn test_field_values_align_with_table() {
        let food = FoodType3::new(1.0, vec![2.0, 3.0], 4.0);
        let values = food.field_values();
        assert_eq!(values.len(), FoodType3::FIELDS.len());
        assert_eq!(values[1], FieldValue::Vector(&[2.0, 3.0]));
    }
}
