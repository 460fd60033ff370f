//! Food record variants
//!
//! The variant set is closed: every shape is a struct implementing [`Food`]
//! and a case of [`FoodRecord`]. Each variant's field table
//! ([`Food::FIELDS`]) replaces runtime property discovery.
//!
//! ## Wire format
//!
//! ```text
//! {"variant_tag": "FoodType1", "fields": {"Value1": 12.0, "Random": 2.5, "Answer": false}}
//! ```

mod types;

pub use types::{FoodType1, FoodType2, FoodType3};

use crate::schema::FieldSpec;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Label threshold shared by every variant's rule.
pub const ANSWER_THRESHOLD: f32 = 50.0;

/// Identifier of a record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FoodVariant {
    /// Two scalar features
    FoodType1,
    /// Three scalar features
    FoodType2,
    /// Scalar + vector features, one ignored column
    FoodType3,
}

impl FoodVariant {
    /// Every known variant.
    pub const ALL: [Self; 3] = [Self::FoodType1, Self::FoodType2, Self::FoodType3];

    /// Stable tag used in record files.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::FoodType1 => "FoodType1",
            Self::FoodType2 => "FoodType2",
            Self::FoodType3 => "FoodType3",
        }
    }

    /// Declared field table.
    #[must_use]
    pub const fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::FoodType1 => FoodType1::FIELDS,
            Self::FoodType2 => FoodType2::FIELDS,
            Self::FoodType3 => FoodType3::FIELDS,
        }
    }
}

impl fmt::Display for FoodVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FoodVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.tag() == s)
            .ok_or_else(|| Error::Schema(format!("unknown variant tag '{s}'")))
    }
}

/// Borrowed value of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Single `f32`
    Scalar(f32),
    /// `f32` vector
    Vector(&'a [f32]),
    /// Boolean
    Boolean(bool),
}

/// Common capability of every food variant.
pub trait Food {
    /// Variant identifier.
    const VARIANT: FoodVariant;

    /// Ordered field table; [`Food::field_values`] follows the same order.
    const FIELDS: &'static [FieldSpec];

    /// Current label.
    fn answer(&self) -> bool;

    /// Compute and store the label from the record's fields plus an external
    /// perturbation.
    fn submit_answer(&mut self, perturbation: f32);

    /// Field values, aligned with [`Food::FIELDS`].
    fn field_values(&self) -> Vec<FieldValue<'_>>;
}

/// A record of any variant, tagged for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant_tag", content = "fields")]
pub enum FoodRecord {
    /// [`FoodType1`] record
    FoodType1(FoodType1),
    /// [`FoodType2`] record
    FoodType2(FoodType2),
    /// [`FoodType3`] record
    FoodType3(FoodType3),
}

impl FoodRecord {
    /// Variant of this record.
    #[must_use]
    pub const fn variant(&self) -> FoodVariant {
        match self {
            Self::FoodType1(_) => FoodVariant::FoodType1,
            Self::FoodType2(_) => FoodVariant::FoodType2,
            Self::FoodType3(_) => FoodVariant::FoodType3,
        }
    }

    /// Current label.
    #[must_use]
    pub fn answer(&self) -> bool {
        match self {
            Self::FoodType1(food) => food.answer(),
            Self::FoodType2(food) => food.answer(),
            Self::FoodType3(food) => food.answer(),
        }
    }

    /// See [`Food::submit_answer`].
    pub fn submit_answer(&mut self, perturbation: f32) {
        match self {
            Self::FoodType1(food) => food.submit_answer(perturbation),
            Self::FoodType2(food) => food.submit_answer(perturbation),
            Self::FoodType3(food) => food.submit_answer(perturbation),
        }
    }

    /// See [`Food::field_values`].
    #[must_use]
    pub fn field_values(&self) -> Vec<FieldValue<'_>> {
        match self {
            Self::FoodType1(food) => food.field_values(),
            Self::FoodType2(food) => food.field_values(),
            Self::FoodType3(food) => food.field_values(),
        }
    }
}

impl From<FoodType1> for FoodRecord {
    fn from(food: FoodType1) -> Self {
        Self::FoodType1(food)
    }
}

impl From<FoodType2> for FoodRecord {
    fn from(food: FoodType2) -> Self {
        Self::FoodType2(food)
    }
}

impl From<FoodType3> for FoodRecord {
    fn from(food: FoodType3) -> Self {
        Self::FoodType3(food)
    }
}

/// Partition records by variant, keeping input order within each group.
#[must_use]
pub fn group_by_variant(records: Vec<FoodRecord>) -> BTreeMap<FoodVariant, Vec<FoodRecord>> {
    let mut groups: BTreeMap<FoodVariant, Vec<FoodRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.variant()).or_default().push(record);
    }
    groups
}
