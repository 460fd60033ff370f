//! Schema introspection over variant descriptor tables
//!
//! Each variant declares an ordered, compile-time table of [`FieldSpec`]s.
//! [`Schema::introspect`] resolves that table against a sample instance into
//! immutable [`FieldDescriptor`]s: vector lengths become concrete, exposed
//! names are settled, and the feature-eligible subset is computed once.
//!
//! ```rust
//! use food_pipeline::food::{FoodRecord, FoodType1, FoodVariant};
//! use food_pipeline::schema::Schema;
//!
//! let sample = FoodRecord::from(FoodType1::new(10.0, 2.0));
//! let schema = Schema::introspect(FoodVariant::FoodType1, Some(&sample))?;
//! assert_eq!(schema.feature_names(), ["Value1", "Random"]);
//! assert_eq!(schema.label().exposed_name(), "Answer");
//! # Ok::<(), food_pipeline::Error>(())
//! ```

use crate::food::{FieldValue, FoodRecord, FoodVariant};
use crate::{Error, Result};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use std::collections::HashSet;
use std::sync::Arc;

/// Declared value kind of a field (vector length still unresolved)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Single `f32`
    Scalar,
    /// Fixed-length `f32` vector
    Vector,
    /// Boolean
    Boolean,
}

/// Role a field plays in the training pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Known before prediction, usable as model input
    Feature,
    /// Prediction target
    Label,
    /// Stored in the dataset but never fed to the model
    Ignored,
}

/// Static declaration of one field of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    name: &'static str,
    exposed_name: Option<&'static str>,
    kind: ValueKind,
    role: FieldRole,
}

impl FieldSpec {
    /// Scalar feature field.
    #[must_use]
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            exposed_name: None,
            kind: ValueKind::Scalar,
            role: FieldRole::Feature,
        }
    }

    /// Vector feature field.
    #[must_use]
    pub const fn vector(name: &'static str) -> Self {
        Self {
            name,
            exposed_name: None,
            kind: ValueKind::Vector,
            role: FieldRole::Feature,
        }
    }

    /// Boolean label field.
    #[must_use]
    pub const fn label(name: &'static str) -> Self {
        Self {
            name,
            exposed_name: None,
            kind: ValueKind::Boolean,
            role: FieldRole::Label,
        }
    }

    /// Override the column name used in datasets and record files.
    #[must_use]
    pub const fn exposed_as(mut self, exposed_name: &'static str) -> Self {
        self.exposed_name = Some(exposed_name);
        self
    }

    /// Keep the field in the dataset but never use it as input.
    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.role = FieldRole::Ignored;
        self
    }

    /// Internal identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Column name, falling back to the internal identifier.
    #[must_use]
    pub const fn exposed_name(&self) -> &'static str {
        match self.exposed_name {
            Some(name) => name,
            None => self.name,
        }
    }

    /// Declared kind.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Declared role.
    #[must_use]
    pub const fn role(&self) -> FieldRole {
        self.role
    }
}

/// Resolved value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single `f32`
    Scalar,
    /// `f32` vector of the given length
    Vector(usize),
    /// Boolean
    Boolean,
}

impl FieldKind {
    /// Number of feature slots this field occupies once concatenated.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Scalar | Self::Boolean => 1,
            Self::Vector(len) => len,
        }
    }

    /// Arrow column type for this kind.
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::Scalar => DataType::Float32,
            Self::Boolean => DataType::Boolean,
            Self::Vector(len) => DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                i32::try_from(len).unwrap_or(i32::MAX),
            ),
        }
    }
}

/// Immutable, resolved description of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    exposed_name: &'static str,
    kind: FieldKind,
    role: FieldRole,
    feature_eligible: bool,
}

impl FieldDescriptor {
    /// Internal identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Column name.
    #[must_use]
    pub const fn exposed_name(&self) -> &'static str {
        self.exposed_name
    }

    /// Resolved kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Declared role.
    #[must_use]
    pub const fn role(&self) -> FieldRole {
        self.role
    }

    /// Whether the field is fed to the model.
    #[must_use]
    pub const fn is_feature(&self) -> bool {
        self.feature_eligible
    }
}

/// Resolved schema of one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    variant: FoodVariant,
    fields: Vec<FieldDescriptor>,
    label_index: usize,
}

impl Schema {
    /// Resolve `variant`'s field table against an optional sample instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if:
    /// - the sample belongs to another variant
    /// - a vector field exists and no sample is available
    /// - the variant does not declare exactly one label field
    /// - two fields share an exposed name
    /// - no field is feature-eligible
    pub fn introspect(variant: FoodVariant, sample: Option<&FoodRecord>) -> Result<Self> {
        Self::from_specs(variant, variant.fields(), sample)
    }

    pub(crate) fn from_specs(
        variant: FoodVariant,
        specs: &[FieldSpec],
        sample: Option<&FoodRecord>,
    ) -> Result<Self> {
        if let Some(sample) = sample {
            if sample.variant() != variant {
                return Err(Error::Schema(format!(
                    "sample instance is {} but schema requested for {variant}",
                    sample.variant()
                )));
            }
        }
        let sample_values = sample.map(FoodRecord::field_values);

        let label_positions: Vec<usize> = specs
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.role() == FieldRole::Label)
            .map(|(i, _)| i)
            .collect();
        let label_index = match label_positions.as_slice() {
            [index] => *index,
            [] => {
                return Err(Error::Schema(format!("{variant} declares no label field")));
            }
            _ => {
                return Err(Error::Schema(format!(
                    "{variant} declares {} label fields",
                    label_positions.len()
                )));
            }
        };
        let label_spec = specs[label_index];
        if label_spec.kind() != ValueKind::Boolean {
            return Err(Error::Schema(format!(
                "label field '{}' of {variant} must be boolean",
                label_spec.name()
            )));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            if !seen.insert(spec.exposed_name()) {
                return Err(Error::Schema(format!(
                    "{variant} exposes column '{}' more than once",
                    spec.exposed_name()
                )));
            }

            let kind = match spec.kind() {
                ValueKind::Scalar => FieldKind::Scalar,
                ValueKind::Boolean => FieldKind::Boolean,
                ValueKind::Vector => {
                    let values = sample_values.as_ref().ok_or_else(|| {
                        Error::Schema(format!(
                            "cannot resolve length of vector field '{}' of {variant} without a sample instance",
                            spec.name()
                        ))
                    })?;
                    match values.get(position) {
                        Some(FieldValue::Vector(v)) if v.is_empty() => {
                            return Err(Error::Schema(format!(
                                "vector length cannot be determined for '{}' of {variant}: sample vector is empty",
                                spec.name()
                            )));
                        }
                        Some(FieldValue::Vector(v)) => FieldKind::Vector(v.len()),
                        _ => {
                            return Err(Error::Schema(format!(
                                "sample value for '{}' of {variant} is not a vector",
                                spec.name()
                            )));
                        }
                    }
                }
            };

            let feature_eligible = spec.role() == FieldRole::Feature
                && matches!(kind, FieldKind::Scalar | FieldKind::Vector(_))
                && spec.name() != label_spec.name();

            fields.push(FieldDescriptor {
                name: spec.name(),
                exposed_name: spec.exposed_name(),
                kind,
                role: spec.role(),
                feature_eligible,
            });
        }

        if !fields.iter().any(FieldDescriptor::is_feature) {
            return Err(Error::Schema(format!(
                "{variant} has no feature-eligible fields"
            )));
        }

        tracing::debug!(
            variant = %variant,
            fields = fields.len(),
            "resolved schema"
        );

        Ok(Self {
            variant,
            fields,
            label_index,
        })
    }

    /// Variant this schema describes.
    #[must_use]
    pub const fn variant(&self) -> FoodVariant {
        self.variant
    }

    /// All fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by exposed name.
    #[must_use]
    pub fn field(&self, exposed_name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.exposed_name() == exposed_name)
    }

    /// The label field.
    #[must_use]
    pub fn label(&self) -> &FieldDescriptor {
        &self.fields[self.label_index]
    }

    /// Exposed names of every column, in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(FieldDescriptor::exposed_name).collect()
    }

    /// Exposed names of feature-eligible fields, in order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.is_feature())
            .map(FieldDescriptor::exposed_name)
            .collect()
    }

    /// Total width of the concatenated feature vector.
    #[must_use]
    pub fn feature_width(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.is_feature())
            .map(|f| f.kind().width())
            .sum()
    }

    /// Arrow schema with one non-nullable column per field.
    #[must_use]
    pub fn arrow_schema(&self) -> ArrowSchema {
        ArrowSchema::new(
            self.fields
                .iter()
                .map(|f| Field::new(f.exposed_name(), f.kind().data_type(), false))
                .collect::<Vec<_>>(),
        )
    }
}
