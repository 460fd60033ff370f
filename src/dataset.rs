//! Dataset builder (Arrow columnar)
//!
//! A [`Dataset`] is one Arrow `RecordBatch` holding records of a single
//! variant, paired with that variant's resolved [`Schema`]. Columns are the
//! exposed field names in declaration order; one row per record. The builder
//! never filters rows.

use crate::food::{FieldValue, FoodRecord, FoodVariant};
use crate::schema::{FieldKind, Schema};
use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, FixedSizeListArray, Float32Array, RecordBatch, UInt32Array,
};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Tabular dataset of one variant.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    batch: RecordBatch,
}

impl Dataset {
    /// Build a dataset from a homogeneous batch of records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataIntegrity`] if:
    /// - `records` is empty
    /// - a record's variant differs from the schema's variant
    /// - a vector field's length differs from the schema's resolved length
    pub fn build(schema: impl Into<Arc<Schema>>, records: &[FoodRecord]) -> Result<Self> {
        let schema = schema.into();
        let variant = schema.variant();

        if records.is_empty() {
            return Err(Error::DataIntegrity(format!(
                "cannot build a {variant} dataset from an empty collection"
            )));
        }
        if let Some(stray) = records.iter().find(|r| r.variant() != variant) {
            return Err(Error::DataIntegrity(format!(
                "{} record found in a {variant} batch",
                stray.variant()
            )));
        }

        let rows: Vec<Vec<FieldValue<'_>>> = records.iter().map(FoodRecord::field_values).collect();

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        for (position, field) in schema.fields().iter().enumerate() {
            let column: ArrayRef = match field.kind() {
                FieldKind::Scalar => {
                    let values = rows
                        .iter()
                        .map(|row| match row[position] {
                            FieldValue::Scalar(v) => Ok(v),
                            _ => Err(kind_mismatch(variant, field.name())),
                        })
                        .collect::<Result<Vec<f32>>>()?;
                    Arc::new(Float32Array::from(values))
                }
                FieldKind::Boolean => {
                    let values = rows
                        .iter()
                        .map(|row| match row[position] {
                            FieldValue::Boolean(v) => Ok(v),
                            _ => Err(kind_mismatch(variant, field.name())),
                        })
                        .collect::<Result<Vec<bool>>>()?;
                    Arc::new(BooleanArray::from(values))
                }
                FieldKind::Vector(len) => {
                    let mut flat = Vec::with_capacity(rows.len() * len);
                    for (row_index, row) in rows.iter().enumerate() {
                        match row[position] {
                            FieldValue::Vector(v) if v.len() == len => flat.extend_from_slice(v),
                            FieldValue::Vector(v) => {
                                return Err(Error::DataIntegrity(format!(
                                    "row {row_index} of {variant}: field '{}' has length {} but the schema expects {len}",
                                    field.name(),
                                    v.len()
                                )));
                            }
                            _ => return Err(kind_mismatch(variant, field.name())),
                        }
                    }
                    Arc::new(FixedSizeListArray::try_new(
                        Arc::new(Field::new("item", DataType::Float32, false)),
                        i32::try_from(len).map_err(|_| {
                            Error::DataIntegrity(format!("vector length {len} too large"))
                        })?,
                        Arc::new(Float32Array::from(flat)),
                        None,
                    )?)
                }
            };
            columns.push(column);
        }

        let batch = RecordBatch::try_new(Arc::new(schema.arrow_schema()), columns)?;
        tracing::debug!(variant = %variant, rows = batch.num_rows(), "built dataset");

        Ok(Self { schema, batch })
    }

    /// Wrap an existing batch after checking it against `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataIntegrity`] if the batch is empty or its columns
    /// do not match the schema's names and types.
    pub fn from_batch(schema: impl Into<Arc<Schema>>, batch: RecordBatch) -> Result<Self> {
        let schema = schema.into();
        let expected = schema.arrow_schema();
        let actual = batch.schema();

        if batch.num_rows() == 0 {
            return Err(Error::DataIntegrity(format!(
                "{} batch has no rows",
                schema.variant()
            )));
        }
        let matches = expected.fields().len() == actual.fields().len()
            && expected
                .fields()
                .iter()
                .zip(actual.fields().iter())
                .all(|(e, a)| e.name() == a.name() && e.data_type() == a.data_type());
        if !matches {
            return Err(Error::DataIntegrity(format!(
                "batch columns {:?} do not match {} schema {:?}",
                actual.fields().iter().map(|f| f.name()).collect::<Vec<_>>(),
                schema.variant(),
                schema.column_names()
            )));
        }

        // Normalize nullability and metadata to the canonical schema
        let batch = RecordBatch::try_new(Arc::new(expected), batch.columns().to_vec())?;
        Ok(Self { schema, batch })
    }

    /// Variant of every row.
    #[must_use]
    pub fn variant(&self) -> FoodVariant {
        self.schema.variant()
    }

    /// Resolved schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Underlying Arrow batch.
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Column names, in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Split into `(train, test)` partitions.
    ///
    /// Rows are shuffled with `seed`; `round(n * test_fraction)` rows are held
    /// out, capped so that at least one row stays in training. Each partition
    /// keeps the original row order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `test_fraction` is outside `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(Error::Config(format!(
                "test_fraction must be in [0, 1), got {test_fraction}"
            )));
        }

        let n = self.num_rows();
        let test_count = ((n as f64 * test_fraction).round() as usize).min(n.saturating_sub(1));

        let mut indices: Vec<u32> = (0..u32::try_from(n).unwrap_or(u32::MAX)).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        let (test, train) = indices.split_at_mut(test_count);
        train.sort_unstable();
        test.sort_unstable();

        let train = self.take(train)?;
        let test = self.take(test)?;
        Ok((train, test))
    }

    fn take(&self, indices: &[u32]) -> Result<Self> {
        let indices = UInt32Array::from(indices.to_vec());
        Ok(Self {
            schema: Arc::clone(&self.schema),
            batch: take_record_batch(&self.batch, &indices)?,
        })
    }

    /// Concatenate the named columns into one row-major feature vector per row.
    ///
    /// Vector columns are expanded in place, so row width is the sum of the
    /// column widths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if a column is missing or is not a float or
    /// float-vector column.
    pub fn feature_matrix(&self, columns: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut rows: Vec<Vec<f32>> = vec![Vec::new(); self.num_rows()];
        for name in columns {
            let column = self.batch.column_by_name(name).ok_or_else(|| {
                Error::Schema(format!(
                    "feature column '{name}' not found in {} dataset",
                    self.variant()
                ))
            })?;
            append_column(&mut rows, column, name)?;
        }
        Ok(rows)
    }

    /// Label column as booleans.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the label column is missing or not boolean.
    pub fn labels(&self) -> Result<Vec<bool>> {
        let name = self.schema.label().exposed_name();
        let labels = self
            .batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
            .ok_or_else(|| {
                Error::Schema(format!(
                    "label column '{name}' missing or not boolean in {} dataset",
                    self.variant()
                ))
            })?;
        Ok(labels.values().iter().collect())
    }
}

fn kind_mismatch(variant: FoodVariant, field: &str) -> Error {
    Error::DataIntegrity(format!(
        "value of '{field}' in a {variant} record does not match its declared kind"
    ))
}

fn append_column(rows: &mut [Vec<f32>], column: &ArrayRef, name: &str) -> Result<()> {
    if let Some(values) = column.as_any().downcast_ref::<Float32Array>() {
        for (row, value) in rows.iter_mut().zip(values.values().iter()) {
            row.push(*value);
        }
        return Ok(());
    }

    if let Some(list) = column.as_any().downcast_ref::<FixedSizeListArray>() {
        let width = usize::try_from(list.value_length()).unwrap_or(0);
        let values = list
            .values()
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| {
                Error::Schema(format!("vector column '{name}' does not hold f32 values"))
            })?;
        let values = values.values();
        for (i, row) in rows.iter_mut().enumerate() {
            let start = usize::try_from(list.value_offset(i)).unwrap_or(0);
            row.extend_from_slice(&values[start..start + width]);
        }
        return Ok(());
    }

    Err(Error::Schema(format!(
        "column '{name}' of type {} cannot be used as a feature",
        column.data_type()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::{FoodType1, FoodType3};
    use crate::generator::SyntheticGenerator;

    fn type1_dataset(count: usize) -> Dataset {
        let records = SyntheticGenerator::new(5).generate_variant(FoodVariant::FoodType1, count);
        let schema = Schema::introspect(FoodVariant::FoodType1, records.first()).unwrap();
        Dataset::build(schema, &records).unwrap()
    }

    #[test]
    fn test_build_rows_and_columns() {
        let dataset = type1_dataset(25);
        assert_eq!(dataset.num_rows(), 25);
        assert_eq!(dataset.column_names(), vec!["Value1", "Random", "Answer"]);
    }

    #[test]
    fn test_build_empty_fails() {
        let schema = Schema::introspect(FoodVariant::FoodType1, None).unwrap();
        let err = Dataset::build(schema, &[]).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[test]
    fn test_build_mixed_variants_fails() {
        let schema = Schema::introspect(FoodVariant::FoodType1, None).unwrap();
        let records = vec![
            FoodRecord::from(FoodType1::new(1.0, 1.0)),
            FoodRecord::from(FoodType3::new(1.0, vec![1.0], 1.0)),
        ];
        let err = Dataset::build(schema, &records).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[test]
    fn test_vector_length_mismatch_fails() {
        let records = vec![
            FoodRecord::from(FoodType3::new(1.0, vec![1.0, 2.0], 0.0)),
            FoodRecord::from(FoodType3::new(2.0, vec![1.0, 2.0, 3.0], 0.0)),
        ];
        let schema = Schema::introspect(FoodVariant::FoodType3, records.first()).unwrap();
        let err = Dataset::build(schema, &records).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_feature_matrix_expands_vectors() {
        let records = vec![
            FoodRecord::from(FoodType3::new(1.0, vec![2.0, 3.0], 9.0)),
            FoodRecord::from(FoodType3::new(4.0, vec![5.0, 6.0], 9.0)),
        ];
        let schema = Schema::introspect(FoodVariant::FoodType3, records.first()).unwrap();
        let dataset = Dataset::build(schema, &records).unwrap();

        let matrix = dataset.feature_matrix(&["Weight", "Readings"]).unwrap();
        assert_eq!(matrix, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_feature_matrix_rejects_label_column() {
        let dataset = type1_dataset(5);
        assert!(dataset.feature_matrix(&["Answer"]).is_err());
        assert!(dataset.feature_matrix(&["Missing"]).is_err());
    }

    #[test]
    fn test_split_sizes() {
        let dataset = type1_dataset(100);
        let (train, test) = dataset.split(0.2, 42).unwrap();
        assert_eq!(train.num_rows(), 80);
        assert_eq!(test.num_rows(), 20);
    }

    #[test]
    fn test_split_is_seeded() {
        let dataset = type1_dataset(100);
        let (_, a) = dataset.split(0.2, 42).unwrap();
        let (_, b) = dataset.split(0.2, 42).unwrap();
        let (_, c) = dataset.split(0.2, 43).unwrap();
        let a = a.feature_matrix(&["Value1"]).unwrap();
        assert_eq!(a, b.feature_matrix(&["Value1"]).unwrap());
        assert_ne!(a, c.feature_matrix(&["Value1"]).unwrap());
    }

    #[test]
    fn test_split_keeps_one_training_row() {
        let dataset = type1_dataset(1);
        let (train, test) = dataset.split(0.9, 1).unwrap();
        assert_eq!(train.num_rows(), 1);
        assert_eq!(test.num_rows(), 0);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let dataset = type1_dataset(10);
        assert!(matches!(dataset.split(1.0, 1), Err(Error::Config(_))));
        assert!(matches!(dataset.split(-0.1, 1), Err(Error::Config(_))));
    }

    #[test]
    fn test_labels_match_records() {
        let records = SyntheticGenerator::new(9).generate_variant(FoodVariant::FoodType1, 80);
        let schema = Schema::introspect(FoodVariant::FoodType1, None).unwrap();
        let dataset = Dataset::build(schema, &records).unwrap();
        let expected: Vec<bool> = records.iter().map(FoodRecord::answer).collect();
        assert_eq!(dataset.labels().unwrap(), expected);
    }

    #[test]
    fn test_from_batch_rejects_foreign_schema() {
        let dataset = type1_dataset(5);
        let other = Schema::introspect(FoodVariant::FoodType2, None).unwrap();
        let err = Dataset::from_batch(other, dataset.batch().clone()).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }
}
