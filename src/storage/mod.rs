//! Storage (Parquet dataset snapshots, JSON record files)
//!
//! - Datasets persist as Parquet with the Arrow schema embedded, one file
//!   per variant.
//! - Raw records persist as JSON arrays of tagged records (see
//!   [`crate::food`] for the wire format).

mod records;

pub use records::{load_record_dir, read_records, write_records, LoadedRecords};

use crate::dataset::Dataset;
use crate::schema::Schema;
use crate::{Error, Result};
use arrow::array::{ArrayRef, RecordBatch};
use arrow::compute::{can_cast_types, cast, concat_batches};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Write a dataset snapshot to a Parquet file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_parquet(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::StorageError(format!("Failed to create {}: {e}", path.display())))?;

    let mut writer = ArrowWriter::try_new(file, dataset.batch().schema(), None)?;
    writer.write(dataset.batch())?;
    writer.close()?;

    tracing::debug!(
        variant = %dataset.variant(),
        rows = dataset.num_rows(),
        path = %path.display(),
        "wrote parquet snapshot"
    );
    Ok(())
}

/// Load a dataset snapshot written by [`write_parquet`].
///
/// Columns are matched by name against `schema` and coerced to its types.
///
/// # Errors
///
/// Returns [`Error::StorageError`] if the file cannot be opened or parsed,
/// or [`Error::DataIntegrity`] if its columns do not match `schema`.
pub fn load_parquet(path: impl AsRef<Path>, schema: impl Into<Arc<Schema>>) -> Result<Dataset> {
    let path = path.as_ref();
    let schema = schema.into();

    let file = File::open(path).map_err(|e| {
        Error::StorageError(format!("Failed to open Parquet file {}: {e}", path.display()))
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;
    let stored_schema = Arc::clone(builder.schema());
    let reader = builder
        .build()
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
    let batch = concat_batches(&stored_schema, &batches)?;

    let expected = schema.arrow_schema();
    let columns = expected
        .fields()
        .iter()
        .map(|field| {
            let column = batch.column_by_name(field.name()).ok_or_else(|| {
                Error::DataIntegrity(format!(
                    "{} has no column '{}'",
                    path.display(),
                    field.name()
                ))
            })?;
            coerce(column, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;
    let batch = RecordBatch::try_new(Arc::new(expected), columns)?;

    tracing::debug!(
        variant = %schema.variant(),
        rows = batch.num_rows(),
        path = %path.display(),
        "loaded parquet snapshot"
    );
    Dataset::from_batch(schema, batch)
}

fn coerce(column: &ArrayRef, target: &arrow::datatypes::DataType) -> Result<ArrayRef> {
    if column.data_type() == target {
        return Ok(Arc::clone(column));
    }
    if !can_cast_types(column.data_type(), target) {
        return Err(Error::DataIntegrity(format!(
            "stored type {} cannot be read as {target}",
            column.data_type()
        )));
    }
    Ok(cast(column, target)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::FoodVariant;
    use crate::generator::SyntheticGenerator;

    fn dataset(variant: FoodVariant) -> Dataset {
        let records = SyntheticGenerator::new(5).generate_variant(variant, 30);
        let schema = Schema::introspect(variant, records.first()).unwrap();
        Dataset::build(schema, &records).unwrap()
    }

    #[test]
    fn test_parquet_round_trip_vector_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food3.parquet");
        let original = dataset(FoodVariant::FoodType3);

        write_parquet(&original, &path).unwrap();
        let loaded = load_parquet(&path, Arc::clone(original.schema())).unwrap();

        assert_eq!(loaded.num_rows(), 30);
        assert_eq!(loaded.batch(), original.batch());
    }

    #[test]
    fn test_load_parquet_rejects_other_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("food1.parquet");
        write_parquet(&dataset(FoodVariant::FoodType1), &path).unwrap();

        let other = Schema::introspect(FoodVariant::FoodType2, None).unwrap();
        assert!(matches!(
            load_parquet(&path, other),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_load_parquet_missing_file() {
        let schema = Schema::introspect(FoodVariant::FoodType1, None).unwrap();
        assert!(matches!(
            load_parquet("/nonexistent/food.parquet", schema),
            Err(Error::StorageError(_))
        ));
    }
}
