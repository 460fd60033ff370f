//! JSON record files and the prediction pool

use crate::food::FoodRecord;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Records split into a training set and a prediction pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRecords {
    /// Records used for training and evaluation
    pub training: Vec<FoodRecord>,
    /// Records reserved for prediction, never trained on
    pub holdout: Vec<FoodRecord>,
}

impl LoadedRecords {
    /// Shuffle `records` with `seed` and reserve `round(n * fraction)` of
    /// them as the prediction pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `fraction` is outside `[0, 1)`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn split(mut records: Vec<FoodRecord>, fraction: f64, seed: u64) -> Result<Self> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(Error::Config(format!(
                "holdout fraction must be in [0, 1), got {fraction}"
            )));
        }

        records.shuffle(&mut StdRng::seed_from_u64(seed));
        let count = ((records.len() as f64 * fraction).round() as usize).min(records.len());
        let holdout = records.split_off(records.len() - count);

        Ok(Self {
            training: records,
            holdout,
        })
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.training.len() + self.holdout.len()
    }

    /// Whether both pools are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.training.is_empty() && self.holdout.is_empty()
    }
}

/// Write records as a JSON array of tagged records.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_records(path: impl AsRef<Path>, records: &[FoodRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::StorageError(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Read a JSON array of tagged records.
///
/// # Errors
///
/// Returns [`Error::StorageError`] if the file cannot be opened, or
/// [`Error::Json`] if a record is malformed or has an unknown variant tag.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<FoodRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::StorageError(format!("Failed to open {}: {e}", path.display())))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read every `*.json` file in `dir` (by file name order) and split the
/// union with [`LoadedRecords::split`].
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be read, or if
/// `holdout_fraction` is out of range.
pub fn load_record_dir(
    dir: impl AsRef<Path>,
    holdout_fraction: f64,
    seed: u64,
) -> Result<LoadedRecords> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| Error::StorageError(format!("Failed to read {}: {e}", dir.display())))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();

    let mut records = Vec::new();
    for path in &paths {
        let file_records = read_records(path)?;
        tracing::debug!(path = %path.display(), records = file_records.len(), "read record file");
        records.extend(file_records);
    }
    tracing::info!(
        dir = %dir.display(),
        files = paths.len(),
        records = records.len(),
        "loaded record directory"
    );

    LoadedRecords::split(records, holdout_fraction, seed)
}
