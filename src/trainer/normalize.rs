//! Min-max normalization of the concatenated feature vector

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use trueno::Vector;

/// Per-slot affine rescaling to `[0, 1]` over the fitting data.
///
/// Bounds come only from the rows passed to [`MinMaxNormalizer::fit`]; rows
/// transformed later may land outside `[0, 1]`. Constant slots map to `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl MinMaxNormalizer {
    /// Fit bounds on `rows`, each of length `width`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataIntegrity`] if `rows` is empty, a row has the
    /// wrong width, or a bound cannot be computed.
    pub fn fit(rows: &[Vec<f32>], width: usize) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::DataIntegrity(
                "cannot fit normalizer on zero rows".to_string(),
            ));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(Error::DataIntegrity(format!(
                "row {bad} has {} features, expected {width}",
                rows[bad].len()
            )));
        }

        let mut mins = Vec::with_capacity(width);
        let mut maxs = Vec::with_capacity(width);
        let mut column = Vec::with_capacity(rows.len());
        for slot in 0..width {
            column.clear();
            column.extend(rows.iter().map(|r| r[slot]));
            let values = Vector::from_slice(&column);
            let min = values
                .min()
                .map_err(|e| Error::DataIntegrity(format!("feature slot {slot}: {e}")))?;
            let max = values
                .max()
                .map_err(|e| Error::DataIntegrity(format!("feature slot {slot}: {e}")))?;
            mins.push(min);
            maxs.push(max);
        }

        Ok(Self { mins, maxs })
    }

    /// Number of slots.
    #[must_use]
    pub fn width(&self) -> usize {
        self.mins.len()
    }

    /// Lower bounds.
    #[must_use]
    pub fn mins(&self) -> &[f32] {
        &self.mins
    }

    /// Upper bounds.
    #[must_use]
    pub fn maxs(&self) -> &[f32] {
        &self.maxs
    }

    /// Rescale `row` in place.
    pub fn transform(&self, row: &mut [f32]) {
        for ((value, &min), &max) in row.iter_mut().zip(&self.mins).zip(&self.maxs) {
            let range = max - min;
            *value = if range > 0.0 { (*value - min) / range } else { 0.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        let rows = vec![vec![0.0, 10.0], vec![5.0, 20.0], vec![10.0, 30.0]];
        let normalizer = MinMaxNormalizer::fit(&rows, 2).unwrap();

        let mut row = vec![5.0, 30.0];
        normalizer.transform(&mut row);
        assert!((row[0] - 0.5).abs() < 1e-6);
        assert!((row[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_rows_are_not_clamped() {
        let rows = vec![vec![0.0], vec![10.0]];
        let normalizer = MinMaxNormalizer::fit(&rows, 1).unwrap();

        let mut row = vec![20.0];
        normalizer.transform(&mut row);
        assert!((row[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_slot_maps_to_zero() {
        let rows = vec![vec![3.0], vec![3.0]];
        let normalizer = MinMaxNormalizer::fit(&rows, 1).unwrap();
        let mut row = vec![3.0];
        normalizer.transform(&mut row);
        assert!(row[0].abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_rejects_empty_and_ragged() {
        assert!(MinMaxNormalizer::fit(&[], 1).is_err());
        assert!(MinMaxNormalizer::fit(&[vec![1.0, 2.0], vec![1.0]], 2).is_err());
    }
}
