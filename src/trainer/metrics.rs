//! Binary classification metrics
//!
//! Accuracy, the confusion matrix and macro F1 come from
//! `aprender::metrics::classification`. The probability metrics aprender does
//! not provide (log-loss, entropy, log-loss reduction, AUC) are computed here.
//! Log-loss and entropy are measured in bits. Log-loss reduction compares the
//! model against a predictor that always outputs the evaluation set's
//! positive rate.

use super::Prediction;
use aprender::metrics::classification::{accuracy, confusion_matrix, f1_score, Average};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Probabilities are clamped to `[EPS, 1 - EPS]` before taking logarithms.
const PROBABILITY_EPSILON: f64 = 1e-15;

/// Evaluation metrics of a binary classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    /// Fraction of correct predictions
    pub accuracy: f64,
    /// Area under the ROC curve; NaN if only one class is present
    pub auc: f64,
    /// Mean log-loss in bits
    pub log_loss: f64,
    /// `(entropy - log_loss) / entropy`; 0 when entropy is 0
    pub log_loss_reduction: f64,
    /// Entropy of the label prior in bits
    pub entropy: f64,
    /// Precision of the positive class
    pub positive_precision: f64,
    /// Recall of the positive class
    pub positive_recall: f64,
    /// Harmonic mean of positive precision and recall
    pub f1_score: f64,
    /// F1 averaged over both classes
    pub macro_f1: f64,
}

impl BinaryMetrics {
    /// Compute metrics from predictions and ground truth.
    ///
    /// Returns `None` when there is nothing to evaluate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(predictions: &[Prediction], labels: &[bool]) -> Option<Self> {
        if predictions.is_empty() || predictions.len() != labels.len() {
            return None;
        }
        let n = predictions.len() as f64;

        let y_pred: Vec<usize> = predictions
            .iter()
            .map(|p| usize::from(p.predicted_label))
            .collect();
        let y_true: Vec<usize> = labels.iter().map(|&l| usize::from(l)).collect();

        // Rows are true classes, columns predicted. A batch with no positive
        // label or prediction yields a 1x1 matrix.
        let matrix = confusion_matrix(&y_pred, &y_true);
        let (tp, fp, fn_) = if matrix.n_rows() > 1 {
            (matrix.get(1, 1), matrix.get(0, 1), matrix.get(1, 0))
        } else {
            (0, 0, 0)
        };

        let log_loss = predictions
            .iter()
            .zip(labels)
            .map(|(prediction, &label)| {
                let p = f64::from(prediction.probability)
                    .clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
                -if label { p.log2() } else { (1.0 - p).log2() }
            })
            .sum::<f64>()
            / n;

        let positive_rate = (tp + fn_) as f64 / n;
        let entropy = binary_entropy(positive_rate);
        let log_loss_reduction = if entropy > 0.0 {
            (entropy - log_loss) / entropy
        } else {
            0.0
        };

        let positive_precision = ratio(tp, tp + fp);
        let positive_recall = ratio(tp, tp + fn_);
        let f1 = if positive_precision + positive_recall > 0.0 {
            2.0 * positive_precision * positive_recall / (positive_precision + positive_recall)
        } else {
            0.0
        };

        Some(Self {
            accuracy: f64::from(accuracy(&y_pred, &y_true)),
            auc: area_under_roc(predictions, labels),
            log_loss,
            log_loss_reduction,
            entropy,
            positive_precision,
            positive_recall,
            f1_score: f1,
            macro_f1: f64::from(f1_score(&y_pred, &y_true, Average::Macro)),
        })
    }

    /// `(name, value)` pairs for tracking.
    #[must_use]
    pub fn named(&self) -> [(&'static str, f64); 9] {
        [
            ("accuracy", self.accuracy),
            ("auc", self.auc),
            ("log_loss", self.log_loss),
            ("log_loss_reduction", self.log_loss_reduction),
            ("entropy", self.entropy),
            ("positive_precision", self.positive_precision),
            ("positive_recall", self.positive_recall),
            ("f1_score", self.f1_score),
            ("macro_f1", self.macro_f1),
        ]
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}

/// Mann-Whitney AUC with average ranks for tied scores.
#[allow(clippy::cast_precision_loss)]
fn area_under_roc(predictions: &[Prediction], labels: &[bool]) -> f64 {
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..predictions.len()).collect();
    order.sort_by(|&a, &b| {
        predictions[a]
            .score
            .partial_cmp(&predictions[b].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && predictions[order[j + 1]].score == predictions[order[i]].score {
            j += 1;
        }
        // ranks are 1-based; tied block [i, j] shares the average rank
        let average_rank = (i + j) as f64 / 2.0 + 1.0;
        for &index in &order[i..=j] {
            if labels[index] {
                positive_rank_sum += average_rank;
            }
        }
        i = j + 1;
    }

    let positives = positives as f64;
    let negatives = negatives as f64;
    (positive_rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(score: f32) -> Prediction {
        Prediction::from_score(score)
    }

    #[test]
    fn test_perfect_classifier() {
        let predictions = vec![prediction(-5.0), prediction(-3.0), prediction(4.0), prediction(6.0)];
        let labels = [false, false, true, true];
        let metrics = BinaryMetrics::evaluate(&predictions, &labels).unwrap();

        assert!((metrics.accuracy - 1.0).abs() < 1e-12);
        assert!((metrics.auc - 1.0).abs() < 1e-12);
        assert!((metrics.entropy - 1.0).abs() < 1e-12);
        assert!(metrics.log_loss < 0.1);
        assert!(metrics.log_loss_reduction > 0.9);
        assert!((metrics.f1_score - 1.0).abs() < 1e-12);
        assert!((metrics.macro_f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_counts_match_library_metrics() {
        // 3 TP, 1 FP, 2 FN, 2 TN
        let predictions = vec![
            prediction(2.0),
            prediction(1.5),
            prediction(0.5),
            prediction(0.2),
            prediction(-0.3),
            prediction(-1.0),
            prediction(-2.0),
            prediction(-3.0),
        ];
        let labels = [true, true, true, false, true, false, true, false];
        let metrics = BinaryMetrics::evaluate(&predictions, &labels).unwrap();

        let y_pred: Vec<usize> = predictions
            .iter()
            .map(|p| usize::from(p.predicted_label))
            .collect();
        let y_true: Vec<usize> = labels.iter().map(|&l| usize::from(l)).collect();
        let expected = accuracy(&y_pred, &y_true);

        assert!((metrics.accuracy - f64::from(expected)).abs() < 1e-6);
        assert!((metrics.accuracy - 5.0 / 8.0).abs() < 1e-6);
        assert!((metrics.positive_precision - 0.75).abs() < 1e-12);
        assert!((metrics.positive_recall - 0.6).abs() < 1e-12);
        assert!((metrics.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert!(
            (metrics.macro_f1 - f64::from(f1_score(&y_pred, &y_true, Average::Macro))).abs()
                < 1e-6
        );
    }

    #[test]
    fn test_all_negative_batch_has_zero_positive_rates() {
        let predictions = vec![prediction(-1.0), prediction(-2.0)];
        let metrics = BinaryMetrics::evaluate(&predictions, &[false, false]).unwrap();

        assert!((metrics.accuracy - 1.0).abs() < 1e-6);
        assert!(metrics.positive_precision.abs() < 1e-12);
        assert!(metrics.positive_recall.abs() < 1e-12);
        assert!(metrics.f1_score.abs() < 1e-12);
    }

    #[test]
    fn test_inverted_classifier() {
        let predictions = vec![prediction(5.0), prediction(-5.0)];
        let labels = [false, true];
        let metrics = BinaryMetrics::evaluate(&predictions, &labels).unwrap();

        assert!(metrics.accuracy.abs() < 1e-12);
        assert!(metrics.auc.abs() < 1e-12);
        assert!(metrics.log_loss_reduction < 0.0);
    }

    #[test]
    fn test_ties_give_half_auc() {
        let predictions = vec![prediction(1.0), prediction(1.0)];
        let metrics = BinaryMetrics::evaluate(&predictions, &[true, false]).unwrap();
        assert!((metrics.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_has_undefined_auc() {
        let predictions = vec![prediction(1.0), prediction(2.0)];
        let metrics = BinaryMetrics::evaluate(&predictions, &[true, true]).unwrap();
        assert!(metrics.auc.is_nan());
        assert!(metrics.entropy.abs() < 1e-12);
        assert!(metrics.log_loss_reduction.abs() < 1e-12);
    }

    #[test]
    fn test_empty_or_mismatched_is_none() {
        assert!(BinaryMetrics::evaluate(&[], &[]).is_none());
        assert!(BinaryMetrics::evaluate(&[prediction(1.0)], &[true, false]).is_none());
    }
}
