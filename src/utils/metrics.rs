//! Metrics Module for Binary Classification
//!
//! Accuracy, precision, recall and F1 for the positive class (label 1),
//! built from a 2x2 confusion matrix.

use serde::{Deserialize, Serialize};

/// Confusion counts for a binary classifier (positive = class 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryConfusion {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl BinaryConfusion {
    /// Build from predicted and ground-truth labels (0 or 1)
    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize]) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Predictions and ground truth must have same length"
        );

        let mut cm = Self::default();
        for (&p, &g) in predictions.iter().zip(ground_truth) {
            cm.record(p, g);
        }
        cm
    }

    /// Add one prediction
    pub fn record(&mut self, predicted: usize, actual: usize) {
        match (predicted == 1, actual == 1) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn correct(&self) -> usize {
        self.true_positives + self.true_negatives
    }
}

/// Summary metrics for a binary evaluation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_samples: usize,
    pub accuracy: f64,
    /// TP / (TP + FP)
    pub precision: f64,
    /// TP / (TP + FN)
    pub recall: f64,
    pub f1: f64,
    /// Mean binary cross-entropy, when the caller measured it
    pub loss: Option<f64>,
    pub confusion: BinaryConfusion,
}

impl Metrics {
    pub fn from_confusion(confusion: BinaryConfusion) -> Self {
        let total_samples = confusion.total();
        if total_samples == 0 {
            return Self::default();
        }

        let accuracy = confusion.correct() as f64 / total_samples as f64;
        let precision = ratio(
            confusion.true_positives,
            confusion.true_positives + confusion.false_positives,
        );
        let recall = ratio(
            confusion.true_positives,
            confusion.true_positives + confusion.false_negatives,
        );
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            total_samples,
            accuracy,
            precision,
            recall,
            f1,
            loss: None,
            confusion,
        }
    }

    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize]) -> Self {
        Self::from_confusion(BinaryConfusion::from_predictions(predictions, ground_truth))
    }

    pub fn with_loss(mut self, loss: f64) -> Self {
        self.loss = Some(loss);
        self
    }

    /// Render a small report naming both classes
    pub fn display(&self, class_names: &[String]) -> String {
        let negative = class_names.first().map(String::as_str).unwrap_or("class 0");
        let positive = class_names.get(1).map(String::as_str).unwrap_or("class 1");
        let cm = &self.confusion;

        let mut output = String::new();
        output.push_str(&format!("Samples:   {}\n", self.total_samples));
        if let Some(loss) = self.loss {
            output.push_str(&format!("Loss:      {:.4}\n", loss));
        }
        output.push_str(&format!("Accuracy:  {:.2}%\n", self.accuracy * 100.0));
        output.push_str(&format!("Precision: {:.2}% ({})\n", self.precision * 100.0, positive));
        output.push_str(&format!("Recall:    {:.2}% ({})\n", self.recall * 100.0, positive));
        output.push_str(&format!("F1:        {:.2}%\n", self.f1 * 100.0));
        output.push_str("\nConfusion (rows = actual, cols = predicted):\n");
        output.push_str(&format!("  {:>20} {:>12} {:>12}\n", "", negative, positive));
        output.push_str(&format!(
            "  {:>20} {:>12} {:>12}\n",
            negative, cm.true_negatives, cm.false_positives
        ));
        output.push_str(&format!(
            "  {:>20} {:>12} {:>12}\n",
            positive, cm.false_negatives, cm.true_positives
        ));
        output
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_counts() {
        let predictions = vec![1, 1, 0, 0, 1];
        let ground_truth = vec![1, 0, 0, 1, 1];
        let cm = BinaryConfusion::from_predictions(&predictions, &ground_truth);

        assert_eq!(cm.true_positives, 2);
        assert_eq!(cm.false_positives, 1);
        assert_eq!(cm.true_negatives, 1);
        assert_eq!(cm.false_negatives, 1);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_metrics_values() {
        let metrics = Metrics::from_predictions(&[1, 1, 0, 0, 1], &[1, 0, 0, 1, 1]);

        assert!((metrics.accuracy - 0.6).abs() < 1e-9);
        assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.recall - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_positive_predictions() {
        let metrics = Metrics::from_predictions(&[0, 0], &[1, 0]);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.f1, 0.0);
        assert!((metrics.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = Metrics::from_predictions(&[], &[]);
        assert_eq!(metrics.total_samples, 0);
        assert_eq!(metrics.accuracy, 0.0);
    }

    #[test]
    fn test_display_names_classes() {
        let names = vec!["hombre".to_string(), "mujer".to_string()];
        let report = Metrics::from_predictions(&[1, 0], &[1, 0])
            .with_loss(0.25)
            .display(&names);

        assert!(report.contains("Accuracy:  100.00%"));
        assert!(report.contains("mujer"));
        assert!(report.contains("Loss:      0.2500"));
    }
}
