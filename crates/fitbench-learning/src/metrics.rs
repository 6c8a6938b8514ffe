//! Scores used to rank the fitted models.

use ndarray::Array1;

/// Fraction of predictions equal to the true labels.
///
/// Labels are compared after rounding, so `1.0` and `0.9999999` match.
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| label(**t) == label(**p))
        .count();
    correct as f64 / y_true.len() as f64
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn label(value: f64) -> i64 {
    value.round() as i64
}

/// Confusion matrix over the sorted union of true and predicted labels.
///
/// `matrix[i][j]` counts the samples of label `labels[i]` predicted as
/// `labels[j]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<i64>,
    matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut labels: Vec<i64> = y_true.iter().chain(y_pred.iter()).map(|v| label(*v)).collect();
        labels.sort_unstable();
        labels.dedup();

        let mut matrix = vec![vec![0; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            // both labels come from the union above
            if let (Ok(i), Ok(j)) = (
                labels.binary_search(&label(*t)),
                labels.binary_search(&label(*p)),
            ) {
                matrix[i][j] += 1;
            }
        }

        Self { labels, matrix }
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Cell `(i, j)`, 0 when outside the matrix.
    pub fn cell(&self, i: usize, j: usize) -> usize {
        self.matrix
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(0)
    }

    pub fn true_positives(&self) -> usize {
        self.cell(0, 0)
    }

    pub fn false_positives(&self) -> usize {
        self.cell(0, 1)
    }

    pub fn true_negatives(&self) -> usize {
        self.cell(1, 1)
    }

    pub fn false_negatives(&self) -> usize {
        self.cell(1, 0)
    }

    pub fn true_predictions(&self) -> usize {
        self.true_positives() + self.true_negatives()
    }

    pub fn false_predictions(&self) -> usize {
        self.false_positives() + self.false_negatives()
    }
}
