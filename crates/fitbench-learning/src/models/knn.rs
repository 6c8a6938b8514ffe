//! K nearest neighbours classification.

use super::{Estimator, check_fit_input, check_n_features, majority_vote};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2, ArrayView1};

/// Majority vote among the `k` closest training samples (Euclidean distance).
///
/// Equidistant neighbours keep their training order, and a tied vote goes to
/// the smallest class.
#[derive(Debug, Clone)]
pub struct KNeighborsClassifier {
    k: usize,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNeighborsClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            x_train: None,
            y_train: None,
        }
    }

    fn vote(&self, x_train: &Array2<f64>, y_train: &Array1<f64>, row: ArrayView1<'_, f64>) -> f64 {
        let mut distances: Vec<(f64, usize)> = x_train
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, train_row)| (squared_distance(train_row, row), i))
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        majority_vote(distances.iter().take(self.k).map(|&(_, i)| y_train[i]))
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

impl Estimator for KNeighborsClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input("KNeighborsClassifier", x, y)?;
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (Some(x_train), Some(y_train)) = (&self.x_train, &self.y_train) else {
            return Err(LearningError::NotFitted("KNeighborsClassifier"));
        };
        check_n_features("KNeighborsClassifier", x_train.ncols(), x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| self.vote(x_train, y_train, row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_classifier() {
        let x = array![
            [1.0, 1.0],
            [1.0, 2.0],
            [2.0, 1.0],
            [6.0, 6.0],
            [6.0, 7.0],
            [7.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut knn = KNeighborsClassifier::new(3);
        knn.fit(&x, &y).unwrap();

        let predictions = knn.predict(&array![[1.5, 1.5], [6.5, 6.5]]).unwrap();
        assert_eq!(predictions, array![0.0, 1.0]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0], [10.0]];
        let y = array![2.0, 2.0, 1.0];

        let mut knn = KNeighborsClassifier::new(5);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[10.0]]).unwrap()[0], 2.0);
    }

    #[test]
    fn test_tied_vote_goes_to_smallest_class() {
        let x = array![[0.0], [2.0]];
        let y = array![1.0, 0.0];

        let mut knn = KNeighborsClassifier::new(2);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[0.1]]).unwrap()[0], 0.0);
    }
}
