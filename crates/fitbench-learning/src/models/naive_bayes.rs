//! Gaussian naive Bayes.

use super::{Estimator, check_fit_input, check_n_features, unique_classes};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::f64::consts::PI;

/// Portion of the largest feature variance added to every variance.
const VAR_SMOOTHING: f64 = 1e-9;

#[derive(Debug, Clone)]
struct ClassStats {
    class: f64,
    log_prior: f64,
    mean: Array1<f64>,
    var: Array1<f64>,
}

impl ClassStats {
    fn joint_log_likelihood(&self, row: ArrayView1<'_, f64>) -> f64 {
        let log_density: f64 = row
            .iter()
            .zip(self.mean.iter().zip(self.var.iter()))
            .map(|(x, (mean, var))| -0.5 * (2.0 * PI * var).ln() - (x - mean).powi(2) / (2.0 * var))
            .sum();
        self.log_prior + log_density
    }
}

/// Normal per-class feature likelihoods with class priors from the frequencies.
#[derive(Debug, Clone, Default)]
pub struct GaussianNB {
    classes: Vec<ClassStats>,
    n_features: usize,
}

impl GaussianNB {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Estimator for GaussianNB {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input("GaussianNB", x, y)?;
        let n_samples = x.nrows() as f64;

        let max_variance = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let epsilon = VAR_SMOOTHING * max_variance;

        self.classes = unique_classes(y)
            .into_iter()
            .map(|class| {
                let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
                let x_class = x.select(Axis(0), &rows);
                let mean = x_class
                    .mean_axis(Axis(0))
                    .unwrap_or_else(|| Array1::zeros(x.ncols()));
                // a zero variance everywhere would divide by zero
                let var = x_class
                    .var_axis(Axis(0), 0.0)
                    .mapv(|v| if v + epsilon > 0.0 { v + epsilon } else { f64::MIN_POSITIVE });
                ClassStats {
                    class,
                    log_prior: (rows.len() as f64 / n_samples).ln(),
                    mean,
                    var,
                }
            })
            .collect();
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.classes.is_empty() {
            return Err(LearningError::NotFitted("GaussianNB"));
        }
        check_n_features("GaussianNB", self.n_features, x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut best = &self.classes[0];
                let mut best_score = best.joint_log_likelihood(row);
                for stats in &self.classes[1..] {
                    let score = stats.joint_log_likelihood(row);
                    if score > best_score {
                        best = stats;
                        best_score = score;
                    }
                }
                best.class
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gaussian_naive_bayes() {
        let x = array![
            [1.0, 2.0],
            [1.5, 1.8],
            [1.2, 2.2],
            [5.0, 8.0],
            [5.5, 7.5],
            [5.2, 8.3],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut nb = GaussianNB::new();
        nb.fit(&x, &y).unwrap();

        assert_eq!(nb.predict(&x).unwrap(), y);
        assert_eq!(nb.predict(&array![[1.1, 2.1], [5.1, 8.1]]).unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn test_priors_break_equal_likelihoods() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = array![3.0, 3.0, 3.0, 4.0];

        let mut nb = GaussianNB::new();
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.predict(&array![[1.0]]).unwrap()[0], 3.0);
    }
}
