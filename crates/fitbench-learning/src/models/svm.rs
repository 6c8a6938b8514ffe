//! Support vector machines.
//!
//! The classifier solves the soft margin dual with a simplified SMO: the
//! second multiplier is the one with the largest error gap, so training is
//! deterministic. Several classes are handled one-vs-rest.
//!
//! The regressor solves the epsilon-insensitive dual by coordinate descent
//! with the bias absorbed in the kernel (`K + 1`).

use super::linear::argmax;
use super::{Estimator, check_fit_input, check_n_features, unique_classes};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::debug;

/// Beyond this many training samples the kernel matrix is not materialized.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// `K(a, b) = a . b`
    Linear,
    /// `K(a, b) = exp(-gamma ||a - b||^2)`. `None` resolves to
    /// `1 / (n_features * Var(X))` at fit time.
    Rbf { gamma: Option<f64> },
}

impl Kernel {
    /// RBF kernel with the `scale` gamma heuristic.
    pub fn rbf_scale() -> Self {
        Kernel::Rbf { gamma: None }
    }

    /// Fix the gamma of an RBF kernel from the training matrix.
    fn resolved(self, x: &Array2<f64>) -> Self {
        match self {
            Kernel::Rbf { gamma: None } => {
                let variance = x.var(0.0);
                let denominator = x.ncols() as f64 * variance;
                let gamma = if denominator > 0.0 && denominator.is_finite() {
                    1.0 / denominator
                } else {
                    1.0
                };
                Kernel::Rbf { gamma: Some(gamma) }
            }
            other => other,
        }
    }

    fn compute(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { gamma } => {
                let squared: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma.unwrap_or(1.0) * squared).exp()
            }
        }
    }

    fn matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let value = self.compute(x.row(i), x.row(j));
                k[[i, j]] = value;
                k[[j, i]] = value;
            }
        }
        k
    }
}

fn check_kernel_size(model: &str, n_samples: usize) -> Result<()> {
    if n_samples > MAX_KERNEL_MATRIX_SAMPLES {
        return Err(LearningError::TrainingFailed {
            model: model.to_string(),
            reason: format!(
                "{} training samples exceed the {} samples kernel matrix limit",
                n_samples, MAX_KERNEL_MATRIX_SAMPLES
            ),
        });
    }
    Ok(())
}

/// Support vectors and `alpha_i * y_i` coefficients of one decision function.
#[derive(Debug, Clone)]
struct DecisionFunction {
    support_vectors: Array2<f64>,
    coefficients: Vec<f64>,
    bias: f64,
}

impl DecisionFunction {
    fn from_dual(x: &Array2<f64>, coefficients: &[f64], bias: f64) -> Self {
        let support: Vec<usize> = (0..coefficients.len())
            .filter(|&i| coefficients[i] != 0.0)
            .collect();
        Self {
            support_vectors: x.select(Axis(0), &support),
            coefficients: support.iter().map(|&i| coefficients[i]).collect(),
            bias,
        }
    }

    fn evaluate(&self, kernel: &Kernel, row: ArrayView1<'_, f64>) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.coefficients.iter())
            .map(|(sv, coefficient)| coefficient * kernel.compute(sv, row))
            .sum::<f64>()
            + self.bias
    }
}

/// Optimisation settings of the SMO solver.
#[derive(Debug, Clone, Copy)]
struct SmoSettings {
    c: f64,
    tol: f64,
    max_passes: usize,
    max_sweeps: usize,
}

/// Solve the binary soft margin dual for `y` in `{-1, +1}`.
///
/// Returns the multipliers and the bias.
fn smo(k: &Array2<f64>, y: &[f64], settings: SmoSettings) -> (Vec<f64>, f64) {
    let n = y.len();
    let c = settings.c;
    let mut alphas = vec![0.0; n];
    let mut bias = 0.0;
    // f[i] = sum_j alpha_j y_j K(j, i), without the bias
    let mut f = vec![0.0; n];

    let mut passes = 0;
    let mut sweeps = 0;
    while passes < settings.max_passes && sweeps < settings.max_sweeps {
        let mut changed = 0;

        for i in 0..n {
            let error_i = f[i] + bias - y[i];
            let violates = (y[i] * error_i < -settings.tol && alphas[i] < c)
                || (y[i] * error_i > settings.tol && alphas[i] > 0.0);
            if !violates {
                continue;
            }

            let Some(j) = (0..n).filter(|&j| j != i).max_by(|&a, &b| {
                let gap_a = (error_i - (f[a] + bias - y[a])).abs();
                let gap_b = (error_i - (f[b] + bias - y[b])).abs();
                gap_a.total_cmp(&gap_b).then(b.cmp(&a))
            }) else {
                continue;
            };
            let error_j = f[j] + bias - y[j];

            let (alpha_i_old, alpha_j_old) = (alphas[i], alphas[j]);
            let (low, high) = if y[i] != y[j] {
                ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
            } else {
                ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
            };
            if high - low < 1e-12 {
                continue;
            }

            let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
            if eta >= 0.0 {
                continue;
            }

            let alpha_j = (alpha_j_old - y[j] * (error_i - error_j) / eta).clamp(low, high);
            if (alpha_j - alpha_j_old).abs() < 1e-5 {
                continue;
            }
            let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);

            let delta_i = y[i] * (alpha_i - alpha_i_old);
            let delta_j = y[j] * (alpha_j - alpha_j_old);
            let b1 = bias - error_i - delta_i * k[[i, i]] - delta_j * k[[i, j]];
            let b2 = bias - error_j - delta_i * k[[i, j]] - delta_j * k[[j, j]];
            bias = if alpha_i > 0.0 && alpha_i < c {
                b1
            } else if alpha_j > 0.0 && alpha_j < c {
                b2
            } else {
                (b1 + b2) / 2.0
            };

            alphas[i] = alpha_i;
            alphas[j] = alpha_j;
            for (m, value) in f.iter_mut().enumerate() {
                *value += delta_i * k[[i, m]] + delta_j * k[[j, m]];
            }
            changed += 1;
        }

        sweeps += 1;
        passes = if changed == 0 { passes + 1 } else { 0 };
    }

    debug!(sweeps, "SMO finished");
    (alphas, bias)
}

/// Soft margin support vector classifier, one-vs-rest over several classes.
#[derive(Debug, Clone)]
pub struct SupportVectorClassifier {
    kernel: Kernel,
    fitted_kernel: Kernel,
    settings: SmoSettings,
    classes: Vec<f64>,
    n_features: usize,
    /// One per class, a single one for two classes, none for one class.
    machines: Vec<DecisionFunction>,
}

impl SupportVectorClassifier {
    /// `C = 1` soft margin classifier.
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            fitted_kernel: kernel,
            settings: SmoSettings {
                c: 1.0,
                tol: 1e-3,
                max_passes: 5,
                max_sweeps: 1000,
            },
            classes: Vec::new(),
            n_features: 0,
            machines: Vec::new(),
        }
    }

    fn model_name(&self) -> &'static str {
        match self.kernel {
            Kernel::Linear => "LinearSVC",
            Kernel::Rbf { .. } => "KernelSVC",
        }
    }

    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.coefficients.len()).sum()
    }
}

impl Estimator for SupportVectorClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(self.model_name(), x, y)?;
        check_kernel_size(self.model_name(), x.nrows())?;

        self.fitted_kernel = self.kernel.resolved(x);
        self.classes = unique_classes(y);
        self.n_features = x.ncols();

        let positives: &[f64] = match self.classes.len() {
            1 => &[],
            2 => &self.classes[1..],
            _ => &self.classes,
        };
        let k = self.fitted_kernel.matrix(x);
        self.machines = positives
            .iter()
            .map(|&class| {
                let signs: Vec<f64> = y.iter().map(|&v| if v == class { 1.0 } else { -1.0 }).collect();
                let (alphas, bias) = smo(&k, &signs, self.settings);
                let coefficients: Vec<f64> =
                    alphas.iter().zip(signs.iter()).map(|(a, s)| a * s).collect();
                DecisionFunction::from_dual(x, &coefficients, bias)
            })
            .collect();

        debug!(
            support_vectors = self.n_support_vectors(),
            "{} fitted",
            self.model_name()
        );
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let Some(&first_class) = self.classes.first() else {
            return Err(LearningError::NotFitted(self.model_name()));
        };
        check_n_features(self.model_name(), self.n_features, x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| match self.machines.as_slice() {
                [] => first_class,
                [machine] => {
                    if machine.evaluate(&self.fitted_kernel, row) > 0.0 {
                        self.classes[1]
                    } else {
                        first_class
                    }
                }
                machines => {
                    let scores = machines.iter().map(|m| m.evaluate(&self.fitted_kernel, row));
                    self.classes[argmax(scores)]
                }
            })
            .collect())
    }
}

/// Epsilon-insensitive support vector regressor.
#[derive(Debug, Clone)]
pub struct SupportVectorRegressor {
    kernel: Kernel,
    fitted_kernel: Kernel,
    c: f64,
    epsilon: f64,
    tol: f64,
    max_sweeps: usize,
    n_features: usize,
    function: Option<DecisionFunction>,
}

impl SupportVectorRegressor {
    /// `C = 1`, `epsilon = 0.1` regressor.
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            fitted_kernel: kernel,
            c: 1.0,
            epsilon: 0.1,
            tol: 1e-6,
            max_sweeps: 1000,
            n_features: 0,
            function: None,
        }
    }

    /// Coordinate descent on `1/2 b' K' b - y' b + epsilon |b|_1` over `b` in `[-C, C]`.
    fn solve(&self, k: &Array2<f64>, y: &Array1<f64>) -> Vec<f64> {
        let n = y.len();
        let mut beta = vec![0.0; n];
        // q = K' beta
        let mut q = vec![0.0; n];

        for sweep in 0..self.max_sweeps {
            let mut max_change: f64 = 0.0;
            for i in 0..n {
                let k_ii = k[[i, i]] + 1.0;
                let s = q[i] - k_ii * beta[i] - y[i];
                let shrunk = s.signum() * (s.abs() - self.epsilon).max(0.0);
                let updated = (-shrunk / k_ii).clamp(-self.c, self.c);

                let delta = updated - beta[i];
                if delta != 0.0 {
                    for (m, value) in q.iter_mut().enumerate() {
                        *value += delta * (k[[i, m]] + 1.0);
                    }
                    beta[i] = updated;
                    max_change = max_change.max(delta.abs());
                }
            }
            if max_change < self.tol {
                debug!(sweeps = sweep + 1, "SVR coordinate descent converged");
                break;
            }
        }
        beta
    }
}

impl Estimator for SupportVectorRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input("SVR", x, y)?;
        check_kernel_size("SVR", x.nrows())?;

        self.fitted_kernel = self.kernel.resolved(x);
        self.n_features = x.ncols();

        let beta = self.solve(&self.fitted_kernel.matrix(x), y);
        // K' = K + 1 puts the bias in the coefficients
        let bias = beta.iter().sum();
        self.function = Some(DecisionFunction::from_dual(x, &beta, bias));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let function = self
            .function
            .as_ref()
            .ok_or(LearningError::NotFitted("SVR"))?;
        check_n_features("SVR", self.n_features, x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| function.evaluate(&self.fitted_kernel, row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.5],
            [6.0, 7.0],
            [7.0, 6.0],
            [6.5, 6.5],
            [7.0, 7.5],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_rbf_gamma_scale() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        // Var over every element is 1
        assert_eq!(Kernel::rbf_scale().resolved(&x), Kernel::Rbf { gamma: Some(0.5) });
        let constant = array![[1.0], [1.0]];
        assert_eq!(Kernel::rbf_scale().resolved(&constant), Kernel::Rbf { gamma: Some(1.0) });
    }

    #[test]
    fn test_linear_classifier() {
        let (x, y) = separable();
        let mut svc = SupportVectorClassifier::new(Kernel::Linear);
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), y);
        assert!(svc.n_support_vectors() > 0);
    }

    #[test]
    fn test_rbf_classifier() {
        let (x, y) = separable();
        let mut svc = SupportVectorClassifier::new(Kernel::rbf_scale());
        svc.fit(&x, &y).unwrap();

        let predictions = svc.predict(&array![[1.2, 1.8], [6.8, 6.9]]).unwrap();
        assert_eq!(predictions, array![0.0, 1.0]);
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let x = array![
            [0.0, 0.0],
            [0.5, 0.0],
            [0.0, 0.5],
            [5.0, 0.0],
            [5.5, 0.0],
            [5.0, 0.5],
            [0.0, 5.0],
            [0.5, 5.0],
            [0.0, 5.5],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];

        let mut svc = SupportVectorClassifier::new(Kernel::rbf_scale());
        svc.fit(&x, &y).unwrap();
        assert_eq!(svc.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_class() {
        let x = array![[1.0], [2.0]];
        let mut svc = SupportVectorClassifier::new(Kernel::Linear);
        svc.fit(&x, &array![3.0, 3.0]).unwrap();
        assert_eq!(svc.predict(&array![[10.0]]).unwrap()[0], 3.0);
    }

    #[test]
    fn test_regressor_follows_smooth_target() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64 / 19.0 * 2.0 - 1.0);
        let y = x.column(0).mapv(|v| v * 0.5);

        let mut svr = SupportVectorRegressor::new(Kernel::rbf_scale());
        svr.fit(&x, &y).unwrap();

        let predictions = svr.predict(&x).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            // inside the epsilon tube, with some slack for the solver
            assert!((p - t).abs() < 0.2, "{} vs {}", p, t);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let svr = SupportVectorRegressor::new(Kernel::Linear);
        assert_eq!(
            svr.predict(&array![[1.0]]).unwrap_err().error_code(),
            "MODEL_NOT_FITTED"
        );
    }
}
