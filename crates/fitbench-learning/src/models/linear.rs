//! Linear models: least squares, polynomial least squares and logistic
//! regression.

use super::{Estimator, check_fit_input, check_n_features, unique_classes};
use crate::error::{LearningError, Result};
use fitbench_processing::StandardScaler;
use fitbench_processing::linalg::{cholesky_solve, solve_least_squares, with_intercept_column};
use ndarray::{Array1, Array2, Axis};

/// Ridge added to the normal equations when they are singular, relative to
/// their largest diagonal entry.
const SINGULAR_RIDGE: f64 = 1e-10;

/// Least squares weights of `x w = y`, with a tiny ridge when `x` is rank deficient.
fn least_squares(model: &str, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    let exact = solve_least_squares(x, y).filter(|w| w.iter().all(|v| v.is_finite()));
    if let Some(weights) = exact {
        return Ok(weights);
    }

    let mut xtx = x.t().dot(x);
    let scale = xtx.diag().iter().copied().fold(0.0_f64, f64::max).max(1.0);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += SINGULAR_RIDGE * scale;
    }
    cholesky_solve(&xtx, &x.t().dot(y))
        .filter(|w| w.iter().all(|v| v.is_finite()))
        .ok_or_else(|| LearningError::TrainingFailed {
            model: model.to_string(),
            reason: "the normal equations could not be solved".to_string(),
        })
}

/// Ordinary least squares with an intercept.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    /// Intercept first, then one weight per feature.
    weights: Option<Array1<f64>>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intercept(&self) -> Option<f64> {
        self.weights.as_ref().map(|w| w[0])
    }

    pub fn coefficients(&self) -> Option<Array1<f64>> {
        self.weights
            .as_ref()
            .map(|w| w.slice(ndarray::s![1..]).to_owned())
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input("LinearRegression", x, y)?;
        self.weights = Some(least_squares("LinearRegression", &with_intercept_column(x), y)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or(LearningError::NotFitted("LinearRegression"))?;
        check_n_features("LinearRegression", weights.len() - 1, x)?;
        Ok(with_intercept_column(x).dot(weights))
    }
}

/// Least squares over every monomial of the features up to `degree`.
///
/// Features are standardized before the expansion. The monomials of affine
/// transformed features span the same polynomials, and the normal equations
/// stay far better conditioned on large raw values.
#[derive(Debug, Clone)]
pub struct PolynomialRegression {
    degree: usize,
    scaler: Option<StandardScaler>,
    linear: LinearRegression,
}

impl PolynomialRegression {
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(1),
            scaler: None,
            linear: LinearRegression::new(),
        }
    }

    /// Every monomial of degree 1 to `degree`, graded lexicographic order.
    fn expand(&self, x: &Array2<f64>) -> Array2<f64> {
        let terms = monomials(x.ncols(), self.degree);
        let mut expanded = Array2::ones((x.nrows(), terms.len()));
        for (column, term) in terms.iter().enumerate() {
            for &feature in term {
                let mut target = expanded.column_mut(column);
                target *= &x.column(feature);
            }
        }
        expanded
    }
}

/// Feature index combinations with replacement, by increasing degree.
fn monomials(n_features: usize, degree: usize) -> Vec<Vec<usize>> {
    let mut all = Vec::new();
    let mut current: Vec<Vec<usize>> = vec![Vec::new()];
    for _ in 0..degree {
        let mut next = Vec::new();
        for term in &current {
            let start = term.last().copied().unwrap_or(0);
            for feature in start..n_features {
                let mut extended = term.clone();
                extended.push(feature);
                next.push(extended);
            }
        }
        all.extend(next.iter().cloned());
        current = next;
    }
    all
}

impl Estimator for PolynomialRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input("PolynomialRegression", x, y)?;
        let (scaler, scaled) = StandardScaler::fit_transform(x);
        self.linear.fit(&self.expand(&scaled), y)?;
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaler = self
            .scaler
            .as_ref()
            .ok_or(LearningError::NotFitted("PolynomialRegression"))?;
        check_n_features("PolynomialRegression", scaler.mean().len(), x)?;
        let scaled = scaler.transform(x)?;
        self.linear.predict(&self.expand(&scaled))
    }
}

/// One-vs-rest logistic regression fitted by batch gradient descent.
///
/// L2 penalty with inverse strength `C = 1`, the intercept is not penalized.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    n_iterations: usize,
    c: f64,
    classes: Vec<f64>,
    /// One `(weights, intercept)` per class, a single one for two classes.
    machines: Vec<(Array1<f64>, f64)>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            n_iterations: 1000,
            c: 1.0,
            classes: Vec::new(),
            machines: Vec::new(),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit `P(y = 1 | x)` for a 0/1 target.
    fn fit_binary(&self, x: &Array2<f64>, target: &Array1<f64>) -> (Array1<f64>, f64) {
        let n = x.nrows() as f64;
        let mut weights = Array1::zeros(x.ncols());
        let mut intercept = 0.0;

        for _ in 0..self.n_iterations {
            let residuals = (x.dot(&weights) + intercept).mapv(sigmoid) - target;
            let gradient = x.t().dot(&residuals) / n + &weights / (self.c * n);
            let intercept_gradient = residuals.sum() / n;

            weights.scaled_add(-self.learning_rate, &gradient);
            intercept -= self.learning_rate * intercept_gradient;
        }
        (weights, intercept)
    }

    fn decision(machine: &(Array1<f64>, f64), x: &Array2<f64>) -> Array1<f64> {
        (x.dot(&machine.0) + machine.1).mapv(sigmoid)
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input("LogisticRegression", x, y)?;
        self.classes = unique_classes(y);

        let positives: &[f64] = match self.classes.len() {
            1 => &[],
            2 => &self.classes[1..],
            _ => &self.classes,
        };
        self.machines = positives
            .iter()
            .map(|&class| {
                let target = y.mapv(|v| if v == class { 1.0 } else { 0.0 });
                self.fit_binary(x, &target)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let Some(&first_class) = self.classes.first() else {
            return Err(LearningError::NotFitted("LogisticRegression"));
        };
        if let Some((weights, _)) = self.machines.first() {
            check_n_features("LogisticRegression", weights.len(), x)?;
        }

        match self.machines.len() {
            0 => Ok(Array1::from_elem(x.nrows(), first_class)),
            1 => {
                let positive = self.classes[1];
                Ok(Self::decision(&self.machines[0], x)
                    .mapv(|p| if p > 0.5 { positive } else { first_class }))
            }
            _ => {
                let scores: Vec<Array1<f64>> = self
                    .machines
                    .iter()
                    .map(|machine| Self::decision(machine, x))
                    .collect();
                let stacked = ndarray::stack(
                    Axis(1),
                    &scores.iter().map(Array1::view).collect::<Vec<_>>(),
                )
                .map_err(|e| LearningError::InvalidData(e.to_string()))?;
                Ok(stacked
                    .rows()
                    .into_iter()
                    .map(|row| self.classes[argmax(row.iter().copied())])
                    .collect())
            }
        }
    }
}

/// Index of the largest value, the first one on ties.
pub(crate) fn argmax(values: impl IntoIterator<Item = f64>) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, value) in values.into_iter().enumerate() {
        if value > best.1 {
            best = (i, value);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_recovers_plane() {
        // y = 3 + 2 x0 - x1
        let x = array![[1.0, 1.0], [2.0, 0.0], [3.0, 5.0], [4.0, 2.0], [0.0, 3.0]];
        let y = x.map_axis(Axis(1), |row| 3.0 + 2.0 * row[0] - row[1]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert!((model.intercept().unwrap() - 3.0).abs() < 1e-8);
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 2.0).abs() < 1e-8);
        assert!((coefficients[1] + 1.0).abs() < 1e-8);

        let prediction = model.predict(&array![[10.0, 10.0]]).unwrap();
        assert!((prediction[0] - 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_regression_collinear_features() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_monomials() {
        assert_eq!(monomials(2, 2), vec![vec![0], vec![1], vec![0, 0], vec![0, 1], vec![1, 1]]);
        // C(3 + 4, 4) - 1
        assert_eq!(monomials(3, 4).len(), 34);
    }

    #[test]
    fn test_polynomial_regression_fits_cubic() {
        let x = array![[-2.0], [-1.0], [0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = x.column(0).mapv(|v| v * v * v - 2.0 * v + 1.0);

        let mut model = PolynomialRegression::new(4);
        model.fit(&x, &y).unwrap();

        let prediction = model.predict(&array![[2.5]]).unwrap()[0];
        assert!((prediction - (15.625 - 5.0 + 1.0)).abs() < 1e-4);
    }

    #[test]
    fn test_logistic_regression_binary() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_logistic_regression_multiclass() {
        let x = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [3.0, 0.0],
            [3.1, 0.2],
            [0.0, 3.0],
            [0.1, 3.2],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax([0.1, 0.7, 0.7]), 1);
        assert_eq!(argmax([]), 0);
    }
}
