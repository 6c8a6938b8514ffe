//! Standard (z-score) feature scaling.

use crate::error::{PreprocessingError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column `(x - mean) / std` scaling, with the population standard
/// deviation. Columns with zero variance keep a scale of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Learn column means and standard deviations.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_features = x.ncols();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let scale = if x.nrows() == 0 {
            Array1::ones(n_features)
        } else {
            x.std_axis(Axis(0), 0.0)
                .mapv(|std| if std == 0.0 || !std.is_finite() { 1.0 } else { std })
        };
        Self { mean, scale }
    }

    /// Fit on `x` and return the scaler with the scaled matrix.
    pub fn fit_transform(x: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(x);
        let scaled = (x - &scaler.mean) / &scaler.scale;
        (scaler, scaled)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;
        Ok((x - &self.mean) / &self.scale)
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;
        Ok(x * &self.scale + &self.mean)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    fn check_width(&self, actual: usize) -> Result<()> {
        if actual != self.mean.len() {
            return Err(PreprocessingError::ShapeMismatch {
                expected: self.mean.len(),
                actual,
            });
        }
        Ok(())
    }
}

/// [`StandardScaler`] for a single vector such as a regression target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorScaler {
    mean: f64,
    scale: f64,
}

impl VectorScaler {
    pub fn fit(y: &Array1<f64>) -> Self {
        let mean = y.mean().unwrap_or(0.0);
        let std = if y.is_empty() { 0.0 } else { y.std(0.0) };
        Self {
            mean,
            scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
        }
    }

    pub fn fit_transform(y: &Array1<f64>) -> (Self, Array1<f64>) {
        let scaler = Self::fit(y);
        let scaled = scaler.transform(y);
        (scaler, scaled)
    }

    pub fn transform(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|v| (v - self.mean) / self.scale)
    }

    pub fn inverse_transform(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|v| v * self.scale + self.mean)
    }
}
