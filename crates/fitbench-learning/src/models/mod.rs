//! Estimators and the registries of classifier and regressor codes.
//!
//! Every estimator implements [`Estimator`] with a fixed hyper-parameter set.
//! Models are addressed on the command line by the short codes of
//! [`Classifier`] and [`Regressor`].

mod forest;
mod knn;
mod linear;
mod naive_bayes;
mod svm;
mod tree;

pub use forest::{MaxFeatures, RandomForest};
pub use knn::KNeighborsClassifier;
pub use linear::{LinearRegression, LogisticRegression, PolynomialRegression};
pub use naive_bayes::GaussianNB;
pub use svm::{Kernel, SupportVectorClassifier, SupportVectorRegressor};
pub use tree::{Criterion, DecisionTree};

use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use std::fmt;

/// A model fitted on a feature matrix and a target vector.
///
/// Class labels are carried as `f64` codes; classifiers predict one of the
/// codes seen during `fit`.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Fit the model on `x` (one row per sample) and `y`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `y` disagree on the number of samples, if
    /// there are no samples, or if the optimisation cannot be carried out.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::NotFitted`] before `fit`, or an error if `x`
    /// has a different number of features than the training data.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// What the models of a registry predict, and how they are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Class codes, scored by accuracy.
    Classification,
    /// Continuous values, scored by R².
    Regression,
}

/// A registry entry: a model addressed by a short code.
pub trait ModelCode: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// `classifier` or `regressor`, used in error messages.
    const KIND: &'static str;

    const TASK: Task;

    /// Every model of the registry, in evaluation order.
    fn all() -> &'static [Self];

    /// Upper-case code, e.g. `DTC`.
    fn code(&self) -> &'static str;

    /// Description listed in the `--help` codes list.
    fn description(&self) -> &'static str;

    /// Name used in the result and prediction tables.
    fn display_name(&self) -> &'static str;

    /// A fresh, unfitted estimator.
    fn build(&self, random_state: u64) -> Box<dyn Estimator>;

    /// Whether the features are standard-scaled before fitting.
    fn scales_features(&self) -> bool;

    /// Whether the target may be standard-scaled before fitting.
    fn scales_target(&self) -> bool {
        false
    }

    /// Find a model by code, case insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidModelCode`] for an unknown code.
    fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        Self::all()
            .iter()
            .copied()
            .find(|model| model.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LearningError::InvalidModelCode {
                kind: Self::KIND,
                code: trimmed.to_string(),
                expected: Self::codes_list(),
            })
    }

    /// `DTC, KNNC, ...`.
    fn codes_list() -> String {
        Self::all()
            .iter()
            .map(|model| model.code())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// One `CODE : description` line per model, for help texts.
    fn codes_with_descriptions() -> String {
        Self::all()
            .iter()
            .map(|model| format!("{} : {}", model.code(), model.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Classification models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    Dtc,
    Knnc,
    Ksvmc,
    Lrc,
    Nbc,
    Rfc,
    Svmc,
}

impl ModelCode for Classifier {
    const KIND: &'static str = "classifier";
    const TASK: Task = Task::Classification;

    fn all() -> &'static [Self] {
        &[
            Self::Dtc,
            Self::Knnc,
            Self::Ksvmc,
            Self::Lrc,
            Self::Nbc,
            Self::Rfc,
            Self::Svmc,
        ]
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Dtc => "DTC",
            Self::Knnc => "KNNC",
            Self::Ksvmc => "KSVMC",
            Self::Lrc => "LRC",
            Self::Nbc => "NBC",
            Self::Rfc => "RFC",
            Self::Svmc => "SVMC",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Dtc => "Decision Tree Classifier",
            Self::Knnc => "K Nearest Neighbors Classifier",
            Self::Ksvmc => "Kernel Support Vector Machine Classifier",
            Self::Lrc => "Logistic Regression Classifier",
            Self::Nbc => "Naive Bayes Classifier",
            Self::Rfc => "Random Forest Classifier",
            Self::Svmc => "Support Vector Machine Classifier",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Dtc => "Decision Tree Classification",
            Self::Knnc => "K Nearest Neighbors Classification",
            Self::Ksvmc => "Kernel Support Vector Machine Classification",
            Self::Lrc => "Logistic Regression Classification",
            Self::Nbc => "Naive Bayes Classification",
            Self::Rfc => "Random Forest Classification",
            Self::Svmc => "Support Vector Machine Classification",
        }
    }

    fn build(&self, random_state: u64) -> Box<dyn Estimator> {
        match self {
            Self::Dtc => Box::new(DecisionTree::new_classifier()),
            Self::Knnc => Box::new(KNeighborsClassifier::new(5)),
            Self::Ksvmc => Box::new(SupportVectorClassifier::new(Kernel::rbf_scale())),
            Self::Lrc => Box::new(LogisticRegression::new()),
            Self::Nbc => Box::new(GaussianNB::new()),
            Self::Rfc => Box::new(RandomForest::new_classifier(10).with_random_state(random_state)),
            Self::Svmc => Box::new(SupportVectorClassifier::new(Kernel::Linear)),
        }
    }

    fn scales_features(&self) -> bool {
        true
    }
}

/// Regression models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regressor {
    Mlr,
    Poly,
    Svr,
    Dtr,
    Rfr,
}

impl ModelCode for Regressor {
    const KIND: &'static str = "regressor";
    const TASK: Task = Task::Regression;

    fn all() -> &'static [Self] {
        &[Self::Mlr, Self::Poly, Self::Svr, Self::Dtr, Self::Rfr]
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Mlr => "MLR",
            Self::Poly => "POLY",
            Self::Svr => "SVR",
            Self::Dtr => "DTR",
            Self::Rfr => "RFR",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Mlr => "Multiple Linear Regressor",
            Self::Poly => "Polynomial Regressor",
            Self::Svr => "Support Vector Regressor",
            Self::Dtr => "Decision Tree Regressor",
            Self::Rfr => "Random Forest Regressor",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Mlr => "Multiple Linear Regression",
            Self::Poly => "Polynomial Regression",
            Self::Svr => "Support Vector Regression",
            Self::Dtr => "Decision Tree Regression",
            Self::Rfr => "Random Forest Regression",
        }
    }

    fn build(&self, random_state: u64) -> Box<dyn Estimator> {
        match self {
            Self::Mlr => Box::new(LinearRegression::new()),
            Self::Poly => Box::new(PolynomialRegression::new(4)),
            Self::Svr => Box::new(SupportVectorRegressor::new(Kernel::rbf_scale())),
            Self::Dtr => Box::new(DecisionTree::new_regressor()),
            Self::Rfr => Box::new(RandomForest::new_regressor(10).with_random_state(random_state)),
        }
    }

    fn scales_features(&self) -> bool {
        matches!(self, Self::Svr)
    }

    fn scales_target(&self) -> bool {
        matches!(self, Self::Svr)
    }
}

/// Check the shapes handed to [`Estimator::fit`].
pub(crate) fn check_fit_input(model: &str, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(LearningError::InvalidData(format!(
            "{} got {} feature rows for {} target values",
            model,
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(LearningError::InvalidData(format!(
            "{} cannot be fitted on an empty training set",
            model
        )));
    }
    Ok(())
}

/// Check the width of a matrix handed to [`Estimator::predict`].
pub(crate) fn check_n_features(model: &str, expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(LearningError::InvalidData(format!(
            "{} was fitted on {} features, got {}",
            model,
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

/// Sorted distinct class codes.
pub(crate) fn unique_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    classes
}

/// Most voted class, ties going to the smallest class.
pub(crate) fn majority_vote(votes: impl IntoIterator<Item = f64>) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(class, _)| *class == vote) {
            Some((_, count)) => *count += 1,
            None => counts.push((vote, 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|(a_class, a_count), (b_class, b_count)| {
            a_count.cmp(b_count).then_with(|| b_class.total_cmp(a_class))
        })
        .map(|(class, _)| class)
        .unwrap_or(0.0)
}
