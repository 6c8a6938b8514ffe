//! Fitting every model of a registry on the same split and ranking them.
//!
//! Each model is fitted on the training set of a [`ModelSelectionDataset`]
//! and scored on its test set: accuracy plus a confusion matrix for the
//! classifiers, R² for the regressors. Evaluations are sorted from the best
//! score to the worst; models with equal scores keep the registry order.

use crate::config::ModelSelectionConfig;
use crate::dataset_manager::ModelSelectionDataset;
use crate::error::{Result, ResultExt};
use crate::metrics::{ConfusionMatrix, accuracy_score, r2_score};
use crate::models::{Estimator, ModelCode, Task};
use fitbench_processing::{StandardScaler, VectorScaler};
use ndarray::{Array1, Array2};
use std::time::Instant;
use tracing::{debug, info};

/// Score of one model on the test set.
#[derive(Debug, Clone)]
pub struct Evaluation<M> {
    pub model: M,
    /// Accuracy for a classifier, R² for a regressor.
    pub score: f64,
    /// Only set for classifiers.
    pub confusion_matrix: Option<ConfusionMatrix>,
}

impl<M: ModelCode> Evaluation<M> {
    fn new(model: M, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        match M::TASK {
            Task::Classification => Self {
                model,
                score: accuracy_score(y_true, y_pred),
                confusion_matrix: Some(ConfusionMatrix::new(y_true, y_pred)),
            },
            Task::Regression => Self {
                model,
                score: r2_score(y_true, y_pred),
                confusion_matrix: None,
            },
        }
    }

    fn sort_key(&self) -> f64 {
        if self.score.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.score
        }
    }
}

/// An estimator fitted on the training set, with the scalers its inputs and
/// outputs go through.
#[derive(Debug)]
pub struct FittedModel<M> {
    model: M,
    estimator: Box<dyn Estimator>,
    x_scaler: Option<StandardScaler>,
    y_scaler: Option<VectorScaler>,
    test_predictions: Array1<f64>,
}

impl<M: ModelCode> FittedModel<M> {
    fn fit(model: M, dataset: &ModelSelectionDataset, config: &ModelSelectionConfig) -> Result<Self> {
        let (x_scaler, x_train) = if model.scales_features() {
            let (scaler, scaled) = StandardScaler::fit_transform(dataset.x_train());
            (Some(scaler), scaled)
        } else {
            (None, dataset.x_train().clone())
        };
        let (y_scaler, y_train) = if model.scales_target() && config.feature_scale_dependent_variables {
            let (scaler, scaled) = VectorScaler::fit_transform(dataset.y_train());
            (Some(scaler), scaled)
        } else {
            (None, dataset.y_train().clone())
        };

        let mut estimator = model.build(config.split_random_state);
        estimator
            .fit(&x_train, &y_train)
            .context(format!("Failed to fit {}", model.display_name()))?;

        let mut fitted = Self {
            model,
            estimator,
            x_scaler,
            y_scaler,
            test_predictions: Array1::zeros(0),
        };
        fitted.test_predictions = fitted.predict(dataset.x_test())?;
        Ok(fitted)
    }

    pub fn model(&self) -> M {
        self.model
    }

    /// Predictions of the test set, in the unit of the target.
    pub fn test_predictions(&self) -> &Array1<f64> {
        &self.test_predictions
    }

    /// Predict encoded rows, scaling them like the training set.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let predictions = match &self.x_scaler {
            Some(scaler) => self.estimator.predict(&scaler.transform(x)?)?,
            None => self.estimator.predict(x)?,
        };
        Ok(match &self.y_scaler {
            Some(scaler) => scaler.inverse_transform(&predictions),
            None => predictions,
        })
    }
}

/// Every model of a registry fitted and scored on one dataset.
#[derive(Debug)]
pub struct ModelSelection<M> {
    fitted: Vec<FittedModel<M>>,
    evaluations: Vec<Evaluation<M>>,
}

impl<M: ModelCode> ModelSelection<M> {
    /// Fit and score every model of the registry.
    ///
    /// # Errors
    ///
    /// Returns the first fitting error met, wrapped with the model name.
    pub fn evaluate(dataset: &ModelSelectionDataset, config: &ModelSelectionConfig) -> Result<Self> {
        let mut fitted = Vec::with_capacity(M::all().len());
        let mut evaluations = Vec::with_capacity(M::all().len());

        for &model in M::all() {
            let start = Instant::now();
            let fitted_model = FittedModel::fit(model, dataset, config)?;
            let evaluation = Evaluation::new(model, dataset.y_test(), fitted_model.test_predictions());
            debug!(
                model = model.code(),
                score = evaluation.score,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Model evaluated"
            );
            evaluations.push(evaluation);
            fitted.push(fitted_model);
        }

        // sort_by is stable: equal scores keep the registry order
        evaluations.sort_by(|a, b| b.sort_key().total_cmp(&a.sort_key()));
        if let Some(best) = evaluations.first() {
            info!(best = best.model.code(), score = best.score, "{} models evaluated", evaluations.len());
        }

        Ok(Self { fitted, evaluations })
    }

    /// Evaluations from the best score to the worst.
    pub fn evaluations(&self) -> &[Evaluation<M>] {
        &self.evaluations
    }

    pub fn best(&self) -> Option<&Evaluation<M>> {
        self.evaluations.first()
    }

    pub fn fitted(&self, model: M) -> Option<&FittedModel<M>> {
        self.fitted.iter().find(|fitted| fitted.model == model)
    }
}

/// Models named by `codes` in the given order, or every model for `None`.
///
/// # Errors
///
/// Returns [`LearningError::InvalidModelCode`](crate::LearningError::InvalidModelCode)
/// for an unknown code.
pub fn select_models<M: ModelCode>(codes: Option<&[String]>) -> Result<Vec<M>> {
    match codes {
        None => Ok(M::all().to_vec()),
        Some(codes) => codes.iter().map(|code| M::parse(code)).collect(),
    }
}
