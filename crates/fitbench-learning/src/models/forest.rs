//! Random forests of bootstrapped decision trees.
//!
//! Trees are grown in parallel with rayon. Tree `i` draws its bootstrap
//! sample and its candidate features from a ChaCha8 stream seeded with
//! `random_state + i`, so a forest is reproducible whatever the thread count.

use super::tree::DecisionTree;
use super::{Estimator, check_fit_input, check_n_features, majority_vote};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Number of candidate features drawn at every split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`.
    Sqrt,
    /// Every feature.
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Bagging ensemble of [`DecisionTree`]s.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_estimators: usize,
    is_classification: bool,
    max_features: MaxFeatures,
    random_state: u64,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Entropy trees with `sqrt` candidate features, predictions by majority vote.
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self::new(n_estimators, true, MaxFeatures::Sqrt)
    }

    /// MSE trees over every feature, predictions averaged.
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self::new(n_estimators, false, MaxFeatures::All)
    }

    fn new(n_estimators: usize, is_classification: bool, max_features: MaxFeatures) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            is_classification,
            max_features,
            random_state: 0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn model_name(&self) -> &'static str {
        if self.is_classification {
            "RandomForestClassifier"
        } else {
            "RandomForestRegressor"
        }
    }

    fn grow_tree(&self, tree_idx: usize, x: &Array2<f64>, y: &Array1<f64>) -> Result<DecisionTree> {
        let n_samples = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.wrapping_add(tree_idx as u64));

        let sample_indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
        let x_boot = x.select(Axis(0), &sample_indices);
        let y_boot = y.select(Axis(0), &sample_indices);

        let tree = if self.is_classification {
            DecisionTree::new_classifier()
        } else {
            DecisionTree::new_regressor()
        };
        let mut tree = tree
            .with_max_features(self.max_features.resolve(x.ncols()))
            .with_random_state(rng.next_u64());
        tree.fit(&x_boot, &y_boot)?;
        Ok(tree)
    }
}

impl Estimator for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(self.model_name(), x, y)?;
        self.n_features = x.ncols();

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| self.grow_tree(tree_idx, x, y))
            .collect::<Result<Vec<_>>>()?;

        debug!(trees = trees.len(), "{} grown", self.model_name());
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(LearningError::NotFitted(self.model_name()));
        }
        check_n_features(self.model_name(), self.n_features, x)?;

        let all_predictions = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_trees = all_predictions.len() as f64;
        let predictions = (0..x.nrows())
            .map(|i| {
                if self.is_classification {
                    majority_vote(all_predictions.iter().map(|p| p[i]))
                } else {
                    all_predictions.iter().map(|p| p[i]).sum::<f64>() / n_trees
                }
            })
            .collect();
        Ok(predictions)
    }
}

static_assertions::assert_impl_all!(RandomForest: Send, Sync);
