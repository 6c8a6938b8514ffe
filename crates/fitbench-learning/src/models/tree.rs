//! CART decision trees.
//!
//! Classification trees split on entropy and predict the majority class of a
//! leaf. Regression trees split on the mean squared error and predict the
//! leaf mean. Thresholds are midpoints between consecutive distinct values.

use super::{Estimator, check_fit_input, check_n_features, majority_vote, unique_classes};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Split quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Shannon entropy, for classification.
    Entropy,
    /// Variance of the target, for regression.
    Mse,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Nodes with fewer samples become leaves.
const MIN_SAMPLES_SPLIT: usize = 2;

/// Decision tree grown until its leaves are pure or cannot be split.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    criterion: Criterion,
    max_features: Option<usize>,
    random_state: u64,
    n_features: usize,
    root: Option<TreeNode>,
}

/// Running statistics of the samples on one side of a split.
#[derive(Debug, Clone)]
struct SideStats {
    counts: Vec<usize>,
    sum: f64,
    sum_sq: f64,
    n: usize,
}

impl SideStats {
    fn empty(n_classes: usize) -> Self {
        Self {
            counts: vec![0; n_classes],
            sum: 0.0,
            sum_sq: 0.0,
            n: 0,
        }
    }

    fn add(&mut self, class: usize, value: f64) {
        if let Some(count) = self.counts.get_mut(class) {
            *count += 1;
        }
        self.sum += value;
        self.sum_sq += value * value;
        self.n += 1;
    }

    fn remove(&mut self, class: usize, value: f64) {
        if let Some(count) = self.counts.get_mut(class) {
            *count -= 1;
        }
        self.sum -= value;
        self.sum_sq -= value * value;
        self.n -= 1;
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let n = self.n as f64;
        match criterion {
            Criterion::Entropy => self
                .counts
                .iter()
                .filter(|&&count| count > 0)
                .map(|&count| {
                    let p = count as f64 / n;
                    -p * p.ln()
                })
                .sum(),
            Criterion::Mse => {
                let mean = self.sum / n;
                (self.sum_sq / n - mean * mean).max(0.0)
            }
        }
    }
}

/// Samples of the tree being grown.
struct TrainingSet<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    /// Class index of every sample, empty for regression.
    class_of: Vec<usize>,
    n_classes: usize,
}

impl TrainingSet<'_> {
    fn class(&self, sample: usize) -> usize {
        self.class_of.get(sample).copied().unwrap_or(0)
    }

    fn stats(&self, samples: &[usize]) -> SideStats {
        let mut stats = SideStats::empty(self.n_classes);
        for &sample in samples {
            stats.add(self.class(sample), self.y[sample]);
        }
        stats
    }
}

/// Midpoint of `low < high`, falling back to `low` when the two are adjacent floats.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid < high { mid } else { low }
}

/// All samples share one target value.
fn is_pure(data: &TrainingSet<'_>, samples: &[usize]) -> bool {
    match samples.split_first() {
        Some((&first, rest)) => rest.iter().all(|&s| data.y[s] == data.y[first]),
        None => true,
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Entropy based classification tree.
    pub fn new_classifier() -> Self {
        Self::new(Criterion::Entropy)
    }

    /// Mean squared error regression tree.
    pub fn new_regressor() -> Self {
        Self::new(Criterion::Mse)
    }

    fn new(criterion: Criterion) -> Self {
        Self {
            criterion,
            max_features: None,
            random_state: 0,
            n_features: 0,
            root: None,
        }
    }

    /// Draw `n` candidate features at random for every split.
    #[must_use]
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n.max(1));
        self
    }

    /// Seed of the candidate feature draws.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn is_classifier(&self) -> bool {
        self.criterion == Criterion::Entropy
    }

    fn model_name(&self) -> &'static str {
        if self.is_classifier() {
            "DecisionTreeClassifier"
        } else {
            "DecisionTreeRegressor"
        }
    }

    fn build_node(
        &self,
        data: &TrainingSet<'_>,
        samples: Vec<usize>,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        if samples.len() < MIN_SAMPLES_SPLIT || is_pure(data, &samples) {
            return self.leaf(data, &samples);
        }

        let stats = data.stats(&samples);
        match self.best_split(data, &samples, &stats, rng) {
            Some(split) => {
                let (left, right): (Vec<usize>, Vec<usize>) = samples
                    .iter()
                    .partition(|&&s| data.x[[s, split.feature_idx]] <= split.threshold);
                TreeNode::Split {
                    feature_idx: split.feature_idx,
                    threshold: split.threshold,
                    left: Box::new(self.build_node(data, left, rng)),
                    right: Box::new(self.build_node(data, right, rng)),
                }
            }
            None => self.leaf(data, &samples),
        }
    }

    fn leaf(&self, data: &TrainingSet<'_>, samples: &[usize]) -> TreeNode {
        let value = match self.criterion {
            Criterion::Entropy => majority_vote(samples.iter().map(|&s| data.y[s])),
            Criterion::Mse => {
                samples.iter().map(|&s| data.y[s]).sum::<f64>() / samples.len().max(1) as f64
            }
        };
        TreeNode::Leaf { value }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut features = rand::seq::index::sample(rng, self.n_features, k).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Lowest weighted child impurity over the candidate features.
    fn best_split(
        &self,
        data: &TrainingSet<'_>,
        samples: &[usize],
        total: &SideStats,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = samples.len() as f64;
        let mut best: Option<BestSplit> = None;

        for feature_idx in self.candidate_features(rng) {
            let mut sorted = samples.to_vec();
            sorted.sort_by(|&a, &b| data.x[[a, feature_idx]].total_cmp(&data.x[[b, feature_idx]]));

            let mut left = SideStats::empty(data.n_classes);
            let mut right = total.clone();

            for pair in sorted.windows(2) {
                let (current, next) = (pair[0], pair[1]);
                left.add(data.class(current), data.y[current]);
                right.remove(data.class(current), data.y[current]);

                let value = data.x[[current, feature_idx]];
                let next_value = data.x[[next, feature_idx]];
                if next_value <= value {
                    continue;
                }

                let impurity = (left.n as f64 * left.impurity(self.criterion)
                    + right.n as f64 * right.impurity(self.criterion))
                    / n;
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: midpoint(value, next_value),
                        impurity,
                    });
                }
            }
        }
        best
    }

    fn predict_sample(node: &TreeNode, row: ndarray::ArrayView1<'_, f64>) -> f64 {
        match node {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_sample(left, row)
                } else {
                    Self::predict_sample(right, row)
                }
            }
        }
    }
}

impl Estimator for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(self.model_name(), x, y)?;
        self.n_features = x.ncols();

        let (class_of, n_classes) = if self.is_classifier() {
            let classes = unique_classes(y);
            let class_of = y
                .iter()
                .map(|v| classes.partition_point(|c| c < v))
                .collect();
            (class_of, classes.len())
        } else {
            (Vec::new(), 0)
        };

        let data = TrainingSet {
            x,
            y,
            class_of,
            n_classes,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        self.root = Some(self.build_node(&data, (0..x.nrows()).collect(), &mut rng));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or(LearningError::NotFitted(self.model_name()))?;
        check_n_features(self.model_name(), self.n_features, x)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| Self::predict_sample(root, row))
            .collect())
    }
}
