use linfa::prelude::*;
use linfa_logistic::MultiLogisticRegression;
use linfa_nn::{distance::L2Dist, CommonNearestNeighbour, NearestNeighbour};
use linfa_svm::Svm;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use std::fmt;
use std::str::FromStr;

use crate::utils::ToolError;

/// Hyperparameters shared by the classifier families
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierParams {
    /// Neighbours consulted by KNN
    pub knn_neighbours: usize,
    /// Soft-margin penalty C of the linear SVM
    pub svm_c: f64,
    /// L2 penalty of the logistic-loss linear classifier
    pub sgd_alpha: f64,
    /// Iteration cap of the logistic-loss linear classifier
    pub sgd_max_iterations: u64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            knn_neighbours: 5,
            svm_c: 1.0,
            sgd_alpha: 1e-4,
            sgd_max_iterations: 1000,
        }
    }
}

/// Classifier families evaluated on every model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Linear-kernel support vector classifier, one-vs-one
    Svm,
    /// Distance-weighted k nearest neighbours
    Knn,
    /// Decision tree with default parameters
    Tree,
    /// Linear classifier with log loss and L2 penalty
    Sgd,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 4] = [
        ClassifierKind::Svm,
        ClassifierKind::Knn,
        ClassifierKind::Tree,
        ClassifierKind::Sgd,
    ];

    /// Report column name
    pub fn name(self) -> &'static str {
        match self {
            ClassifierKind::Svm => "SVM",
            ClassifierKind::Knn => "KNN",
            ClassifierKind::Tree => "TRE",
            ClassifierKind::Sgd => "SGD",
        }
    }

    /// Train on `(train, targets)` and predict the class of every `test` row
    pub fn fit_predict(
        self,
        params: &ClassifierParams,
        train: &Array2<f64>,
        targets: &Array1<usize>,
        test: &Array2<f64>,
    ) -> Result<Array1<usize>, ToolError> {
        if train.nrows() == 0 {
            return Err(ToolError::ModelError(format!(
                "{}: empty training set",
                self
            )));
        }
        match self {
            ClassifierKind::Svm => svm_one_vs_one(train, targets, test, params.svm_c),
            ClassifierKind::Knn => knn_distance_weighted(train, targets, test, params.knn_neighbours),
            ClassifierKind::Tree => decision_tree(train, targets, test),
            ClassifierKind::Sgd => {
                log_loss_linear(train, targets, test, params.sgd_alpha, params.sgd_max_iterations)
            }
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClassifierKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClassifierKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ToolError::ConfigError(format!("unknown classifier {}", s)))
    }
}

fn distinct_classes(targets: &Array1<usize>) -> Vec<usize> {
    let mut classes = targets.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Index of the largest vote, first one on ties
fn argmax(votes: &[f64]) -> usize {
    votes
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_vote), (idx, &vote)| {
            if vote > best_vote {
                (idx, vote)
            } else {
                (best, best_vote)
            }
        })
        .0
}

/// Multi-class linear SVM: one binary machine per class pair, majority vote
fn svm_one_vs_one(
    train: &Array2<f64>,
    targets: &Array1<usize>,
    test: &Array2<f64>,
    c: f64,
) -> Result<Array1<usize>, ToolError> {
    let classes = distinct_classes(targets);
    if classes.len() == 1 {
        return Ok(Array1::from_elem(test.nrows(), classes[0]));
    }

    let mut votes = Array2::<f64>::zeros((test.nrows(), classes.len()));
    for (a_idx, &a) in classes.iter().enumerate() {
        for (b_idx, &b) in classes.iter().enumerate().skip(a_idx + 1) {
            let pair: Vec<usize> = (0..targets.len())
                .filter(|&i| targets[i] == a || targets[i] == b)
                .collect();
            let records = train.select(Axis(0), &pair);
            let is_a: Array1<bool> = pair.iter().map(|&i| targets[i] == a).collect();

            let model = Svm::<f64, bool>::params()
                .pos_neg_weights(c, c)
                .linear_kernel()
                .fit(&Dataset::new(records, is_a))
                .map_err(|e| ToolError::ModelError(format!("SVM training failed: {}", e)))?;

            let predicted: Array1<bool> = model.predict(test);
            for (row, &picked_a) in predicted.iter().enumerate() {
                let winner = if picked_a { a_idx } else { b_idx };
                votes[[row, winner]] += 1.0;
            }
        }
    }

    Ok(votes
        .rows()
        .into_iter()
        .map(|row| classes[argmax(&row.to_vec())])
        .collect())
}

/// KNN where each neighbour votes with weight 1/distance; exact matches
/// take all the weight
fn knn_distance_weighted(
    train: &Array2<f64>,
    targets: &Array1<usize>,
    test: &Array2<f64>,
    k: usize,
) -> Result<Array1<usize>, ToolError> {
    if k == 0 {
        return Err(ToolError::ConfigError("KNN needs k > 0".to_string()));
    }
    let n_classes = targets.iter().copied().max().map_or(0, |m| m + 1);
    let index = CommonNearestNeighbour::KdTree
        .from_batch(train, L2Dist)
        .map_err(|e| ToolError::ModelError(format!("failed to build KNN index: {}", e)))?;
    let k = k.min(train.nrows());

    let mut predictions = Vec::with_capacity(test.nrows());
    for query in test.rows() {
        let neighbours = index
            .k_nearest(query, k)
            .map_err(|e| ToolError::ModelError(format!("KNN query failed: {}", e)))?;

        let distances: Vec<(usize, f64)> = neighbours
            .iter()
            .map(|(point, idx)| {
                let distance = (point - &query).mapv(|v| v * v).sum().sqrt();
                (targets[*idx], distance)
            })
            .collect();

        let exact = distances.iter().any(|&(_, d)| d == 0.0);
        let mut votes = vec![0.0; n_classes];
        for (class, distance) in distances {
            votes[class] += match (exact, distance == 0.0) {
                (true, true) => 1.0,
                (true, false) => 0.0,
                _ => 1.0 / distance,
            };
        }
        predictions.push(argmax(&votes));
    }

    Ok(Array1::from(predictions))
}

fn decision_tree(
    train: &Array2<f64>,
    targets: &Array1<usize>,
    test: &Array2<f64>,
) -> Result<Array1<usize>, ToolError> {
    let model = DecisionTree::params()
        .fit(&Dataset::new(train.clone(), targets.clone()))
        .map_err(|e| ToolError::ModelError(format!("decision tree training failed: {}", e)))?;
    Ok(model.predict(test))
}

fn log_loss_linear(
    train: &Array2<f64>,
    targets: &Array1<usize>,
    test: &Array2<f64>,
    alpha: f64,
    max_iterations: u64,
) -> Result<Array1<usize>, ToolError> {
    let classes = distinct_classes(targets);
    if classes.len() == 1 {
        return Ok(Array1::from_elem(test.nrows(), classes[0]));
    }

    let model = MultiLogisticRegression::default()
        .alpha(alpha)
        .max_iterations(max_iterations)
        .fit(&Dataset::new(train.clone(), targets.clone()))
        .map_err(|e| ToolError::ModelError(format!("logistic training failed: {}", e)))?;
    Ok(model.predict(test))
}
