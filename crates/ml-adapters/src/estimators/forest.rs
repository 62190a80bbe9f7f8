//! Bosque de regresión chico: árboles con profundidad acotada sobre
//! submuestras deterministas (cada árbol descarta un fold rotativo de las
//! filas, sin RNG, para que el mismo split produzca siempre el mismo
//! modelo).

use ml_core::selector::{Dataset, Estimator, FittedModel};
use ml_core::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

pub const ALGORITHM: &str = "regression_forest";

#[derive(Debug, Clone)]
pub struct RegressionForest {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
}

impl Default for RegressionForest {
    fn default() -> Self {
        Self { n_trees: 10,
               max_depth: 5,
               min_leaf: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split { feature, threshold, left, right } => {
                if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedForest {
    pub trees: Vec<TreeNode>,
}

impl FittedForest {
    pub fn from_params(params: &Value) -> Result<Self, AdapterError> {
        serde_json::from_value(params.clone()).map_err(|e| AdapterError::Model(e.to_string()))
    }
}

impl FittedModel for FittedForest {
    fn algorithm(&self) -> &str {
        ALGORITHM
    }

    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        features.iter()
                .map(|row| {
                    let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
                    sum / self.trees.len() as f64
                })
                .collect()
    }

    fn params(&self) -> Value {
        serde_json::to_value(self).expect("serialize forest params")
    }
}

impl Estimator for RegressionForest {
    fn name(&self) -> &str {
        ALGORITHM
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn FittedModel>, PipelineError> {
        if train.is_empty() {
            return Err(PipelineError::Internal("empty training set".into()));
        }
        let n = train.len();
        let mut trees = Vec::with_capacity(self.n_trees);
        for t in 0..self.n_trees.max(1) {
            // Fold rotativo: el árbol t no ve las filas i % n_trees == t.
            let mut indices: Vec<usize> = (0..n).filter(|i| self.n_trees <= 1 || i % self.n_trees != t)
                                                .collect();
            if indices.is_empty() {
                indices = (0..n).collect();
            }
            trees.push(self.build(train, &indices, self.max_depth));
        }
        Ok(Box::new(FittedForest { trees }))
    }
}

impl RegressionForest {
    fn build(&self, data: &Dataset, indices: &[usize], depth: usize) -> TreeNode {
        let mean = indices.iter().map(|&i| data.targets[i]).sum::<f64>() / indices.len() as f64;
        if depth == 0 || indices.len() < 2 * self.min_leaf {
            return TreeNode::Leaf { value: mean };
        }

        match self.best_split(data, indices) {
            None => TreeNode::Leaf { value: mean },
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| data.features[i][feature] <= threshold);
                if left.is_empty() || right.is_empty() {
                    return TreeNode::Leaf { value: mean };
                }
                TreeNode::Split { feature,
                                  threshold,
                                  left: Box::new(self.build(data, &left, depth - 1)),
                                  right: Box::new(self.build(data, &right, depth - 1)) }
            }
        }
    }

    /// Mejor split exacto por reducción de suma de errores cuadrados,
    /// evaluando cada frontera entre valores distintos de cada feature.
    fn best_split(&self, data: &Dataset, indices: &[usize]) -> Option<(usize, f64)> {
        let n_features = data.features[indices[0]].len();
        let len = indices.len();
        let mut best: Option<(f64, usize, f64)> = None; // (sse, feature, threshold)

        for feature in 0..n_features {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| data.features[a][feature].total_cmp(&data.features[b][feature]));

            let mut sum_left = 0.0;
            let mut sq_left = 0.0;
            let total_sum: f64 = sorted.iter().map(|&i| data.targets[i]).sum();
            let total_sq: f64 = sorted.iter().map(|&i| data.targets[i] * data.targets[i]).sum();

            for p in 1..len {
                let prev = sorted[p - 1];
                sum_left += data.targets[prev];
                sq_left += data.targets[prev] * data.targets[prev];

                if p < self.min_leaf || len - p < self.min_leaf {
                    continue;
                }
                let v_prev = data.features[prev][feature];
                let v_next = data.features[sorted[p]][feature];
                if v_prev == v_next {
                    continue;
                }

                let left_n = p as f64;
                let right_n = (len - p) as f64;
                let sum_right = total_sum - sum_left;
                let sq_right = total_sq - sq_left;
                let sse = (sq_left - sum_left * sum_left / left_n)
                          + (sq_right - sum_right * sum_right / right_n);

                let improves = best.map(|(b, _, _)| sse < b).unwrap_or(true);
                if improves {
                    best = Some((sse, feature, (v_prev + v_next) / 2.0));
                }
            }
        }
        best.map(|(_, feature, threshold)| (feature, threshold))
    }
}
