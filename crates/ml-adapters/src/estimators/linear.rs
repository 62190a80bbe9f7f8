//! Regresión lineal por mínimos cuadrados (ecuaciones normales).

use ml_core::selector::{Dataset, Estimator, FittedModel};
use ml_core::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

pub const ALGORITHM: &str = "linear_regression";

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedLinear {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl FittedLinear {
    pub fn from_params(params: &Value) -> Result<Self, AdapterError> {
        serde_json::from_value(params.clone()).map_err(|e| AdapterError::Model(e.to_string()))
    }
}

impl FittedModel for FittedLinear {
    fn algorithm(&self) -> &str {
        ALGORITHM
    }

    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        features.iter()
                .map(|row| {
                    self.intercept
                    + self.coefficients
                          .iter()
                          .zip(row)
                          .map(|(c, x)| c * x)
                          .sum::<f64>()
                })
                .collect()
    }

    fn params(&self) -> Value {
        serde_json::to_value(self).expect("serialize linear params")
    }
}

impl Estimator for LinearRegression {
    fn name(&self) -> &str {
        ALGORITHM
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn FittedModel>, PipelineError> {
        if train.is_empty() {
            return Err(PipelineError::Internal("empty training set".into()));
        }
        let k = train.features[0].len();
        // Sistema normal aumentado con columna de intercepto: dimensión k+1.
        let dim = k + 1;
        let mut xtx = vec![vec![0.0f64; dim]; dim];
        let mut xty = vec![0.0f64; dim];
        for (row, &y) in train.features.iter().zip(&train.targets) {
            let mut augmented = Vec::with_capacity(dim);
            augmented.push(1.0);
            augmented.extend_from_slice(row);
            for i in 0..dim {
                for j in 0..dim {
                    xtx[i][j] += augmented[i] * augmented[j];
                }
                xty[i] += augmented[i] * y;
            }
        }

        let beta = solve(xtx, xty).ok_or_else(|| {
                                      PipelineError::Internal("singular design matrix in least squares".into())
                                  })?;
        Ok(Box::new(FittedLinear { intercept: beta[0],
                                   coefficients: beta[1..].to_vec() }))
    }
}

/// Eliminación gaussiana con pivoteo parcial. `None` si el sistema es
/// singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in (row + 1)..n {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_relation() {
        // y = 2 + 3*x0 - x1
        let features: Vec<Vec<f64>> = vec![vec![0.0, 0.0],
                                           vec![1.0, 0.0],
                                           vec![0.0, 1.0],
                                           vec![2.0, 3.0],
                                           vec![4.0, 1.0]];
        let targets: Vec<f64> = features.iter().map(|r| 2.0 + 3.0 * r[0] - r[1]).collect();
        let train = Dataset { features: features.clone(),
                              targets };

        let model = LinearRegression.fit(&train).unwrap();
        assert!((model.predict(&features)[3] - (2.0 + 6.0 - 3.0)).abs() < 1e-8);

        let reloaded = FittedLinear::from_params(&model.params()).unwrap();
        assert!((reloaded.intercept - 2.0).abs() < 1e-8);
        assert!((reloaded.coefficients[0] - 3.0).abs() < 1e-8);
        assert!((reloaded.coefficients[1] + 1.0).abs() < 1e-8);
    }

    #[test]
    fn empty_training_set_fails() {
        assert!(LinearRegression.fit(&Dataset::default()).is_err());
    }
}
