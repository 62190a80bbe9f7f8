//! Estimadores candidatos concretos. Cajas negras fit/predict para el
//! selector; el core nunca mira adentro.

pub mod forest;
pub mod linear;

pub use forest::{FittedForest, RegressionForest};
pub use linear::{FittedLinear, LinearRegression};

use ml_core::selector::Estimator;

/// Candidatos por defecto del step Train, en orden de declaración (el orden
/// desempata la selección).
pub fn default_candidates() -> Vec<Box<dyn Estimator>> {
    vec![Box::new(LinearRegression), Box::new(RegressionForest::default())]
}
