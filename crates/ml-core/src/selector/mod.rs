//! Selección automática de modelo dentro del step Train.
//!
//! Los estimadores son cajas negras fit/predict: el selector ajusta cada
//! candidato sobre el mismo split train/validación, calcula un RMSE escalar
//! por candidato y elige el mínimo. Empates favorecen al candidato declarado
//! primero. Sólo el ganador se persiste; de los rechazados sobrevive apenas
//! su score en el `SelectionReport`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PipelineError;

/// Matriz de features por fila más el vector objetivo.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Split fijo: los candidatos se ajustan sobre `train` y se puntúan sobre
/// `validation`.
#[derive(Debug, Clone)]
pub struct TrainValidationSplit {
    pub train: Dataset,
    pub validation: Dataset,
}

/// Modelo ya ajustado, listo para predecir y persistirse.
pub trait FittedModel {
    /// Identidad del algoritmo (estable; se persiste junto al modelo).
    fn algorithm(&self) -> &str;

    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64>;

    /// Parámetros ajustados en forma JSON, suficientes para reconstruir el
    /// modelo.
    fn params(&self) -> Value;
}

/// Estimador candidato, caja negra respecto del core.
pub trait Estimator {
    fn name(&self) -> &str;

    fn fit(&self, train: &Dataset) -> Result<Box<dyn FittedModel>, PipelineError>;
}

/// Score de un candidato evaluado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub rmse: f64,
}

/// Registro observable de la selección: todos los scores más el ganador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub candidates: Vec<CandidateScore>,
    pub selected: String,
}

/// Resultado de la selección: el modelo ganador ajustado y el reporte.
pub struct Selection {
    pub model: Box<dyn FittedModel>,
    pub report: SelectionReport,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("model", &self.model.algorithm())
            .field("report", &self.report)
            .finish()
    }
}

/// Raíz del error cuadrático medio entre predicciones y objetivos.
pub fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    debug_assert_eq!(predictions.len(), targets.len());
    if targets.is_empty() {
        return f64::NAN;
    }
    let mse = predictions.iter()
                         .zip(targets)
                         .map(|(p, t)| (p - t) * (p - t))
                         .sum::<f64>()
        / targets.len() as f64;
    mse.sqrt()
}

/// Ajusta todos los candidatos y elige el de menor RMSE de validación.
pub fn select(candidates: &[Box<dyn Estimator>],
              split: &TrainValidationSplit)
              -> Result<Selection, PipelineError> {
    if candidates.is_empty() {
        return Err(PipelineError::NoCandidatesConfigured);
    }

    let mut scores: Vec<CandidateScore> = Vec::with_capacity(candidates.len());
    let mut best: Option<(usize, f64, Box<dyn FittedModel>)> = None;

    for (i, candidate) in candidates.iter().enumerate() {
        let fitted = candidate.fit(&split.train)?;
        let predictions = fitted.predict(&split.validation.features);
        let score = rmse(&predictions, &split.validation.targets);
        scores.push(CandidateScore { name: candidate.name().to_string(),
                                     rmse: score });

        // Comparación estricta: un empate no desplaza al declarado antes.
        // NaN nunca gana contra un score finito.
        let improves = match &best {
            None => true,
            Some((_, best_score, _)) => {
                score < *best_score || (best_score.is_nan() && !score.is_nan())
            }
        };
        if improves {
            best = Some((i, score, fitted));
        }
    }

    let (winner_index, _, model) = best.expect("at least one candidate fitted");
    let selected = candidates[winner_index].name().to_string();
    Ok(Selection { model,
                   report: SelectionReport { candidates: scores, selected } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Estimador de prueba que predice una constante; su RMSE contra un
    /// objetivo constante es la distancia entre ambos.
    struct ConstantEstimator {
        name: &'static str,
        value: f64,
    }

    struct ConstantModel {
        value: f64,
    }

    impl FittedModel for ConstantModel {
        fn algorithm(&self) -> &str {
            "constant"
        }

        fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
            vec![self.value; features.len()]
        }

        fn params(&self) -> Value {
            json!({ "value": self.value })
        }
    }

    impl Estimator for ConstantEstimator {
        fn name(&self) -> &str {
            self.name
        }

        fn fit(&self, _train: &Dataset) -> Result<Box<dyn FittedModel>, PipelineError> {
            Ok(Box::new(ConstantModel { value: self.value }))
        }
    }

    fn split_with_target(target: f64) -> TrainValidationSplit {
        let ds = Dataset { features: vec![vec![0.0]; 4],
                           targets: vec![target; 4] };
        TrainValidationSplit { train: ds.clone(),
                               validation: ds }
    }

    #[test]
    fn selects_minimum_rmse() {
        // Contra objetivo 0.0: rmse(worse) = 5.0, rmse(better) = 4.2
        let candidates: Vec<Box<dyn Estimator>> =
            vec![Box::new(ConstantEstimator { name: "worse", value: 5.0 }),
                 Box::new(ConstantEstimator { name: "better", value: 4.2 })];
        let selection = select(&candidates, &split_with_target(0.0)).unwrap();
        assert_eq!(selection.report.selected, "better");
        assert_eq!(selection.model.algorithm(), "constant");
        assert_eq!(selection.report.candidates.len(), 2);
        assert!((selection.report.candidates[0].rmse - 5.0).abs() < 1e-12);
        assert!((selection.report.candidates[1].rmse - 4.2).abs() < 1e-12);
    }

    #[test]
    fn tie_prefers_first_declared() {
        let candidates: Vec<Box<dyn Estimator>> =
            vec![Box::new(ConstantEstimator { name: "first", value: 4.2 }),
                 Box::new(ConstantEstimator { name: "second", value: 4.2 })];
        let selection = select(&candidates, &split_with_target(0.0)).unwrap();
        assert_eq!(selection.report.selected, "first");
    }

    #[test]
    fn empty_candidates_fail() {
        let candidates: Vec<Box<dyn Estimator>> = Vec::new();
        let err = select(&candidates, &split_with_target(0.0)).unwrap_err();
        assert_eq!(err, PipelineError::NoCandidatesConfigured);
    }

    #[test]
    fn rmse_of_exact_predictions_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(rmse(&v, &v), 0.0);
    }
}
