//! Formato persistido del modelo ganador.
//!
//! Un único documento JSON en la ubicación de output del step Train: la
//! identidad del algoritmo, sus parámetros ajustados y el reporte de scores
//! de todos los candidatos. De los candidatos rechazados no se guardan
//! parámetros, sólo su RMSE.

use std::fs;
use std::path::Path;

use ml_core::selector::{FittedModel, SelectionReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;
use crate::estimators::{forest, linear, FittedForest, FittedLinear};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub algorithm: String,
    pub params: Value,
    pub report: SelectionReport,
}

impl PersistedModel {
    pub fn from_selection(model: &dyn FittedModel, report: SelectionReport) -> Self {
        Self { algorithm: model.algorithm().to_string(),
               params: model.params(),
               report }
    }

    /// Reconstruye el modelo ejecutable a partir del documento.
    pub fn into_model(&self) -> Result<Box<dyn FittedModel>, AdapterError> {
        match self.algorithm.as_str() {
            linear::ALGORITHM => Ok(Box::new(FittedLinear::from_params(&self.params)?)),
            forest::ALGORITHM => Ok(Box::new(FittedForest::from_params(&self.params)?)),
            other => Err(AdapterError::Model(format!("unknown algorithm '{other}'"))),
        }
    }
}

pub fn save(path: &Path, model: &PersistedModel) -> Result<(), AdapterError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(model).map_err(|e| AdapterError::Model(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<PersistedModel, AdapterError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| AdapterError::Model(e.to_string()))
}
