//! Job Train: ajusta los candidatos sobre el split y persiste el ganador.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ml_core::selector::{self, TrainValidationSplit};
use serde_json::Value;

use crate::data::read_table;
use crate::error::AdapterError;
use crate::estimators::default_candidates;
use crate::model_store::{self, PersistedModel};

const TARGET_COLUMN: &str = "trip_duration";

pub fn run_train_job(inputs: &BTreeMap<String, String>,
                     config: &Value)
                     -> Result<BTreeMap<String, String>, AdapterError> {
    let train_location = inputs.get("train")
                               .ok_or_else(|| AdapterError::MissingInput("train".into()))?;
    let test_location = inputs.get("test")
                              .ok_or_else(|| AdapterError::MissingInput("test".into()))?;
    let output_path = config["output_path"].as_str()
                                           .ok_or_else(|| AdapterError::Malformed("missing output_path".into()))?;

    let train = read_table(Path::new(train_location))?.to_dataset(TARGET_COLUMN)?;
    let validation = read_table(Path::new(test_location))?.to_dataset(TARGET_COLUMN)?;
    log::info!("train: {} train rows, {} validation rows", train.len(), validation.len());

    let split = TrainValidationSplit { train, validation };
    let candidates = default_candidates();
    let selection = selector::select(&candidates, &split)?;
    for score in &selection.report.candidates {
        log::info!("candidate {} rmse {:.4}", score.name, score.rmse);
    }
    log::info!("selected {}", selection.report.selected);

    let model_path = PathBuf::from(output_path).join("model.json");
    let document = PersistedModel::from_selection(selection.model.as_ref(), selection.report);
    model_store::save(&model_path, &document)?;

    let mut outputs = BTreeMap::new();
    outputs.insert("model".to_string(), model_path.display().to_string());
    Ok(outputs)
}
