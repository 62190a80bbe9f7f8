//! Job Transform: scoring batch con un modelo ya persistido.
//!
//! El handle del modelo es su ubicación de almacenamiento, tratada como
//! string opaco hasta este punto; la variante "modelo registrado por nombre"
//! queda del otro lado de la frontera del backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

use crate::data::{read_table, write_table, Table};
use crate::error::AdapterError;
use crate::model_store;

pub fn run_transform_job(inputs: &BTreeMap<String, String>,
                         config: &Value)
                         -> Result<BTreeMap<String, String>, AdapterError> {
    let model_location = inputs.get("model")
                               .ok_or_else(|| AdapterError::MissingInput("model".into()))?;
    let data_location = inputs.get("data")
                              .ok_or_else(|| AdapterError::MissingInput("data".into()))?;
    let output_path = config["output_path"].as_str()
                                           .ok_or_else(|| AdapterError::Malformed("missing output_path".into()))?;

    let model = model_store::load(Path::new(model_location))?.into_model()?;
    let table = read_table(Path::new(data_location))?;
    // El objetivo puede venir en los datos de entrada; se descarta antes de
    // predecir.
    let features = table.to_features("trip_duration")?;
    log::info!("transform: scoring {} rows with {}", features.len(), model.algorithm());

    let predictions = model.predict(&features);
    let mut out = Table::new(vec!["prediction".to_string()]);
    out.rows = predictions.iter().map(|p| vec![format!("{p}")]).collect();

    let file_name = format!("{}_predictions.csv", Utc::now().format("%Y%m%d_%H%M%S"));
    let path = PathBuf::from(output_path).join(file_name);
    write_table(&path, &out)?;

    let mut outputs = BTreeMap::new();
    outputs.insert("predictions".to_string(), path.display().to_string());
    Ok(outputs)
}
