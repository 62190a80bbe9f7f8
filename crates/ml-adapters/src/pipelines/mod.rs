//! Constructores de los grafos canónicos de entrenamiento e inferencia.
//!
//! Entrenamiento: `PreprocessAndFeatureEng` (Process) -> `TrainModel`
//! (Train), con los outputs `train`/`test` cableados por referencia.
//! Inferencia: `InferencePreprocess` (Process) -> `BatchInference`
//! (Transform), con `inference_data` cableado por referencia y el modelo
//! como ubicación literal (la variante "modelo registrado por nombre" vive
//! del otro lado de la frontera del backend).
//!
//! La configuración de proyecto es explícita y viaja con quien construye
//! los grafos; no hay constantes globales de bucket ni de rol.

use ml_core::{PipelineError, PipelineGraph, Step, StepInput, StepKind};
use serde_json::json;

/// Configuración de proyecto: prefijo para nombrar pipelines y raíz de
/// almacenamiento para los outputs de los jobs.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub project_prefix: String,
    pub data_root: String,
}

impl ProjectConfig {
    pub fn new(project_prefix: impl Into<String>, data_root: impl Into<String>) -> Self {
        Self { project_prefix: project_prefix.into(),
               data_root: data_root.into() }
    }

    fn pipeline_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.project_prefix, suffix)
    }

    fn output_location(&self, leaf: &str) -> String {
        format!("{}/{}", self.data_root.trim_end_matches('/'), leaf)
    }
}

/// Grafo de entrenamiento: limpieza + split y luego fit con selección de
/// modelo. `raw_location` es la ubicación del dataset crudo.
pub fn training_pipeline(config: &ProjectConfig, raw_location: &str) -> Result<PipelineGraph, PipelineError> {
    let mut graph = PipelineGraph::new(config.pipeline_name("training-pipeline"));
    graph.add_step(Step::new("PreprocessAndFeatureEng", StepKind::Process)
                       .with_input("raw", StepInput::literal(raw_location))
                       .with_output("train")
                       .with_output("test")
                       .with_backend_config(json!({
                           "entry_point": "preprocess",
                           "mode": "training",
                           "output_base": config.output_location("processed"),
                           "instance_type": "local",
                           "instance_count": 1,
                       })))?;
    graph.add_step(Step::new("TrainModel", StepKind::Train)
                       .with_input("train", StepInput::reference("PreprocessAndFeatureEng", "train"))
                       .with_input("test", StepInput::reference("PreprocessAndFeatureEng", "test"))
                       .with_output("model")
                       .with_backend_config(json!({
                           "entry_point": "train",
                           "output_path": config.output_location("models"),
                           "instance_type": "local",
                           "instance_count": 1,
                       })))?;
    Ok(graph)
}

/// Grafo de inferencia batch: re-featuriza datos nuevos y los puntúa con un
/// modelo ya entrenado. `model_location` es el handle opaco del modelo.
pub fn inference_pipeline(config: &ProjectConfig,
                          input_location: &str,
                          model_location: &str)
                          -> Result<PipelineGraph, PipelineError> {
    let mut graph = PipelineGraph::new(config.pipeline_name("inference-pipeline"));
    graph.add_step(Step::new("InferencePreprocess", StepKind::Process)
                       .with_input("raw", StepInput::literal(input_location))
                       .with_output("inference_data")
                       .with_backend_config(json!({
                           "entry_point": "preprocess",
                           "mode": "inference",
                           "output_base": config.output_location("inference"),
                           "instance_type": "local",
                           "instance_count": 1,
                       })))?;
    graph.add_step(Step::new("BatchInference", StepKind::Transform)
                       .with_input("data", StepInput::reference("InferencePreprocess", "inference_data"))
                       .with_input("model", StepInput::literal(model_location))
                       .with_output("predictions")
                       .with_backend_config(json!({
                           "entry_point": "batch_inference",
                           "output_path": config.output_location("predictions"),
                           "content_type": "text/csv",
                           "instance_type": "local",
                           "instance_count": 1,
                       })))?;
    Ok(graph)
}
