use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ArtifactRef, StepInput};

/// Conjunto cerrado de kinds de step. Cada kind mapea a una llamada distinta
/// del backend de ejecución; el core nunca interpreta qué hace el job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Process,
    Train,
    Transform,
}

/// Definición declarativa de una unidad de trabajo del pipeline.
///
/// Los `inputs` preservan orden de inserción (determinismo del
/// `definition_hash`). `backend_config` es opaco: dimensionamiento de
/// instancias, entry point, content types... viajan al backend sin que el
/// core los lea. El `timeout` es por step y lo decide el caller; excederlo
/// se convierte en un `Failed` ordinario, no en un outcome distinto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub kind: StepKind,
    pub inputs: IndexMap<String, StepInput>,
    pub outputs: Vec<String>,
    pub backend_config: Value,
    pub timeout: Option<Duration>,
}

impl Step {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self { id: id.into(),
               kind,
               inputs: IndexMap::new(),
               outputs: Vec::new(),
               backend_config: Value::Null,
               timeout: None }
    }

    pub fn with_input(mut self, name: impl Into<String>, input: StepInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn with_backend_config(mut self, config: Value) -> Self {
        self.backend_config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Itera las referencias diferidas declaradas en los inputs.
    pub fn references(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.inputs.values().filter_map(|i| i.as_reference())
    }

    /// Cierto si el step declara `name` entre sus outputs.
    pub fn declares_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }
}
