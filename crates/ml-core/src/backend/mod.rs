//! Frontera con el backend de ejecución de jobs.
//!
//! El core somete trabajo y sondea su estado; nunca inspecciona detalles del
//! backend más allá de este contrato. Las ubicaciones de datos son strings
//! opacos (URIs de almacenamiento, rutas); el significado lo pone el
//! backend.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::PipelineError;
use crate::step::StepKind;

/// Handle opaco de un job sometido. El engine lo conserva para sondear y
/// cancelar; no le atribuye estructura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: u64,
    pub step_id: String,
}

/// Estado reportado por el backend para un job.
#[derive(Debug, Clone)]
pub enum JobState {
    Running,
    /// Terminal: el job produjo estas ubicaciones por output.
    Succeeded { outputs: BTreeMap<String, String> },
    /// Terminal: el job falló con una razón legible.
    Failed { reason: String },
}

/// Backend capaz de ejecutar steps de los tres kinds.
///
/// `submit` no bloquea: registra el trabajo y devuelve un handle. `poll`
/// devuelve el estado actual; el engine sondea hasta estado terminal.
pub trait JobBackend {
    fn submit(&mut self,
              kind: StepKind,
              step_id: &str,
              inputs: &BTreeMap<String, String>,
              backend_config: &Value)
              -> Result<JobHandle, PipelineError>;

    fn poll(&mut self, handle: &JobHandle) -> Result<JobState, PipelineError>;

    /// Cancelación best-effort de un job en vuelo. Por defecto, no-op.
    fn cancel(&mut self, _handle: &JobHandle) {}
}
