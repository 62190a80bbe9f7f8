//! Estado observable de una ejecución, reconstruido por replay.
//!
//! La `Execution` no se muta directamente: el engine emite eventos
//! append-only y este módulo aplica un replay lineal (consume eventos en
//! orden y actualiza un slot por step). Una vez que la ejecución alcanza un
//! estado terminal el log no recibe más eventos, por lo que el replay es
//! estable: mismos eventos, misma `Execution`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::event::{ExecutionEvent, ExecutionEventKind, SkipCause};
use crate::step::StepStatus;

/// Outcome terminal (o en curso) de una ejecución completa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Estado de un step dentro de la ejecución.
#[derive(Debug, Clone)]
pub struct StepSlot {
    pub step_id: String,
    pub status: StepStatus,
    /// Ubicaciones concretas por output declarado; vacío hasta `Succeeded`.
    pub outputs: BTreeMap<String, String>,
    pub error: Option<PipelineError>,
    /// Id del step cuyo fallo provocó el skip, si aplica.
    pub skipped_on: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Una corrida de un `PipelineGraph`: estado por step y outputs resueltos.
#[derive(Debug, Clone)]
pub struct Execution {
    pub execution_id: Uuid,
    pub pipeline_name: String,
    pub definition_hash: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepSlot>,
    pub outcome: ExecutionOutcome,
}

impl Execution {
    /// Reconstruye la ejecución aplicando los eventos en orden.
    ///
    /// Devuelve `None` si el log está vacío o no empieza con
    /// `ExecutionStarted`.
    pub fn replay(events: &[ExecutionEvent]) -> Option<Execution> {
        let first = events.first()?;
        let (pipeline_name, definition_hash, step_ids) = match &first.kind {
            ExecutionEventKind::ExecutionStarted { pipeline_name,
                                                   definition_hash,
                                                   step_ids, } => {
                (pipeline_name.clone(), definition_hash.clone(), step_ids.clone())
            }
            _ => return None,
        };

        let mut steps: Vec<StepSlot> = step_ids.iter()
                                               .map(|id| StepSlot { step_id: id.clone(),
                                                                    status: StepStatus::Pending,
                                                                    outputs: BTreeMap::new(),
                                                                    error: None,
                                                                    skipped_on: None,
                                                                    started_at: None,
                                                                    finished_at: None })
                                               .collect();
        let mut outcome = ExecutionOutcome::Running;

        for ev in events {
            match &ev.kind {
                ExecutionEventKind::ExecutionStarted { .. } => {}
                ExecutionEventKind::StepStarted { step_index, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Running;
                        slot.started_at = Some(ev.ts);
                    }
                }
                ExecutionEventKind::StepSucceeded { step_index, outputs, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Succeeded;
                        slot.outputs = outputs.clone();
                        slot.finished_at = Some(ev.ts);
                    }
                }
                ExecutionEventKind::StepFailed { step_index, error, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Failed;
                        slot.error = Some(error.clone());
                        slot.finished_at = Some(ev.ts);
                    }
                }
                ExecutionEventKind::StepSkipped { step_index, cause, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Skipped;
                        slot.skipped_on = match cause {
                            SkipCause::UpstreamFailed { step_id } => Some(step_id.clone()),
                            SkipCause::ExecutionHalted { failed_step_id } => Some(failed_step_id.clone()),
                            SkipCause::Cancelled => None,
                        };
                        slot.finished_at = Some(ev.ts);
                    }
                }
                ExecutionEventKind::ExecutionFinished { outcome: o } => outcome = *o,
            }
        }

        Some(Execution { execution_id: first.execution_id,
                         pipeline_name,
                         definition_hash,
                         started_at: first.ts,
                         steps,
                         outcome })
    }

    pub fn status_of(&self, step_id: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.step_id == step_id).map(|s| s.status)
    }

    /// Ubicación concreta de `(step_id, output_name)` si el step ya terminó
    /// con éxito.
    pub fn output_of(&self, step_id: &str, output_name: &str) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.step_id == step_id)
            .and_then(|s| s.outputs.get(output_name))
            .map(|s| s.as_str())
    }

    /// Vista aplanada `(step_id, output_name) -> ubicación` de todos los
    /// outputs registrados.
    pub fn resolved_outputs(&self) -> BTreeMap<(String, String), String> {
        let mut map = BTreeMap::new();
        for slot in &self.steps {
            for (name, location) in &slot.outputs {
                map.insert((slot.step_id.clone(), name.clone()), location.clone());
            }
        }
        map
    }

    /// Primer step fallido, con su error.
    pub fn failed_step(&self) -> Option<(&str, &PipelineError)> {
        self.steps
            .iter()
            .find_map(|s| s.error.as_ref().map(|e| (s.step_id.as_str(), e)))
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != ExecutionOutcome::Running
    }
}
