//! Tipos de evento de ejecución y estructura `ExecutionEvent`.
//!
//! Rol en el flujo:
//! - Cada `run` del `ExecutionEngine` emite eventos a un `EventStore`
//!   append-only.
//! - La `Execution` observable se reconstruye por replay de estos eventos,
//!   sin estructuras mutables compartidas.
//! - El enum `ExecutionEventKind` define el contrato observable y estable
//!   del motor.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::model::ExecutionOutcome;

/// Por qué un step quedó `Skipped` sin ejecutarse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipCause {
    /// El step depende (directa o transitivamente) del step fallido.
    UpstreamFailed { step_id: String },
    /// El step no depende del fallido, pero la ejecución dejó de someter
    /// steps nuevos al registrarse el fallo.
    ExecutionHalted { failed_step_id: String },
    Cancelled,
}

/// Tipos de eventos soportados.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEventKind {
    /// Emisión inicial: fija nombre del pipeline, `definition_hash` y los ids
    /// de step en orden de declaración. Invariante: primer evento de una
    /// `execution_id`.
    ExecutionStarted {
        pipeline_name: String,
        definition_hash: String,
        step_ids: Vec<String>,
    },
    /// Un step fue sometido al backend. No implica éxito.
    StepStarted { step_index: usize, step_id: String },
    /// Un step terminó correctamente; `outputs` mapea cada output declarado a
    /// su ubicación concreta.
    StepSucceeded {
        step_index: usize,
        step_id: String,
        outputs: BTreeMap<String, String>,
    },
    /// Un step terminó con error terminal.
    StepFailed {
        step_index: usize,
        step_id: String,
        error: PipelineError,
    },
    /// Un step nunca se sometió: un upstream falló o la ejecución fue
    /// cancelada.
    StepSkipped {
        step_index: usize,
        step_id: String,
        cause: SkipCause,
    },
    /// Evento de cierre con el outcome terminal de la ejecución.
    ExecutionFinished { outcome: ExecutionOutcome },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub seq: u64, // asignado por el EventStore (orden append)
    pub execution_id: Uuid,
    pub kind: ExecutionEventKind,
    pub ts: DateTime<Utc>, // metadato, no participa del replay lógico
}
