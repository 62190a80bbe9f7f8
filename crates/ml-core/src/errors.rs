//! Errores del núcleo de ejecución de pipelines.
//!
//! Los errores estructurales (`DuplicateStepId`, `CyclicDependency`,
//! `UnknownReference`) se detectan en `validate()` y nunca llegan a una
//! ejecución. Los errores de runtime se atribuyen al step que falló y se
//! registran en la `Execution`; el engine no hace panic para no perder
//! bookkeeping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone, Serialize, Deserialize)]
pub enum PipelineError {
    /// Ya existe un step con ese id dentro del grafo.
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    /// La relación de dependencias derivada contiene un ciclo.
    #[error("cyclic dependency involving step '{0}'")]
    CyclicDependency(String),

    /// Una referencia apunta a un step que no pertenece al grafo.
    #[error("reference to unknown step '{source_step_id}' (output '{output_name}')")]
    UnknownReference { source_step_id: String, output_name: String },

    /// Invariante interna violada: al resolver una referencia el output del
    /// step upstream no estaba registrado. Indica un bug del engine, no un
    /// error del usuario.
    #[error("unresolved dependency '{source_step_id}.{output_name}' while submitting '{step_id}'")]
    UnresolvedDependency {
        step_id: String,
        source_step_id: String,
        output_name: String,
    },

    /// Un step reportó éxito sin producir un output declarado.
    #[error("step '{step_id}' succeeded without producing declared output '{output_name}'")]
    ContractViolation { step_id: String, output_name: String },

    /// El job subyacente falló o excedió su deadline.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// El selector de modelos recibió una lista vacía de candidatos.
    #[error("no candidate estimators configured")]
    NoCandidatesConfigured,

    #[error("internal: {0}")]
    Internal(String),
}
