//! Errores de persistencia. En la frontera con los traits del core se
//! pliegan a `PipelineError::Internal`: el caller del engine sólo ve la
//! razón legible.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Core(#[from] ml_core::PipelineError),
}

impl From<PersistenceError> for ml_core::PipelineError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Core(e) => e,
            other => ml_core::PipelineError::Internal(other.to_string()),
        }
    }
}
