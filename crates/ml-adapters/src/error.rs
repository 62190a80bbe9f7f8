//! Errores de los adapters. Se pliegan a `BackendFailure` al cruzar la
//! frontera del backend: el core sólo ve la razón legible.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing job input '{0}'")]
    MissingInput(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("model format: {0}")]
    Model(String),

    #[error(transparent)]
    Core(#[from] ml_core::PipelineError),
}
