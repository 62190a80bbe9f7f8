//! Referencias simbólicas a outputs todavía no producidos.
//!
//! Un `ArtifactRef` es una coordenada `(source_step_id, output_name)`, nunca
//! un valor. Un step se construye y se cablea en el grafo antes de que exista
//! ningún output upstream; la resolución es un lookup puro contra los outputs
//! ya registrados de la ejecución, exactamente una vez por referencia, en el
//! momento de someter el step que la consume (nunca antes).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Puntero simbólico al output declarado de otro step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub source_step_id: String,
    pub output_name: String,
}

impl ArtifactRef {
    pub fn new(source_step_id: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self { source_step_id: source_step_id.into(),
               output_name: output_name.into() }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source_step_id, self.output_name)
    }
}

/// Input de un step: o un valor literal (una ubicación de almacenamiento
/// opaca) o una referencia diferida a un output de otro step.
///
/// Variante etiquetada explícita; la resolución es una función pura
/// `(outputs_registrados, referencia) -> valor | error`, sin proxies ni
/// evaluación perezosa implícita.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepInput {
    Literal(String),
    Reference(ArtifactRef),
}

impl StepInput {
    pub fn literal(value: impl Into<String>) -> Self {
        StepInput::Literal(value.into())
    }

    pub fn reference(source_step_id: impl Into<String>, output_name: impl Into<String>) -> Self {
        StepInput::Reference(ArtifactRef::new(source_step_id, output_name))
    }

    /// La referencia contenida, si este input es diferido.
    pub fn as_reference(&self) -> Option<&ArtifactRef> {
        match self {
            StepInput::Reference(r) => Some(r),
            StepInput::Literal(_) => None,
        }
    }
}
