use serde::{Deserialize, Serialize};

/// Estado de un Step en tiempo de ejecución.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Running`
/// - `Pending` -> `Skipped` (un upstream falló; el step nunca se somete)
/// - `Running` -> `Succeeded`
/// - `Running` -> `Failed`
///
/// No se permiten reversiones o saltos arbitrarios entre estados. Los
/// outputs de un step son desconocidos hasta `Succeeded`; leerlos antes es
/// ilegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// El paso está pendiente de ejecución.
    Pending,
    /// El paso está en ejecución en el backend.
    Running,
    /// El paso finalizó correctamente y sus outputs están registrados.
    Succeeded,
    /// El paso falló (incluye deadlines excedidos).
    Failed,
    /// El paso nunca se sometió porque un upstream falló.
    Skipped,
}

impl StepStatus {
    /// Estados que no admiten más transiciones.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped)
    }
}
