//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad de trabajo con un kind declarado (Process, Train,
//! Transform), un mapa de inputs (literales o referencias a outputs de otros
//! steps) y un conjunto de outputs nombrados que promete producir. Este
//! módulo define:
//! - `Step`: la definición declarativa que entra al grafo.
//! - `StepKind`: conjunto cerrado de kinds (dispatch por variante, no
//!   herencia abierta).
//! - `StepStatus`: estado de runtime, vive en la `Execution`, no en el Step.

pub mod definition;
mod status;

pub use definition::{Step, StepKind};
pub use status::StepStatus;
