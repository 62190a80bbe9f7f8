//! Modelos neutrales (StepInput, ArtifactRef, Execution,...)

pub mod execution;
pub mod reference;

pub use execution::{Execution, ExecutionOutcome, StepSlot};
pub use reference::{ArtifactRef, StepInput};
