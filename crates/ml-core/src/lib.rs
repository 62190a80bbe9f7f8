//! ml-core: núcleo de ejecución de pipelines de datos
//!
//! Grafo dirigido y acíclico de steps (Process, Train, Transform), con
//! referencias diferidas a outputs que todavía no existen, motor de
//! ejecución con re-sometimiento idempotente y propagación de fallos, y
//! selección automática de modelo dentro del step Train.
pub mod backend;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod graph;
pub mod hashing;
pub mod model;
pub mod repo;
pub mod selector;
pub mod step;

pub use backend::{JobBackend, JobHandle, JobState};
pub use engine::{CancelToken, EngineConfig, ExecutionEngine};
pub use errors::PipelineError;
pub use event::{EventStore, ExecutionEvent, ExecutionEventKind, InMemoryEventStore, SkipCause};
pub use graph::PipelineGraph;
pub use model::{ArtifactRef, Execution, ExecutionOutcome, StepInput, StepSlot};
pub use repo::{InMemoryPipelineRepository, PipelineRepository, StoredPipeline};
pub use step::{Step, StepKind, StepStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use serde_json::json;

    /// Backend trivial: todo job termina en el primer poll produciendo una
    /// ubicación `<step>/<output>` por output declarado en el config.
    #[derive(Debug, Default)]
    struct EchoBackend {
        next_id: u64,
        declared: BTreeMap<u64, Vec<String>>,
    }

    impl JobBackend for EchoBackend {
        fn submit(&mut self,
                  _kind: StepKind,
                  step_id: &str,
                  _inputs: &BTreeMap<String, String>,
                  backend_config: &serde_json::Value)
                  -> Result<JobHandle, PipelineError> {
            let outputs: Vec<String> = backend_config["outputs"]
                .as_array()
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            let job_id = self.next_id;
            self.next_id += 1;
            self.declared.insert(job_id, outputs);
            Ok(JobHandle { job_id,
                           step_id: step_id.to_string() })
        }

        fn poll(&mut self, handle: &JobHandle) -> Result<JobState, PipelineError> {
            let outputs = self.declared[&handle.job_id]
                .iter()
                .map(|o| (o.clone(), format!("{}/{}", handle.step_id, o)))
                .collect();
            Ok(JobState::Succeeded { outputs })
        }
    }

    fn echo_step(id: &str, kind: StepKind, outputs: &[&str]) -> Step {
        let mut step = Step::new(id, kind).with_backend_config(json!({ "outputs": outputs }));
        for o in outputs {
            step = step.with_output(*o);
        }
        step
    }

    #[test]
    fn linear_pipeline_resolves_references_in_order() {
        let mut graph = PipelineGraph::new("smoke");
        graph.add_step(echo_step("process", StepKind::Process, &["train", "test"])).unwrap();
        graph.add_step(echo_step("train_model", StepKind::Train, &["model"])
                           .with_input("train", StepInput::reference("process", "train"))
                           .with_input("test", StepInput::reference("process", "test")))
             .unwrap();

        let mut engine =
            ExecutionEngine::new(InMemoryEventStore::default(), EchoBackend::default(), EngineConfig::default());
        let execution = engine.run(&graph).unwrap();

        assert_eq!(execution.outcome, ExecutionOutcome::Succeeded);
        assert_eq!(execution.status_of("process"), Some(StepStatus::Succeeded));
        assert_eq!(execution.output_of("process", "train"), Some("process/train"));
        assert_eq!(execution.output_of("train_model", "model"), Some("train_model/model"));
    }

    #[test]
    fn rerun_creates_independent_executions() {
        let mut graph = PipelineGraph::new("rerun");
        graph.add_step(echo_step("only", StepKind::Process, &["out"])).unwrap();

        let mut repo = InMemoryPipelineRepository::new();
        let first = repo.upsert(&graph).unwrap();
        let second = repo.upsert(&graph).unwrap();
        assert_eq!(first.revision, second.revision);
        assert_eq!(first.definition_hash, second.definition_hash);

        let mut engine =
            ExecutionEngine::new(InMemoryEventStore::default(), EchoBackend::default(), EngineConfig::default());
        let a = engine.run(&graph).unwrap();
        let b = engine.run(&graph).unwrap();
        assert_ne!(a.execution_id, b.execution_id);
        assert_eq!(a.resolved_outputs(), b.resolved_outputs());
    }
}
