//! Ejecución end-to-end del engine contra un backend guionado.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use ml_core::{CancelToken, EngineConfig, ExecutionEngine, ExecutionOutcome, InMemoryEventStore,
              JobBackend, JobHandle, JobState, PipelineError, PipelineGraph, SkipCause, Step,
              StepInput, StepKind, StepStatus};
use ml_core::event::ExecutionEventKind;
use ml_core::model::Execution;

/// Comportamiento programado por step.
#[derive(Debug, Clone)]
enum Plan {
    Succeed(BTreeMap<String, String>),
    Fail(String),
    /// Nunca termina por sí solo (para deadlines y cancelación).
    Hang,
}

#[derive(Debug, Default)]
struct ScriptedBackend {
    next_id: u64,
    plans: HashMap<String, Plan>,
    job_step: HashMap<u64, String>,
    submitted: Vec<String>,
    seen_inputs: HashMap<String, BTreeMap<String, String>>,
    cancelled: Vec<String>,
}

impl ScriptedBackend {
    fn plan(mut self, step_id: &str, plan: Plan) -> Self {
        self.plans.insert(step_id.to_string(), plan);
        self
    }
}

fn outputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl JobBackend for ScriptedBackend {
    fn submit(&mut self,
              _kind: StepKind,
              step_id: &str,
              inputs: &BTreeMap<String, String>,
              _backend_config: &serde_json::Value)
              -> Result<JobHandle, PipelineError> {
        let job_id = self.next_id;
        self.next_id += 1;
        self.job_step.insert(job_id, step_id.to_string());
        self.submitted.push(step_id.to_string());
        self.seen_inputs.insert(step_id.to_string(), inputs.clone());
        Ok(JobHandle { job_id,
                       step_id: step_id.to_string() })
    }

    fn poll(&mut self, handle: &JobHandle) -> Result<JobState, PipelineError> {
        let step_id = &self.job_step[&handle.job_id];
        match self.plans.get(step_id) {
            Some(Plan::Succeed(outputs)) => Ok(JobState::Succeeded { outputs: outputs.clone() }),
            Some(Plan::Fail(reason)) => Ok(JobState::Failed { reason: reason.clone() }),
            Some(Plan::Hang) => Ok(JobState::Running),
            None => Ok(JobState::Succeeded { outputs: BTreeMap::new() }),
        }
    }

    fn cancel(&mut self, handle: &JobHandle) {
        self.cancelled.push(handle.step_id.clone());
    }
}

fn fast_config() -> EngineConfig {
    EngineConfig { poll_interval: Duration::from_millis(1),
                   default_step_timeout: None }
}

/// Process -> Train -> Transform, cableado como los pipelines reales.
fn three_step_graph() -> PipelineGraph {
    let mut graph = PipelineGraph::new("nyc-taxi-duration-training-pipeline");
    graph.add_step(Step::new("Preprocess", StepKind::Process).with_output("train")
                                                             .with_output("test"))
         .unwrap();
    graph.add_step(Step::new("TrainModel", StepKind::Train)
                       .with_input("train", StepInput::reference("Preprocess", "train"))
                       .with_input("test", StepInput::reference("Preprocess", "test"))
                       .with_output("model"))
         .unwrap();
    graph.add_step(Step::new("BatchInference", StepKind::Transform)
                       .with_input("model", StepInput::reference("TrainModel", "model"))
                       .with_input("data", StepInput::literal("s3://bucket/data/inference/"))
                       .with_output("predictions"))
         .unwrap();
    graph
}

fn run(backend: ScriptedBackend, graph: &PipelineGraph) -> (Execution, ScriptedBackend) {
    let mut engine = ExecutionEngine::new(InMemoryEventStore::default(), backend, fast_config());
    let execution = engine.run(graph).expect("structural errors not expected");
    // El backend vuelve para inspección de lo efectivamente sometido.
    let engine_events = engine.events_for(execution.execution_id);
    assert!(!engine_events.is_empty());
    let replayed = Execution::replay(&engine_events).unwrap();
    assert_eq!(replayed.outcome, execution.outcome);
    (execution, into_backend(engine))
}

fn into_backend(engine: ExecutionEngine<InMemoryEventStore, ScriptedBackend>) -> ScriptedBackend {
    // Clonamos lo observable del backend vía su referencia compartida.
    let b = engine.backend();
    ScriptedBackend { next_id: b.next_id,
                      plans: b.plans.clone(),
                      job_step: b.job_step.clone(),
                      submitted: b.submitted.clone(),
                      seen_inputs: b.seen_inputs.clone(),
                      cancelled: b.cancelled.clone() }
}

#[test]
fn failure_skips_every_downstream_step() {
    let backend = ScriptedBackend::default().plan("Preprocess", Plan::Fail("container exited 1".into()));
    let (execution, backend) = run(backend, &three_step_graph());

    assert_eq!(execution.outcome, ExecutionOutcome::Failed);
    assert_eq!(execution.status_of("Preprocess"), Some(StepStatus::Failed));
    assert_eq!(execution.status_of("TrainModel"), Some(StepStatus::Skipped));
    assert_eq!(execution.status_of("BatchInference"), Some(StepStatus::Skipped));
    assert!(execution.resolved_outputs().is_empty());
    // Sólo el step fallido llegó al backend.
    assert_eq!(backend.submitted, vec!["Preprocess"]);

    let (failed_id, error) = execution.failed_step().unwrap();
    assert_eq!(failed_id, "Preprocess");
    assert!(matches!(error, PipelineError::BackendFailure(_)));
}

#[test]
fn references_resolve_to_exact_upstream_locations() {
    let mut graph = PipelineGraph::new("nyc-taxi-duration-inference-pipeline");
    graph.add_step(Step::new("InferencePreprocess", StepKind::Process).with_output("inference_data"))
         .unwrap();
    graph.add_step(Step::new("BatchInference", StepKind::Transform)
                       .with_input("data", StepInput::reference("InferencePreprocess", "inference_data"))
                       .with_input("model", StepInput::literal("s3://bucket/models/model.json"))
                       .with_output("predictions"))
         .unwrap();

    let backend = ScriptedBackend::default()
        .plan("InferencePreprocess",
              Plan::Succeed(outputs(&[("inference_data", "s3://bucket/out/")])))
        .plan("BatchInference", Plan::Succeed(outputs(&[("predictions", "s3://bucket/predictions/")])));
    let (execution, backend) = run(backend, &graph);

    assert_eq!(execution.outcome, ExecutionOutcome::Succeeded);
    // La referencia llegó al backend ya sustituida por la ubicación concreta.
    let seen = &backend.seen_inputs["BatchInference"];
    assert_eq!(seen["data"], "s3://bucket/out/");
    assert_eq!(seen["model"], "s3://bucket/models/model.json");
}

#[test]
fn missing_declared_output_is_a_contract_violation() {
    let backend = ScriptedBackend::default()
        // Promete train y test pero sólo produce train.
        .plan("Preprocess", Plan::Succeed(outputs(&[("train", "s3://bucket/train/")])));
    let (execution, _) = run(backend, &three_step_graph());

    assert_eq!(execution.outcome, ExecutionOutcome::Failed);
    assert_eq!(execution.status_of("Preprocess"), Some(StepStatus::Failed));
    assert_eq!(execution.status_of("TrainModel"), Some(StepStatus::Skipped));
    let (_, error) = execution.failed_step().unwrap();
    assert_eq!(*error,
               PipelineError::ContractViolation { step_id: "Preprocess".into(),
                                                  output_name: "test".into() });
    // El output parcial no se publica.
    assert!(execution.resolved_outputs().is_empty());
}

#[test]
fn deadline_becomes_ordinary_failure_and_sibling_still_succeeds() {
    // Dos raíces independientes; la lenta excede su deadline, la rápida no.
    let mut graph = PipelineGraph::new("parallel");
    graph.add_step(Step::new("slow", StepKind::Process).with_output("out")
                                                       .with_timeout(Duration::from_millis(5)))
         .unwrap();
    graph.add_step(Step::new("fast", StepKind::Process).with_output("out")).unwrap();
    graph.add_step(Step::new("after_slow", StepKind::Transform)
                       .with_input("in", StepInput::reference("slow", "out"))
                       .with_output("out"))
         .unwrap();

    let backend = ScriptedBackend::default()
        .plan("slow", Plan::Hang)
        .plan("fast", Plan::Succeed(outputs(&[("out", "s3://bucket/fast/")])));
    let (execution, backend) = run(backend, &graph);

    assert_eq!(execution.outcome, ExecutionOutcome::Failed);
    assert_eq!(execution.status_of("slow"), Some(StepStatus::Failed));
    assert_eq!(execution.status_of("fast"), Some(StepStatus::Succeeded));
    assert_eq!(execution.status_of("after_slow"), Some(StepStatus::Skipped));
    // La rama hermana conserva su artifact.
    assert_eq!(execution.output_of("fast", "out"), Some("s3://bucket/fast/"));
    // El backend recibió el intento de cancelación del job vencido.
    assert!(backend.cancelled.contains(&"slow".to_string()));
}

#[test]
fn cancellation_stops_submissions_and_skips_pending_steps() {
    let backend = ScriptedBackend::default().plan("Preprocess", Plan::Hang);
    let graph = three_step_graph();
    let mut engine = ExecutionEngine::new(InMemoryEventStore::default(), backend, fast_config());

    let token = CancelToken::new();
    token.cancel();
    let execution = engine.run_with_cancel(&graph, &token).unwrap();

    assert_eq!(execution.outcome, ExecutionOutcome::Cancelled);
    assert_eq!(execution.status_of("Preprocess"), Some(StepStatus::Failed));
    assert_eq!(execution.status_of("TrainModel"), Some(StepStatus::Skipped));
    assert_eq!(execution.status_of("BatchInference"), Some(StepStatus::Skipped));
    assert!(execution.resolved_outputs().is_empty());
    assert!(engine.backend().cancelled.contains(&"Preprocess".to_string()));
}

#[test]
fn diamond_branch_failure_leaves_completed_sibling_artifacts() {
    // a -> {b, c}; d depende de b y c. b falla, c termina en la misma ronda.
    let mut graph = PipelineGraph::new("diamond");
    graph.add_step(Step::new("a", StepKind::Process).with_output("out")).unwrap();
    graph.add_step(Step::new("b", StepKind::Process)
                       .with_input("in", StepInput::reference("a", "out"))
                       .with_output("out"))
         .unwrap();
    graph.add_step(Step::new("c", StepKind::Process)
                       .with_input("in", StepInput::reference("a", "out"))
                       .with_output("out"))
         .unwrap();
    graph.add_step(Step::new("d", StepKind::Transform)
                       .with_input("left", StepInput::reference("b", "out"))
                       .with_input("right", StepInput::reference("c", "out"))
                       .with_output("out"))
         .unwrap();

    let backend = ScriptedBackend::default()
        .plan("a", Plan::Succeed(outputs(&[("out", "loc://a")])))
        .plan("b", Plan::Fail("boom".into()))
        .plan("c", Plan::Succeed(outputs(&[("out", "loc://c")])));
    let (execution, _) = run(backend, &graph);

    assert_eq!(execution.outcome, ExecutionOutcome::Failed);
    assert_eq!(execution.status_of("b"), Some(StepStatus::Failed));
    assert_eq!(execution.status_of("c"), Some(StepStatus::Succeeded));
    assert_eq!(execution.status_of("d"), Some(StepStatus::Skipped));
    // Los artifacts ya producidos quedan en su lugar, sin rollback.
    assert_eq!(execution.output_of("a", "out"), Some("loc://a"));
    assert_eq!(execution.output_of("c", "out"), Some("loc://c"));
    // El skip queda atribuido al step cuyo fallo lo provocó.
    let d = execution.steps.iter().find(|s| s.step_id == "d").unwrap();
    assert_eq!(d.skipped_on.as_deref(), Some("b"));
}

#[test]
fn halting_distinguishes_downstream_skips_from_unsubmitted_siblings() {
    // a y b son raíces; c depende de a. b falla en la primera ronda, de modo
    // que c nunca se somete aunque su upstream terminó bien.
    let mut graph = PipelineGraph::new("halt");
    graph.add_step(Step::new("a", StepKind::Process).with_output("out")).unwrap();
    graph.add_step(Step::new("b", StepKind::Process).with_output("out")).unwrap();
    graph.add_step(Step::new("c", StepKind::Transform)
                       .with_input("in", StepInput::reference("a", "out"))
                       .with_output("out"))
         .unwrap();

    let backend = ScriptedBackend::default()
        .plan("a", Plan::Succeed(outputs(&[("out", "loc://a")])))
        .plan("b", Plan::Fail("boom".into()));
    let mut engine = ExecutionEngine::new(InMemoryEventStore::default(), backend, fast_config());
    let execution = engine.run(&graph).unwrap();

    assert_eq!(execution.status_of("a"), Some(StepStatus::Succeeded));
    assert_eq!(execution.status_of("b"), Some(StepStatus::Failed));
    assert_eq!(execution.status_of("c"), Some(StepStatus::Skipped));

    // c no depende de b: el evento lo registra como detención de la
    // ejecución, no como upstream fallido.
    let events = engine.events_for(execution.execution_id);
    let cause = events.iter()
                      .find_map(|e| match &e.kind {
                          ExecutionEventKind::StepSkipped { step_id, cause, .. } if step_id == "c" => {
                              Some(cause.clone())
                          }
                          _ => None,
                      })
                      .unwrap();
    assert_eq!(cause, SkipCause::ExecutionHalted { failed_step_id: "b".into() });
}

#[test]
fn structural_errors_never_reach_the_backend() {
    let mut graph = PipelineGraph::new("invalid");
    graph.add_step(Step::new("x", StepKind::Process)
                       .with_input("in", StepInput::reference("missing", "out"))
                       .with_output("out"))
         .unwrap();

    let mut engine = ExecutionEngine::new(InMemoryEventStore::default(),
                                          ScriptedBackend::default(),
                                          fast_config());
    let err = engine.run(&graph).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownReference { .. }));
    assert!(engine.backend().submitted.is_empty());
}
