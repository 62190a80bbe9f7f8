//! Core ExecutionEngine implementation

use std::collections::BTreeMap;
use std::time::Instant;

use uuid::Uuid;

use crate::backend::{JobBackend, JobHandle, JobState};
use crate::engine::{CancelToken, EngineConfig};
use crate::errors::PipelineError;
use crate::event::{EventStore, ExecutionEvent, ExecutionEventKind, SkipCause};
use crate::graph::PipelineGraph;
use crate::model::{Execution, ExecutionOutcome};
use crate::step::{Step, StepStatus};

/// Motor de ejecución de grafos de pipeline.
///
/// Recorre el grafo tratando el orden topológico como orden parcial: somete
/// al backend todo step cuyas dependencias ya terminaron con éxito y
/// multiplexa el sondeo de los jobs en vuelo desde un único hilo. Steps sin
/// relación de dependencia corren así concurrentemente del lado del backend
/// sin pool local.
#[derive(Debug)]
pub struct ExecutionEngine<E, B>
    where E: EventStore,
          B: JobBackend
{
    event_store: E,
    backend: B,
    config: EngineConfig,
}

/// Job sometido cuyo estado terminal todavía no se observó.
struct InFlight {
    index: usize,
    handle: JobHandle,
    deadline: Option<Instant>,
}

impl<E, B> ExecutionEngine<E, B>
    where E: EventStore,
          B: JobBackend
{
    pub fn new(event_store: E, backend: B, config: EngineConfig) -> Self {
        Self { event_store,
               backend,
               config }
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn events_for(&self, execution_id: Uuid) -> Vec<ExecutionEvent> {
        self.event_store.list(execution_id)
    }

    /// Ejecuta el grafo completo y devuelve la `Execution` resultante.
    ///
    /// Errores estructurales (`validate()`) se devuelven como `Err` sin
    /// someter ningún step. Los fallos de runtime no son `Err`: quedan
    /// atribuidos al step que falló dentro de la `Execution` devuelta.
    pub fn run(&mut self, graph: &PipelineGraph) -> Result<Execution, PipelineError> {
        self.run_with_cancel(graph, &CancelToken::new())
    }

    /// Variante con token de cancelación observado entre rondas de sondeo.
    pub fn run_with_cancel(&mut self,
                           graph: &PipelineGraph,
                           cancel: &CancelToken)
                           -> Result<Execution, PipelineError> {
        graph.validate()?;
        let order = graph.topological_order()?;
        let deps = graph.dependency_indices();

        let execution_id = Uuid::new_v4();
        let step_ids: Vec<String> = graph.steps().iter().map(|s| s.id.clone()).collect();
        self.event_store
            .append_kind(execution_id,
                         ExecutionEventKind::ExecutionStarted { pipeline_name: graph.name.clone(),
                                                                definition_hash: graph.definition_hash(),
                                                                step_ids });

        let n = graph.len();
        let mut status = vec![StepStatus::Pending; n];
        let mut resolved: BTreeMap<(String, String), String> = BTreeMap::new();
        let mut in_flight: Vec<InFlight> = Vec::new();
        // Primer step fallido; una vez fijado no se someten steps nuevos.
        let mut first_failed: Option<usize> = None;
        let mut cancelled = false;

        loop {
            let mut submitted = false;
            if first_failed.is_none() && !cancelled {
                for &i in &order {
                    if status[i] != StepStatus::Pending {
                        continue;
                    }
                    if !deps[i].iter().all(|&d| status[d] == StepStatus::Succeeded) {
                        continue;
                    }
                    submitted = true;
                    if let Err(failed_index) =
                        self.submit_step(execution_id, graph, i, &resolved, &mut status, &mut in_flight)
                    {
                        first_failed = Some(failed_index);
                        break;
                    }
                }
            }

            if cancel.is_cancelled() && !cancelled {
                cancelled = true;
                for fl in &in_flight {
                    self.backend.cancel(&fl.handle);
                }
            }

            let mut progressed = false;
            let mut still_running: Vec<InFlight> = Vec::new();
            for fl in std::mem::take(&mut in_flight) {
                let step = &graph.steps()[fl.index];
                match self.backend.poll(&fl.handle) {
                    Ok(JobState::Running) => {
                        if cancelled {
                            // Tras pedir cancelación el job se da por perdido.
                            self.fail_step(execution_id, fl.index, step,
                                           PipelineError::BackendFailure("cancelled by caller".into()),
                                           &mut status, &mut first_failed);
                            progressed = true;
                        } else if fl.deadline.is_some_and(|d| Instant::now() >= d) {
                            self.backend.cancel(&fl.handle);
                            self.fail_step(execution_id, fl.index, step,
                                           PipelineError::BackendFailure(format!(
                                               "step '{}' exceeded its deadline", step.id)),
                                           &mut status, &mut first_failed);
                            progressed = true;
                        } else {
                            still_running.push(fl);
                        }
                    }
                    Ok(JobState::Succeeded { outputs }) => {
                        progressed = true;
                        match step.outputs.iter().find(|o| !outputs.contains_key(o.as_str())) {
                            Some(missing) => {
                                self.fail_step(execution_id, fl.index, step,
                                               PipelineError::ContractViolation { step_id: step.id.clone(),
                                                                                  output_name: missing.clone() },
                                               &mut status, &mut first_failed);
                            }
                            None => {
                                // Escritura única: cada step escribe sólo sus
                                // propios outputs declarados, exactamente una vez.
                                let mut recorded = BTreeMap::new();
                                for name in &step.outputs {
                                    let location = outputs[name.as_str()].clone();
                                    resolved.entry((step.id.clone(), name.clone()))
                                            .or_insert_with(|| location.clone());
                                    recorded.insert(name.clone(), location);
                                }
                                status[fl.index] = StepStatus::Succeeded;
                                self.event_store
                                    .append_kind(execution_id,
                                                 ExecutionEventKind::StepSucceeded { step_index: fl.index,
                                                                                     step_id: step.id.clone(),
                                                                                     outputs: recorded });
                            }
                        }
                    }
                    Ok(JobState::Failed { reason }) => {
                        progressed = true;
                        self.fail_step(execution_id, fl.index, step,
                                       PipelineError::BackendFailure(reason),
                                       &mut status, &mut first_failed);
                    }
                    Err(e) => {
                        progressed = true;
                        self.fail_step(execution_id, fl.index, step, e, &mut status, &mut first_failed);
                    }
                }
            }
            in_flight = still_running;

            // Al detenerse la ejecución, todo step que nunca arrancó queda
            // Skipped; los jobs en vuelo se drenan hasta estado terminal.
            // Los dependientes transitivos del fallido se distinguen de los
            // steps ajenos que simplemente ya no se sometieron.
            if first_failed.is_some() || cancelled {
                let downstream = first_failed.map(|idx| graph.transitive_dependents(idx))
                                             .unwrap_or_default();
                for i in 0..n {
                    if status[i] != StepStatus::Pending {
                        continue;
                    }
                    status[i] = StepStatus::Skipped;
                    let cause = if cancelled {
                        SkipCause::Cancelled
                    } else {
                        let idx = first_failed.expect("halted without failure or cancellation");
                        let failed_id = graph.steps()[idx].id.clone();
                        if downstream.contains(&i) {
                            SkipCause::UpstreamFailed { step_id: failed_id }
                        } else {
                            SkipCause::ExecutionHalted { failed_step_id: failed_id }
                        }
                    };
                    self.event_store
                        .append_kind(execution_id,
                                     ExecutionEventKind::StepSkipped { step_index: i,
                                                                       step_id: graph.steps()[i].id.clone(),
                                                                       cause });
                }
            }

            if in_flight.is_empty() && status.iter().all(|s| s.is_terminal()) {
                break;
            }
            if !submitted && !progressed {
                std::thread::sleep(self.config.poll_interval);
            }
        }

        let outcome = if cancelled {
            ExecutionOutcome::Cancelled
        } else if status.iter().any(|s| *s == StepStatus::Failed) {
            ExecutionOutcome::Failed
        } else {
            ExecutionOutcome::Succeeded
        };
        self.event_store
            .append_kind(execution_id, ExecutionEventKind::ExecutionFinished { outcome });

        let events = self.event_store.list(execution_id);
        Execution::replay(&events)
            .ok_or_else(|| PipelineError::Internal("event log replay failed".into()))
    }

    /// Resuelve inputs y somete un step. Devuelve `Err(index)` si el step
    /// quedó `Failed` en el intento.
    fn submit_step(&mut self,
                   execution_id: Uuid,
                   graph: &PipelineGraph,
                   index: usize,
                   resolved: &BTreeMap<(String, String), String>,
                   status: &mut [StepStatus],
                   in_flight: &mut Vec<InFlight>)
                   -> Result<(), usize> {
        let step = &graph.steps()[index];
        let inputs = match resolve_inputs(step, resolved) {
            Ok(inputs) => inputs,
            Err(e) => {
                let mut unused = None;
                self.fail_step(execution_id, index, step, e, status, &mut unused);
                return Err(index);
            }
        };

        match self.backend.submit(step.kind, &step.id, &inputs, &step.backend_config) {
            Ok(handle) => {
                status[index] = StepStatus::Running;
                self.event_store
                    .append_kind(execution_id,
                                 ExecutionEventKind::StepStarted { step_index: index,
                                                                   step_id: step.id.clone() });
                let timeout = step.timeout.or(self.config.default_step_timeout);
                in_flight.push(InFlight { index,
                                          handle,
                                          deadline: timeout.map(|t| Instant::now() + t) });
                Ok(())
            }
            Err(e) => {
                let mut unused = None;
                self.fail_step(execution_id, index, step, e, status, &mut unused);
                Err(index)
            }
        }
    }

    fn fail_step(&mut self,
                 execution_id: Uuid,
                 index: usize,
                 step: &Step,
                 error: PipelineError,
                 status: &mut [StepStatus],
                 first_failed: &mut Option<usize>) {
        status[index] = StepStatus::Failed;
        if first_failed.is_none() {
            *first_failed = Some(index);
        }
        self.event_store
            .append_kind(execution_id,
                         ExecutionEventKind::StepFailed { step_index: index,
                                                          step_id: step.id.clone(),
                                                          error });
    }
}

/// Resolución pura de referencias: `(outputs_registrados, step) -> inputs
/// concretos`. Se invoca exactamente una vez por step, justo antes de
/// someterlo; un lookup fallido es una invariante rota del engine (el orden
/// topológico garantiza que el upstream ya corrió), no un error de usuario.
fn resolve_inputs(step: &Step,
                  resolved: &BTreeMap<(String, String), String>)
                  -> Result<BTreeMap<String, String>, PipelineError> {
    let mut out = BTreeMap::new();
    for (name, input) in &step.inputs {
        let value = match input {
            crate::model::StepInput::Literal(v) => v.clone(),
            crate::model::StepInput::Reference(r) => {
                resolved.get(&(r.source_step_id.clone(), r.output_name.clone()))
                        .cloned()
                        .ok_or_else(|| PipelineError::UnresolvedDependency {
                            step_id: step.id.clone(),
                            source_step_id: r.source_step_id.clone(),
                            output_name: r.output_name.clone(),
                        })?
            }
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}
