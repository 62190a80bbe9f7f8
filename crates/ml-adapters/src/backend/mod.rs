//! Backend local de jobs: ejecuta cada step in-process sobre el filesystem.
//!
//! Respeta el contrato del core al pie de la letra: `submit` no ejecuta
//! nada, sólo encola el job y devuelve un handle; el trabajo real ocurre en
//! el primer `poll`, que devuelve directamente el estado terminal. Las
//! ubicaciones de entrada/salida son rutas locales que el core trata como
//! strings opacos.

use std::collections::{BTreeMap, HashMap};

use ml_core::{JobBackend, JobHandle, JobState, PipelineError, StepKind};
use serde_json::Value;

use crate::steps::{run_process_job, run_train_job, run_transform_job};

enum LocalJob {
    Queued {
        kind: StepKind,
        inputs: BTreeMap<String, String>,
        config: Value,
    },
    /// Estado terminal ya observado; polls posteriores lo repiten.
    Done(JobState),
    Cancelled,
}

/// Backend que corre los jobs Process / Train / Transform en el proceso
/// actual. Dispatch cerrado por `StepKind`.
#[derive(Default)]
pub struct LocalJobBackend {
    next_id: u64,
    jobs: HashMap<u64, LocalJob>,
}

impl LocalJobBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobBackend for LocalJobBackend {
    fn submit(&mut self,
              kind: StepKind,
              step_id: &str,
              inputs: &BTreeMap<String, String>,
              backend_config: &Value)
              -> Result<JobHandle, PipelineError> {
        let job_id = self.next_id;
        self.next_id += 1;
        log::info!("local job {} queued: step '{}' ({:?}) entry_point={}",
                   job_id,
                   step_id,
                   kind,
                   backend_config["entry_point"].as_str().unwrap_or("-"));
        self.jobs.insert(job_id,
                         LocalJob::Queued { kind,
                                            inputs: inputs.clone(),
                                            config: backend_config.clone() });
        Ok(JobHandle { job_id,
                       step_id: step_id.to_string() })
    }

    fn poll(&mut self, handle: &JobHandle) -> Result<JobState, PipelineError> {
        let job = self.jobs
                      .get_mut(&handle.job_id)
                      .ok_or_else(|| PipelineError::Internal(format!("unknown job handle {}", handle.job_id)))?;
        match job {
            LocalJob::Done(state) => Ok(state.clone()),
            LocalJob::Cancelled => Ok(JobState::Failed { reason: "job cancelled".into() }),
            LocalJob::Queued { kind, inputs, config } => {
                let result = match kind {
                    StepKind::Process => run_process_job(inputs, config),
                    StepKind::Train => run_train_job(inputs, config),
                    StepKind::Transform => run_transform_job(inputs, config),
                };
                let state = match result {
                    Ok(outputs) => JobState::Succeeded { outputs },
                    Err(e) => {
                        log::warn!("local job {} (step '{}') failed: {}", handle.job_id, handle.step_id, e);
                        JobState::Failed { reason: e.to_string() }
                    }
                };
                *job = LocalJob::Done(state.clone());
                Ok(state)
            }
        }
    }

    fn cancel(&mut self, handle: &JobHandle) {
        if let Some(job @ LocalJob::Queued { .. }) = self.jobs.get_mut(&handle.job_id) {
            log::info!("local job {} cancelled before running", handle.job_id);
            *job = LocalJob::Cancelled;
        }
    }
}
