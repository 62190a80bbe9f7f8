//! Implementaciones sobre filesystem de `PipelineRepository` y `EventStore`.
//!
//! Layout bajo la raíz configurada:
//! - `pipelines/<nombre>.json`: documento `StoredPipeline` por pipeline.
//! - `executions/<execution_id>.jsonl`: una línea JSON por evento, en orden
//!   de append. El archivo nunca se reescribe.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use ml_core::{EventStore, ExecutionEvent, ExecutionEventKind, PipelineError, PipelineGraph,
              PipelineRepository, StoredPipeline};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::PersistenceError;

/// Nombre de archivo seguro a partir del nombre del pipeline.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Repositorio de definiciones: un JSON por nombre, upsert por hash.
#[derive(Debug)]
pub struct FsPipelineRepository {
    dir: PathBuf,
}

impl FsPipelineRepository {
    pub fn new(config: &StoreConfig) -> Result<Self, PersistenceError> {
        let dir = config.pipelines_dir();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    fn read(&self, name: &str) -> Result<Option<StoredPipeline>, PersistenceError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write(&self, stored: &StoredPipeline) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.name), json)?;
        Ok(())
    }
}

impl PipelineRepository for FsPipelineRepository {
    fn upsert(&mut self, graph: &PipelineGraph) -> Result<StoredPipeline, PipelineError> {
        graph.validate()?;
        let hash = graph.definition_hash();
        let existing = self.read(&graph.name).map_err(PipelineError::from)?;
        if let Some(stored) = &existing {
            if stored.definition_hash == hash {
                log::debug!("pipeline '{}' unchanged (rev {})", graph.name, stored.revision);
                return Ok(stored.clone());
            }
        }
        let revision = existing.map(|s| s.revision + 1).unwrap_or(1);
        let stored = StoredPipeline { name: graph.name.clone(),
                                      revision,
                                      definition_hash: hash,
                                      definition: serde_json::to_value(graph)
                                          .map_err(|e| PipelineError::Internal(e.to_string()))?,
                                      updated_at: Utc::now() };
        self.write(&stored).map_err(PipelineError::from)?;
        log::info!("pipeline '{}' stored at revision {}", stored.name, stored.revision);
        Ok(stored)
    }

    fn get(&self, name: &str) -> Option<StoredPipeline> {
        self.read(name).unwrap_or_else(|e| {
                           log::error!("reading stored pipeline '{}': {}", name, e);
                           None
                       })
    }
}

/// Event store append-only sobre JSON-lines, con espejo en memoria para
/// asignación de seq y lecturas de la ejecución en curso.
#[derive(Debug)]
pub struct FsEventStore {
    dir: PathBuf,
    cache: HashMap<Uuid, Vec<ExecutionEvent>>,
}

impl FsEventStore {
    pub fn new(config: &StoreConfig) -> Result<Self, PersistenceError> {
        let dir = config.executions_dir();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir,
                  cache: HashMap::new() })
    }

    fn path_for(&self, execution_id: Uuid) -> PathBuf {
        self.dir.join(format!("{execution_id}.jsonl"))
    }

    /// Eventos persistidos de una ejecución, leídos del archivo.
    pub fn load(&self, execution_id: Uuid) -> Result<Vec<ExecutionEvent>, PersistenceError> {
        let path = self.path_for(execution_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path)?;
        let mut events = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }

    fn append_line(&self, event: &ExecutionEvent) -> Result<(), PersistenceError> {
        let mut file = OpenOptions::new().create(true)
                                         .append(true)
                                         .open(self.path_for(event.execution_id))?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl EventStore for FsEventStore {
    fn append_kind(&mut self, execution_id: Uuid, kind: ExecutionEventKind) -> ExecutionEvent {
        let vec = self.cache.entry(execution_id).or_default();
        let event = ExecutionEvent { seq: vec.len() as u64,
                                     execution_id,
                                     kind,
                                     ts: Utc::now() };
        vec.push(event.clone());
        // El espejo en memoria sigue siendo la fuente durante la corrida; un
        // fallo de IO se reporta pero no aborta el bookkeeping del engine.
        if let Err(e) = self.append_line(&event) {
            log::error!("appending event seq {} for {}: {}", event.seq, execution_id, e);
        }
        event
    }

    fn list(&self, execution_id: Uuid) -> Vec<ExecutionEvent> {
        if let Some(events) = self.cache.get(&execution_id) {
            return events.clone();
        }
        self.load(execution_id).unwrap_or_else(|e| {
                                   log::error!("reading event log for {}: {}", execution_id, e);
                                   Vec::new()
                               })
    }
}
