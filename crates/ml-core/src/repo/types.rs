//! Repositorio de definiciones de pipeline con semántica de upsert.
//!
//! Definir un pipeline y arrancar una ejecución son actos separados: el
//! upsert registra (o actualiza) la definición nombrada sin duplicarla, y el
//! engine crea ejecuciones independientes contra esa definición. Repetir
//! `upsert` + `run` con un grafo sin cambios es seguro: misma revisión, dos
//! ejecuciones.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PipelineError;
use crate::graph::PipelineGraph;

/// Registro almacenado de una definición nombrada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPipeline {
    pub name: String,
    /// Arranca en 1; sube sólo cuando cambia el `definition_hash`.
    pub revision: u32,
    pub definition_hash: String,
    /// Forma serializada del grafo, tal como se definió.
    pub definition: Value,
    pub updated_at: DateTime<Utc>,
}

pub trait PipelineRepository {
    /// Define-o-actualiza sin duplicar: con el mismo nombre y el mismo hash
    /// devuelve el registro existente; un hash distinto sube la revisión.
    /// Valida el grafo antes de almacenar nada.
    fn upsert(&mut self, graph: &PipelineGraph) -> Result<StoredPipeline, PipelineError>;

    fn get(&self, name: &str) -> Option<StoredPipeline>;
}

#[derive(Debug, Default)]
pub struct InMemoryPipelineRepository {
    pub inner: HashMap<String, StoredPipeline>,
}

impl InMemoryPipelineRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineRepository for InMemoryPipelineRepository {
    fn upsert(&mut self, graph: &PipelineGraph) -> Result<StoredPipeline, PipelineError> {
        graph.validate()?;
        let hash = graph.definition_hash();
        if let Some(existing) = self.inner.get(&graph.name) {
            if existing.definition_hash == hash {
                return Ok(existing.clone());
            }
        }
        let revision = self.inner.get(&graph.name).map(|s| s.revision + 1).unwrap_or(1);
        let stored = StoredPipeline { name: graph.name.clone(),
                                      revision,
                                      definition_hash: hash,
                                      definition: serde_json::to_value(graph)
                                          .map_err(|e| PipelineError::Internal(e.to_string()))?,
                                      updated_at: Utc::now() };
        self.inner.insert(graph.name.clone(), stored.clone());
        Ok(stored)
    }

    fn get(&self, name: &str) -> Option<StoredPipeline> {
        self.inner.get(name).cloned()
    }
}
