//! Grafo de pipeline: steps en orden de declaración más las aristas de
//! dependencia derivadas de sus referencias.
//!
//! Existe una arista `A -> B` cuando algún input de B es una referencia cuyo
//! `source_step_id == A.id`. El grafo valida la relación derivada (acíclica,
//! referencias conocidas) y computa un orden topológico determinista: ante
//! empates gana el orden de declaración, de modo que re-ejecutar un grafo
//! sin cambios somete los steps en la misma secuencia.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::constants::CORE_VERSION;
use crate::errors::PipelineError;
use crate::hashing::hash_value;
use crate::step::Step;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineGraph {
    pub name: String,
    steps: Vec<Step>,
}

impl PipelineGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               steps: Vec::new() }
    }

    /// Agrega un step al final; falla si el id ya existe en el grafo.
    pub fn add_step(&mut self, step: Step) -> Result<(), PipelineError> {
        if self.steps.iter().any(|s| s.id == step.id) {
            return Err(PipelineError::DuplicateStepId(step.id));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Steps en orden de declaración (no necesariamente de ejecución).
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Valida la estructura del grafo: ids únicos, referencias conocidas y
    /// relación de dependencias acíclica. Ningún error de esta fase llega a
    /// una ejecución.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for s in &self.steps {
            if !seen.insert(s.id.as_str()) {
                return Err(PipelineError::DuplicateStepId(s.id.clone()));
            }
        }
        for s in &self.steps {
            for r in s.references() {
                if self.index_of(&r.source_step_id).is_none() {
                    return Err(PipelineError::UnknownReference { source_step_id: r.source_step_id.clone(),
                                                                 output_name: r.output_name.clone() });
                }
            }
        }
        self.topological_order().map(|_| ())
    }

    /// Dependencias directas (índices) de cada step, derivadas de sus
    /// referencias. Referencias a ids desconocidos se ignoran aquí; las
    /// reporta `validate()`.
    pub fn dependency_indices(&self) -> Vec<BTreeSet<usize>> {
        let by_id: HashMap<&str, usize> = self.steps
                                              .iter()
                                              .enumerate()
                                              .map(|(i, s)| (s.id.as_str(), i))
                                              .collect();
        self.steps
            .iter()
            .map(|s| {
                s.references()
                 .filter_map(|r| by_id.get(r.source_step_id.as_str()).copied())
                 .collect()
            })
            .collect()
    }

    /// Orden topológico determinista sobre índices de declaración.
    ///
    /// Kahn con ready-set ordenado: entre steps listos siempre sale primero
    /// el de menor índice de declaración (sort estable respecto del orden
    /// original). Falla con `CyclicDependency` nombrando el primer step
    /// declarado que participa del ciclo.
    pub fn topological_order(&self) -> Result<Vec<usize>, PipelineError> {
        let deps = self.dependency_indices();
        let mut pending_deps: Vec<usize> = deps.iter().map(|d| d.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.steps.len()];
        for (i, d) in deps.iter().enumerate() {
            for &up in d {
                dependents[up].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = pending_deps.iter()
                                                     .enumerate()
                                                     .filter(|(_, &n)| n == 0)
                                                     .map(|(i, _)| i)
                                                     .collect();
        let mut order = Vec::with_capacity(self.steps.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for &down in &dependents[next] {
                pending_deps[down] -= 1;
                if pending_deps[down] == 0 {
                    ready.insert(down);
                }
            }
        }

        if order.len() < self.steps.len() {
            let in_cycle = (0..self.steps.len()).find(|i| !order.contains(i))
                                                .expect("unprocessed step exists");
            return Err(PipelineError::CyclicDependency(self.steps[in_cycle].id.clone()));
        }
        Ok(order)
    }

    /// Todos los steps alcanzables desde `index` siguiendo aristas de
    /// dependencia hacia abajo (los que directa o transitivamente consumen
    /// sus outputs).
    pub fn transitive_dependents(&self, index: usize) -> BTreeSet<usize> {
        let deps = self.dependency_indices();
        let mut result = BTreeSet::new();
        let mut frontier = vec![index];
        while let Some(current) = frontier.pop() {
            for (i, d) in deps.iter().enumerate() {
                if d.contains(&current) && result.insert(i) {
                    frontier.push(i);
                }
            }
        }
        result
    }

    /// Hash estable de la definición (forma canónica del grafo más la
    /// versión del motor). Base de la semántica de upsert: mismo nombre y
    /// mismo hash significa "ya definido, no duplicar".
    pub fn definition_hash(&self) -> String {
        let value = json!({
            "core_version": CORE_VERSION,
            "definition": serde_json::to_value(self).expect("serialize pipeline graph"),
        });
        hash_value(&value)
    }
}
