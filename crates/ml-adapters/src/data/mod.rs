//! Tablas CSV mínimas para los jobs locales.
//!
//! Los datasets que mueven los pipelines son CSV simples generados por los
//! propios jobs (sin quoting ni escapes); el parseo es por coma directa.
//! Los nombres de columna se normalizan (trim + minúsculas) al leer.

use std::fs;
use std::path::Path;

use ml_core::selector::Dataset;

use crate::error::AdapterError;

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns,
               rows: Vec::new() }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convierte la tabla en un `Dataset`: todas las columnas salvo `target`
    /// son features (en orden de header), `target` es el objetivo.
    pub fn to_dataset(&self, target: &str) -> Result<Dataset, AdapterError> {
        let target_index = self.column_index(target)
                               .ok_or_else(|| AdapterError::MissingColumn(target.to_string()))?;
        let mut features = Vec::with_capacity(self.rows.len());
        let mut targets = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut feats = Vec::with_capacity(self.columns.len() - 1);
            for (i, cell) in row.iter().enumerate() {
                let value: f64 = cell.parse()
                                     .map_err(|_| AdapterError::Malformed(format!("non-numeric cell '{cell}'")))?;
                if i == target_index {
                    targets.push(value);
                } else {
                    feats.push(value);
                }
            }
            features.push(feats);
        }
        Ok(Dataset { features, targets })
    }

    /// Matriz de features sin objetivo: toda columna es numérica, excepto
    /// `drop` si está presente (simula inferencia real sobre datos que aún
    /// traen el objetivo).
    pub fn to_features(&self, drop: &str) -> Result<Vec<Vec<f64>>, AdapterError> {
        let drop_index = self.column_index(drop);
        let mut features = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut feats = Vec::with_capacity(self.columns.len());
            for (i, cell) in row.iter().enumerate() {
                if Some(i) == drop_index {
                    continue;
                }
                let value: f64 = cell.parse()
                                     .map_err(|_| AdapterError::Malformed(format!("non-numeric cell '{cell}'")))?;
                feats.push(value);
            }
            features.push(feats);
        }
        Ok(features)
    }
}

pub fn read_table(path: &Path) -> Result<Table, AdapterError> {
    let raw = fs::read_to_string(path)?;
    let mut lines = raw.lines();
    let header = lines.next()
                      .ok_or_else(|| AdapterError::Malformed(format!("empty file {}", path.display())))?;
    let columns: Vec<String> = header.split(',')
                                     .map(|c| c.trim().to_lowercase())
                                     .collect();
    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<String> = line.split(',').map(|c| c.trim().to_string()).collect();
        if cells.len() != columns.len() {
            return Err(AdapterError::Malformed(format!("row with {} cells, expected {}",
                                                       cells.len(),
                                                       columns.len())));
        }
        rows.push(cells);
    }
    Ok(Table { columns, rows })
}

pub fn write_table(path: &Path, table: &Table) -> Result<(), AdapterError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = String::new();
    out.push_str(&table.columns.join(","));
    out.push('\n');
    for row in &table.rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_dataset_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = Table { columns: vec!["a".into(), "y".into()],
                            rows: vec![vec!["1.5".into(), "3.0".into()],
                                       vec!["2.5".into(), "5.0".into()]] };
        write_table(&path, &table).unwrap();
        let back = read_table(&path).unwrap();
        assert_eq!(back.columns, table.columns);
        assert_eq!(back.rows, table.rows);

        let ds = back.to_dataset("y").unwrap();
        assert_eq!(ds.features, vec![vec![1.5], vec![2.5]]);
        assert_eq!(ds.targets, vec![3.0, 5.0]);
    }

    #[test]
    fn missing_target_column_is_reported() {
        let table = Table { columns: vec!["a".into()],
                            rows: vec![] };
        assert!(matches!(table.to_dataset("y"), Err(AdapterError::MissingColumn(_))));
    }
}
