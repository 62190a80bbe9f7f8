//! Job Process: limpieza, features y split de viajes.
//!
//! Modo training: filtra filas inválidas, calcula la duración en minutos a
//! partir de pickup/dropoff, descarta viajes fuera de [1, 180] minutos y
//! escribe un split 80/20 determinista (`train`/`test`). Modo inference: el
//! mismo featurizado sin objetivo, un único output `inference_data`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use serde_json::Value;

use crate::data::{read_table, write_table, Table};
use crate::error::AdapterError;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn run_process_job(inputs: &BTreeMap<String, String>,
                       config: &Value)
                       -> Result<BTreeMap<String, String>, AdapterError> {
    let raw_location = inputs.get("raw")
                             .ok_or_else(|| AdapterError::MissingInput("raw".into()))?;
    let output_base = config["output_base"].as_str()
                                           .ok_or_else(|| AdapterError::Malformed("missing output_base".into()))?;
    let training = config["mode"].as_str().unwrap_or("training") == "training";

    let table = read_table(Path::new(raw_location))?;
    log::info!("process: {} raw rows from {}", table.len(), raw_location);
    let featured = featurize(&table, training)?;
    log::info!("process: {} rows after cleaning", featured.len());

    let mut outputs = BTreeMap::new();
    if training {
        let (train, test) = split(&featured);
        let train_path = PathBuf::from(output_base).join("train.csv");
        let test_path = PathBuf::from(output_base).join("test.csv");
        write_table(&train_path, &train)?;
        write_table(&test_path, &test)?;
        outputs.insert("train".to_string(), train_path.display().to_string());
        outputs.insert("test".to_string(), test_path.display().to_string());
    } else {
        let path = PathBuf::from(output_base).join("inference.csv");
        write_table(&path, &featured)?;
        outputs.insert("inference_data".to_string(), path.display().to_string());
    }
    Ok(outputs)
}

/// Limpieza + features. Filas con celdas no parseables se descartan en vez
/// de abortar el job.
fn featurize(table: &Table, with_target: bool) -> Result<Table, AdapterError> {
    let pickup = table.column_index("pickup_datetime")
                      .ok_or_else(|| AdapterError::MissingColumn("pickup_datetime".into()))?;
    let distance = table.column_index("trip_distance")
                        .ok_or_else(|| AdapterError::MissingColumn("trip_distance".into()))?;
    let passengers = table.column_index("passenger_count")
                          .ok_or_else(|| AdapterError::MissingColumn("passenger_count".into()))?;
    let dropoff = if with_target {
        Some(table.column_index("dropoff_datetime")
                  .ok_or_else(|| AdapterError::MissingColumn("dropoff_datetime".into()))?)
    } else {
        None
    };

    let mut columns = vec!["pickup_hour".to_string(),
                           "trip_distance".to_string(),
                           "passenger_count".to_string()];
    if with_target {
        columns.push("trip_duration".to_string());
    }
    let mut out = Table::new(columns);

    for row in &table.rows {
        let Ok(pickup_ts) = NaiveDateTime::parse_from_str(&row[pickup], DATETIME_FORMAT) else {
            continue;
        };
        let Ok(dist) = row[distance].parse::<f64>() else {
            continue;
        };
        let Ok(pax) = row[passengers].parse::<f64>() else {
            continue;
        };
        if dist <= 0.0 || pax <= 0.0 {
            continue;
        }

        let mut cells = vec![format!("{}", pickup_ts.hour()), format!("{dist}"), format!("{pax}")];
        if let Some(dropoff) = dropoff {
            let Ok(dropoff_ts) = NaiveDateTime::parse_from_str(&row[dropoff], DATETIME_FORMAT) else {
                continue;
            };
            let duration_min = (dropoff_ts - pickup_ts).num_seconds() as f64 / 60.0;
            if !(1.0..=180.0).contains(&duration_min) {
                continue;
            }
            cells.push(format!("{duration_min}"));
        }
        out.rows.push(cells);
    }
    Ok(out)
}

/// Split determinista 80/20 por posición de fila.
fn split(table: &Table) -> (Table, Table) {
    let mut train = Table::new(table.columns.clone());
    let mut test = Table::new(table.columns.clone());
    for (i, row) in table.rows.iter().enumerate() {
        if i % 5 == 4 {
            test.rows.push(row.clone());
        } else {
            train.rows.push(row.clone());
        }
    }
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table(rows: Vec<Vec<&str>>) -> Table {
        Table { columns: vec!["pickup_datetime".into(),
                              "dropoff_datetime".into(),
                              "trip_distance".into(),
                              "passenger_count".into()],
                rows: rows.into_iter()
                          .map(|r| r.into_iter().map(String::from).collect())
                          .collect() }
    }

    #[test]
    fn invalid_rows_are_dropped() {
        let table = raw_table(vec![
            // válida: 10 minutos
            vec!["2024-01-01 08:00:00", "2024-01-01 08:10:00", "2.5", "1"],
            // distancia cero
            vec!["2024-01-01 08:00:00", "2024-01-01 08:10:00", "0", "1"],
            // demasiado larga (> 3 horas)
            vec!["2024-01-01 08:00:00", "2024-01-01 12:00:00", "2.5", "1"],
            // timestamp roto
            vec!["not-a-date", "2024-01-01 08:10:00", "2.5", "1"],
        ]);
        let featured = featurize(&table, true).unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured.rows[0], vec!["8", "2.5", "1", "10"]);
    }

    #[test]
    fn inference_mode_needs_no_dropoff() {
        let mut table = raw_table(vec![vec!["2024-01-01 23:30:00", "", "1.2", "2"]]);
        table.columns = vec!["pickup_datetime".into(),
                             "dropoff_datetime".into(),
                             "trip_distance".into(),
                             "passenger_count".into()];
        let featured = featurize(&table, false).unwrap();
        assert_eq!(featured.columns,
                   vec!["pickup_hour", "trip_distance", "passenger_count"]);
        assert_eq!(featured.rows[0], vec!["23", "1.2", "2"]);
    }

    #[test]
    fn split_is_four_to_one() {
        let mut table = Table::new(vec!["x".into()]);
        table.rows = (0..10).map(|i| vec![i.to_string()]).collect();
        let (train, test) = split(&table);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert_eq!(test.rows[0], vec!["4"]);
    }
}
