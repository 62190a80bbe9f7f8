//! Demo end-to-end: define y corre los dos pipelines canónicos contra el
//! backend local, con definiciones y eventos persistidos bajo un directorio
//! de trabajo propio de la corrida.

use std::fs;
use std::path::Path;

use ml_adapters::{inference_pipeline, training_pipeline, LocalJobBackend, ProjectConfig};
use ml_core::{EngineConfig, ExecutionEngine, ExecutionOutcome, PipelineGraph, PipelineRepository,
              StepStatus};
use ml_persistence::{FsEventStore, FsPipelineRepository, StoreConfig};
use uuid::Uuid;

fn main() {
    ml_persistence::init_dotenv();
    let work = std::env::temp_dir().join(format!("mlpipe-demo-{}", Uuid::new_v4()));
    fs::create_dir_all(&work).expect("create demo workdir");
    println!("workdir: {}", work.display());

    let raw = work.join("raw_trips.csv");
    write_synthetic_trips(&raw, 60);

    let store_config = StoreConfig::with_root(work.join("store"));
    let project = ProjectConfig::new("nyc-taxi-duration", work.display().to_string());

    let model_location = run_training(&store_config, &project, &raw);
    run_batch_inference(&store_config, &project, &raw, &model_location);
    println!("demo: OK");
}

/// Viajes sintéticos con duración = 2 + 3 * distancia, en minutos enteros
/// dentro del rango que el preprocess considera válido.
fn write_synthetic_trips(path: &Path, rows: usize) {
    let mut csv = String::from("pickup_datetime,dropoff_datetime,trip_distance,passenger_count\n");
    for i in 0..rows {
        let hour = i % 24;
        let distance = 1 + i % 9;
        let duration_min = 2 + 3 * distance;
        csv.push_str(&format!("2024-03-01 {hour:02}:00:00,2024-03-01 {hour:02}:{duration_min:02}:00,{distance},{}\n",
                              1 + i % 3));
    }
    fs::write(path, csv).expect("write synthetic trips");
}

fn run_training(store_config: &StoreConfig, project: &ProjectConfig, raw: &Path) -> String {
    let graph = training_pipeline(project, &raw.display().to_string()).expect("training graph");
    let execution = define_and_run(store_config, &graph);
    assert_eq!(execution.outcome, ExecutionOutcome::Succeeded);
    let model = execution.output_of("TrainModel", "model").expect("model location").to_string();
    println!("trained model: {model}");
    model
}

fn run_batch_inference(store_config: &StoreConfig,
                       project: &ProjectConfig,
                       input: &Path,
                       model_location: &str) {
    let graph = inference_pipeline(project, &input.display().to_string(), model_location)
        .expect("inference graph");
    let execution = define_and_run(store_config, &graph);
    assert_eq!(execution.outcome, ExecutionOutcome::Succeeded);

    let predictions = execution.output_of("BatchInference", "predictions").expect("predictions location");
    let lines = fs::read_to_string(predictions).expect("read predictions").lines().count();
    println!("predictions: {} rows at {}", lines.saturating_sub(1), predictions);
}

/// Upsert de la definición (dos veces, para exhibir la idempotencia) y una
/// ejecución nueva contra el backend local.
fn define_and_run(store_config: &StoreConfig, graph: &PipelineGraph) -> ml_core::Execution {
    let mut repo = FsPipelineRepository::new(store_config).expect("open pipeline store");
    let stored = repo.upsert(graph).expect("define pipeline");
    let again = repo.upsert(graph).expect("re-define pipeline");
    assert_eq!(stored.revision, again.revision);
    println!("pipeline '{}' at revision {}", stored.name, stored.revision);

    let event_store = FsEventStore::new(store_config).expect("open event store");
    let mut engine = ExecutionEngine::new(event_store, LocalJobBackend::new(), EngineConfig::default());
    let execution = engine.run(graph).expect("run pipeline");
    for slot in &execution.steps {
        println!("  {:<28} {:?}", slot.step_id, slot.status);
        assert_eq!(slot.status, StepStatus::Succeeded);
    }
    execution
}
