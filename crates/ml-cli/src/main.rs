use ml_adapters::{inference_pipeline, training_pipeline, LocalJobBackend, ProjectConfig};
use ml_core::{EngineConfig, ExecutionEngine, ExecutionOutcome, PipelineGraph, PipelineRepository, StepStatus};
use ml_persistence::{FsEventStore, FsPipelineRepository, StoreConfig};

const PROJECT_PREFIX: &str = "nyc-taxi-duration";

fn main() {
    // Cargar .env si existe para obtener MLPIPE_STORE_DIR
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
        std::process::exit(2);
    }

    match args[1].as_str() {
        // `mlpipe train --raw <DIR> --work <DIR>`
        "train" => {
            let mut raw: Option<String> = None;
            let mut work: Option<String> = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--raw" => {
                        i += 1;
                        if i < args.len() { raw = Some(args[i].clone()); }
                    }
                    "--work" => {
                        i += 1;
                        if i < args.len() { work = Some(args[i].clone()); }
                    }
                    _ => {}
                }
                i += 1;
            }
            let (Some(raw), Some(work)) = (raw, work) else {
                usage();
                std::process::exit(2);
            };
            let config = ProjectConfig::new(PROJECT_PREFIX, work);
            match training_pipeline(&config, &raw) {
                Ok(graph) => define_and_run(&graph),
                Err(e) => {
                    eprintln!("[mlpipe train] invalid pipeline: {e}");
                    std::process::exit(1);
                }
            }
        }
        // `mlpipe infer --input <DIR> --model <PATH> --work <DIR>`
        "infer" => {
            let mut input: Option<String> = None;
            let mut model: Option<String> = None;
            let mut work: Option<String> = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--input" => {
                        i += 1;
                        if i < args.len() { input = Some(args[i].clone()); }
                    }
                    "--model" => {
                        i += 1;
                        if i < args.len() { model = Some(args[i].clone()); }
                    }
                    "--work" => {
                        i += 1;
                        if i < args.len() { work = Some(args[i].clone()); }
                    }
                    _ => {}
                }
                i += 1;
            }
            let (Some(input), Some(model), Some(work)) = (input, model, work) else {
                usage();
                std::process::exit(2);
            };
            let config = ProjectConfig::new(PROJECT_PREFIX, work);
            match inference_pipeline(&config, &input, &model) {
                Ok(graph) => define_and_run(&graph),
                Err(e) => {
                    eprintln!("[mlpipe infer] invalid pipeline: {e}");
                    std::process::exit(1);
                }
            }
        }
        other => {
            eprintln!("[mlpipe] unknown command '{other}'");
            usage();
            std::process::exit(2);
        }
    }
}

/// Upsert de la definición y una ejecución nueva. Repetir el comando con el
/// mismo grafo no duplica la definición; sólo agrega otra ejecución.
fn define_and_run(graph: &PipelineGraph) -> ! {
    let store_config = StoreConfig::from_env();
    let mut repo = match FsPipelineRepository::new(&store_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[mlpipe] opening pipeline store: {e}");
            std::process::exit(1);
        }
    };
    match repo.upsert(graph) {
        Ok(stored) => println!("pipeline '{}' at revision {}", stored.name, stored.revision),
        Err(e) => {
            eprintln!("[mlpipe] defining pipeline: {e}");
            std::process::exit(1);
        }
    }

    let event_store = match FsEventStore::new(&store_config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[mlpipe] opening event store: {e}");
            std::process::exit(1);
        }
    };
    let mut engine = ExecutionEngine::new(event_store, LocalJobBackend::new(), EngineConfig::default());
    match engine.run(graph) {
        Ok(execution) => {
            println!("execution {}", execution.execution_id);
            for slot in &execution.steps {
                println!("  {:<28} {:?}", slot.step_id, slot.status);
                if slot.status == StepStatus::Succeeded {
                    for (name, location) in &slot.outputs {
                        println!("    {name} -> {location}");
                    }
                }
            }
            if execution.outcome == ExecutionOutcome::Succeeded {
                std::process::exit(0);
            }
            if let Some((step_id, error)) = execution.failed_step() {
                eprintln!("[mlpipe] step '{step_id}' failed: {error}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("[mlpipe] execution aborted: {e}");
            std::process::exit(1);
        }
    }
}

fn usage() {
    eprintln!("Uso: mlpipe train --raw <DIR> --work <DIR>");
    eprintln!("     mlpipe infer --input <DIR> --model <PATH> --work <DIR>");
}
