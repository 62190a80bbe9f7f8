//! ml-persistence
//!
//! Persistencia en filesystem de definiciones de pipeline y logs de
//! ejecución, detrás de los mismos traits que las versiones en memoria del
//! core:
//! - `FsPipelineRepository`: un documento JSON por pipeline nombrado, con
//!   semántica de upsert por `definition_hash`.
//! - `FsEventStore`: un archivo JSON-lines append-only por ejecución.
//!
//! Módulos:
//! - `fs`: implementaciones sobre el filesystem.
//! - `config`: carga de configuración desde .env.

pub mod config;
pub mod error;
pub mod fs;

pub use config::{init_dotenv, StoreConfig};
pub use error::PersistenceError;
pub use fs::{FsEventStore, FsPipelineRepository};
