pub mod types;
pub use types::{InMemoryPipelineRepository, PipelineRepository, StoredPipeline};
