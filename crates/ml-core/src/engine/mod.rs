//! Engine module for the pipeline execution engine.
//!
//! Provides the engine core, its explicit configuration and the cancellation
//! token shared with callers.

pub mod cancel;
pub mod config;
pub mod core;

pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use core::ExecutionEngine;

pub use crate::backend::{JobBackend, JobHandle, JobState};
pub use crate::event::{EventStore, ExecutionEvent, ExecutionEventKind, InMemoryEventStore};
