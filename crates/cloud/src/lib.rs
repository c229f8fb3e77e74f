//! Command interfaces for the three external systems the platform
//! depends on -- the container orchestrator, the append-only log backend,
//! and the archive object store -- plus their AWS implementations and
//! in-memory test doubles.
//!
//! Everything above this crate talks to the traits, never to an SDK.

pub mod aws;
pub mod logs;
pub mod memory;
pub mod orchestrator;
pub mod storage;

pub use logs::{LogEvent, LogPage, LogStore, LogStoreError};
pub use orchestrator::{
    ContainerLogConfig, ContainerOrchestrator, ContainerOverview, LaunchSpec, OrchestratorError,
    TaskDefinitionOverview, TaskDesiredStatus, TaskOverview,
};
pub use storage::{BlobStore, BlobStoreError, ObjectSummary};
