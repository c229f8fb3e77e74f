//! AWS implementations of the cloud command interfaces.
//!
//! ECS runs the build tasks, CloudWatch Logs carries their output, and
//! S3 holds the archived log blobs. All three clients are built from one
//! shared SDK config loaded at startup.

pub mod cloudwatch;
pub mod ecs;
pub mod s3;

pub use cloudwatch::CloudWatchLogStore;
pub use ecs::EcsOrchestrator;
pub use s3::S3BlobStore;
