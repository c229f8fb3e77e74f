use std::sync::Arc;

use slipway_cloud::{BlobStore, ContainerOrchestrator, LogStore};
use slipway_deploy::{LaunchConfig, PumpConfig, StreamContext};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: slipway_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Remote task platform client.
    pub orchestrator: Arc<dyn ContainerOrchestrator>,
    /// Build log backend client.
    pub log_store: Arc<dyn LogStore>,
    /// Archive object store client.
    pub blob_store: Arc<dyn BlobStore>,
    /// Shared HTTP client for Git provider lookups.
    pub http: reqwest::Client,
}

impl AppState {
    /// Launcher settings derived from the deploy config block.
    pub fn launch_config(&self) -> LaunchConfig {
        let deploy = &self.config.deploy;
        LaunchConfig {
            app_domain: deploy.app_domain.clone(),
            bucket: deploy.bucket.clone(),
            log_group: deploy.log_group.clone(),
            task_definition: deploy.task_definition.clone(),
            container_name: deploy.container_name.clone(),
            subnets: deploy.subnets.clone(),
            security_groups: deploy.security_groups.clone(),
            assign_public_ip: deploy.assign_public_ip,
        }
    }

    /// Collaborators for one log stream pump run.
    pub fn stream_context(&self) -> StreamContext {
        StreamContext {
            pool: self.pool.clone(),
            orchestrator: Arc::clone(&self.orchestrator),
            logs: Arc::clone(&self.log_store),
            blobs: Arc::clone(&self.blob_store),
            config: PumpConfig::default(),
        }
    }
}
