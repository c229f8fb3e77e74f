//! In-memory implementations of the cloud interfaces.
//!
//! Used by the deploy-engine tests and by local development without AWS
//! credentials. Task lifecycles do not advance on their own; tests script
//! them through the control methods ([`MemoryOrchestrator::complete_task`]
//! and friends).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::logs::{LogEvent, LogPage, LogStore, LogStoreError};
use crate::orchestrator::{
    ContainerLogConfig, ContainerOrchestrator, ContainerOverview, LaunchSpec, OrchestratorError,
    TaskDefinitionOverview, TaskDesiredStatus, TaskOverview,
};
use crate::storage::{BlobStore, BlobStoreError, ObjectSummary};

// ---------------------------------------------------------------------------
// MemoryOrchestrator
// ---------------------------------------------------------------------------

/// Synthetic task-definition ARN handed out for every launched task.
const TASK_DEFINITION_ARN: &str = "arn:aws:ecs:local:000000000000:task-definition/builder:1";

struct ScriptedTask {
    overview: TaskOverview,
    started_by: String,
    env: Vec<(String, String)>,
}

struct OrchestratorState {
    tasks: Vec<ScriptedTask>,
    definition: TaskDefinitionOverview,
    fail_next_launch: Option<String>,
}

/// Scriptable [`ContainerOrchestrator`].
pub struct MemoryOrchestrator {
    inner: Mutex<OrchestratorState>,
    counter: AtomicU64,
}

impl Default for MemoryOrchestrator {
    fn default() -> Self {
        Self {
            inner: Mutex::new(OrchestratorState {
                tasks: Vec::new(),
                definition: TaskDefinitionOverview {
                    containers: vec![ContainerLogConfig {
                        name: "builder".to_string(),
                        log_group: Some("/slipway/builds".to_string()),
                        stream_prefix: Some("build".to_string()),
                    }],
                },
                fail_next_launch: None,
            }),
            counter: AtomicU64::new(0),
        }
    }
}

impl MemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `launch_task` call fail with the given reason.
    pub fn fail_next_launch(&self, reason: &str) {
        self.inner.lock().expect("lock poisoned").fail_next_launch = Some(reason.to_string());
    }

    /// Replace the task definition returned by `describe_task_definition`.
    pub fn set_task_definition(&self, definition: TaskDefinitionOverview) {
        self.inner.lock().expect("lock poisoned").definition = definition;
    }

    /// Strip the logging configuration from every container definition.
    pub fn clear_log_config(&self) {
        let mut state = self.inner.lock().expect("lock poisoned");
        for container in &mut state.definition.containers {
            container.log_group = None;
            container.stream_prefix = None;
        }
    }

    /// Advance a task's lifecycle status (e.g. to `RUNNING`).
    pub fn set_task_status(&self, task_arn: &str, status: &str) {
        let mut state = self.inner.lock().expect("lock poisoned");
        if let Some(task) = state.tasks.iter_mut().find(|t| t.overview.arn == task_arn) {
            task.overview.last_status = status.to_string();
        }
    }

    /// Stop a task with the given container exit code, stop code, and
    /// human-readable reason.
    pub fn complete_task(&self, task_arn: &str, exit_code: i32, stop_code: &str, reason: &str) {
        let mut state = self.inner.lock().expect("lock poisoned");
        if let Some(task) = state.tasks.iter_mut().find(|t| t.overview.arn == task_arn) {
            task.overview.last_status = "STOPPED".to_string();
            task.overview.stop_code = Some(stop_code.to_string());
            task.overview.stopped_reason = Some(reason.to_string());
            for container in &mut task.overview.containers {
                container.exit_code = Some(exit_code);
            }
        }
    }

    /// ARNs of every task launched so far, in launch order.
    pub fn launched_tasks(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .tasks
            .iter()
            .map(|t| t.overview.arn.clone())
            .collect()
    }

    /// Environment handed to a launched task (for asserting what the
    /// build container would have seen).
    pub fn task_env(&self, task_arn: &str) -> Option<Vec<(String, String)>> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .tasks
            .iter()
            .find(|t| t.overview.arn == task_arn)
            .map(|t| t.env.clone())
    }
}

#[async_trait]
impl ContainerOrchestrator for MemoryOrchestrator {
    async fn launch_task(&self, spec: &LaunchSpec) -> Result<String, OrchestratorError> {
        let mut state = self.inner.lock().expect("lock poisoned");
        if let Some(reason) = state.fail_next_launch.take() {
            return Err(OrchestratorError::Submit(reason));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let arn = format!("arn:aws:ecs:local:000000000000:task/builds/task-{n}");

        let containers = state
            .definition
            .containers
            .iter()
            .map(|c| ContainerOverview {
                name: c.name.clone(),
                exit_code: None,
            })
            .collect();

        state.tasks.push(ScriptedTask {
            overview: TaskOverview {
                arn: arn.clone(),
                last_status: "PROVISIONING".to_string(),
                stop_code: None,
                stopped_reason: None,
                containers,
                task_definition_arn: Some(TASK_DEFINITION_ARN.to_string()),
            },
            started_by: spec.started_by.clone(),
            env: spec.env.clone(),
        });

        Ok(arn)
    }

    async fn list_tasks(
        &self,
        started_by: &str,
        desired_status: Option<TaskDesiredStatus>,
    ) -> Result<Vec<String>, OrchestratorError> {
        let state = self.inner.lock().expect("lock poisoned");
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.started_by == started_by)
            .filter(|t| match desired_status {
                Some(TaskDesiredStatus::Running) => !t.overview.is_stopped(),
                Some(TaskDesiredStatus::Stopped) => t.overview.is_stopped(),
                None => true,
            })
            .map(|t| t.overview.arn.clone())
            .collect())
    }

    async fn describe_task(&self, task_arn: &str) -> Result<TaskOverview, OrchestratorError> {
        let state = self.inner.lock().expect("lock poisoned");
        state
            .tasks
            .iter()
            .find(|t| t.overview.arn == task_arn)
            .map(|t| t.overview.clone())
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_arn.to_string()))
    }

    async fn describe_task_definition(
        &self,
        _task_definition_arn: &str,
    ) -> Result<TaskDefinitionOverview, OrchestratorError> {
        Ok(self.inner.lock().expect("lock poisoned").definition.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryLogStore
// ---------------------------------------------------------------------------

/// Default page size for [`MemoryLogStore`] reads.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Scriptable [`LogStore`].
///
/// Continuation tokens are byte offsets rendered as `pos-{n}`; a read past
/// the end returns an empty page with an unchanged token, matching the
/// non-advancing behaviour of the real backend.
pub struct MemoryLogStore {
    groups: Mutex<HashMap<String, HashMap<String, Vec<LogEvent>>>>,
    page_size: usize,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store that returns at most `page_size` events per read
    /// (for exercising pagination).
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            page_size,
        }
    }

    /// Append one record, creating the group and stream as needed (the
    /// real log agent does both implicitly).
    pub fn append_event(&self, group: &str, stream: &str, timestamp: i64, message: &str) {
        self.groups
            .lock()
            .expect("lock poisoned")
            .entry(group.to_string())
            .or_default()
            .entry(stream.to_string())
            .or_default()
            .push(LogEvent {
                timestamp,
                message: message.to_string(),
            });
    }

    pub fn group_exists(&self, group: &str) -> bool {
        self.groups.lock().expect("lock poisoned").contains_key(group)
    }

    pub fn stream_exists(&self, group: &str, stream: &str) -> bool {
        self.groups
            .lock()
            .expect("lock poisoned")
            .get(group)
            .is_some_and(|g| g.contains_key(stream))
    }
}

fn parse_token(token: Option<&str>, from_head: bool, len: usize) -> usize {
    match token.and_then(|t| t.strip_prefix("pos-")).and_then(|t| t.parse().ok()) {
        Some(offset) => offset,
        None if from_head => 0,
        None => len,
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn create_log_group(&self, group: &str) -> Result<(), LogStoreError> {
        self.groups
            .lock()
            .expect("lock poisoned")
            .entry(group.to_string())
            .or_default();
        Ok(())
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogStoreError> {
        let groups = self.groups.lock().expect("lock poisoned");
        let streams = groups
            .get(group)
            .ok_or_else(|| LogStoreError::GroupNotFound(group.to_string()))?;
        let events = streams
            .get(stream)
            .ok_or_else(|| LogStoreError::StreamNotFound(stream.to_string()))?;

        let start = parse_token(next_token, from_head, events.len()).min(events.len());
        let end = (start + self.page_size).min(events.len());

        Ok(LogPage {
            events: events[start..end].to_vec(),
            next_token: Some(format!("pos-{end}")),
        })
    }

    async fn delete_log_stream(&self, group: &str, stream: &str) -> Result<(), LogStoreError> {
        if let Some(streams) = self.groups.lock().expect("lock poisoned").get_mut(group) {
            streams.remove(stream);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

struct StoredObject {
    bytes: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Scriptable [`BlobStore`].
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes of a stored object, if present.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.bytes.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BlobStoreError> {
        self.objects.lock().expect("lock poisoned").insert(
            key.to_string(),
            StoredObject {
                bytes,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.objects
            .lock()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, BlobStoreError> {
        let objects = self.objects.lock().expect("lock poisoned");
        let mut summaries: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.bytes.len() as i64,
                last_modified: Some(object.last_modified),
            })
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_store_distinguishes_missing_group_from_missing_stream() {
        let store = MemoryLogStore::new();

        let err = store.get_log_events("g", "s", None, true).await.unwrap_err();
        assert!(matches!(err, LogStoreError::GroupNotFound(_)));

        store.create_log_group("g").await.unwrap();
        let err = store.get_log_events("g", "s", None, true).await.unwrap_err();
        assert!(matches!(err, LogStoreError::StreamNotFound(_)));
    }

    #[tokio::test]
    async fn log_store_token_stops_advancing_at_end_of_stream() {
        let store = MemoryLogStore::new();
        store.append_event("g", "s", 1, "one");
        store.append_event("g", "s", 2, "two");

        let first = store.get_log_events("g", "s", None, true).await.unwrap();
        assert_eq!(first.events.len(), 2);
        let token = first.next_token.clone().unwrap();

        let second = store
            .get_log_events("g", "s", Some(&token), true)
            .await
            .unwrap();
        assert!(second.events.is_empty());
        assert_eq!(second.next_token.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn log_store_paginates_from_head() {
        let store = MemoryLogStore::with_page_size(2);
        for i in 0..5 {
            store.append_event("g", "s", i, &format!("line {i}"));
        }

        let mut token: Option<String> = None;
        let mut seen = Vec::new();
        loop {
            let page = store
                .get_log_events("g", "s", token.as_deref(), true)
                .await
                .unwrap();
            if page.events.is_empty() {
                break;
            }
            seen.extend(page.events.iter().map(|e| e.message.clone()));
            token = page.next_token;
        }
        assert_eq!(seen, ["line 0", "line 1", "line 2", "line 3", "line 4"]);
    }

    #[tokio::test]
    async fn orchestrator_scripts_a_task_lifecycle() {
        let orchestrator = MemoryOrchestrator::new();
        let spec = LaunchSpec {
            task_definition: "builder".to_string(),
            container_name: "builder".to_string(),
            started_by: "demo-1".to_string(),
            env: vec![("REPO_URL".to_string(), "https://example.com".to_string())],
            subnets: vec![],
            security_groups: vec![],
            assign_public_ip: false,
        };

        let arn = orchestrator.launch_task(&spec).await.unwrap();
        assert_eq!(
            orchestrator.list_tasks("demo-1", Some(TaskDesiredStatus::Running)).await.unwrap(),
            vec![arn.clone()],
        );

        orchestrator.complete_task(&arn, 0, "EssentialContainerExited", "Essential container in task exited");
        assert!(orchestrator
            .list_tasks("demo-1", Some(TaskDesiredStatus::Running))
            .await
            .unwrap()
            .is_empty());

        let overview = orchestrator.describe_task(&arn).await.unwrap();
        assert!(overview.is_stopped());
        assert_eq!(overview.containers[0].exit_code, Some(0));
    }

    #[tokio::test]
    async fn blob_store_overwrites_and_lists_by_prefix() {
        let store = MemoryBlobStore::new();
        store.put_object("logs/a.ndjson", b"v1".to_vec(), "application/x-ndjson").await.unwrap();
        store.put_object("logs/a.ndjson", b"v2".to_vec(), "application/x-ndjson").await.unwrap();
        store.put_object("other/b", b"x".to_vec(), "text/plain").await.unwrap();

        assert_eq!(store.get_object("logs/a.ndjson").await.unwrap(), b"v2");
        let listed = store.list_objects("logs/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "logs/a.ndjson");
        assert_eq!(listed[0].size, 2);
    }
}
