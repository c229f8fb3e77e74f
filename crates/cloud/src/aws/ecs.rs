//! ECS-backed [`ContainerOrchestrator`].

use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, DesiredStatus, KeyValuePair,
    LaunchType, NetworkConfiguration, TaskOverride,
};

use crate::orchestrator::{
    ContainerLogConfig, ContainerOrchestrator, ContainerOverview, LaunchSpec, OrchestratorError,
    TaskDefinitionOverview, TaskDesiredStatus, TaskOverview,
};

/// Runs build tasks on one ECS cluster (Fargate launch type).
pub struct EcsOrchestrator {
    client: aws_sdk_ecs::Client,
    cluster: String,
}

impl EcsOrchestrator {
    pub fn new(client: aws_sdk_ecs::Client, cluster: String) -> Self {
        Self { client, cluster }
    }
}

#[async_trait]
impl ContainerOrchestrator for EcsOrchestrator {
    async fn launch_task(&self, spec: &LaunchSpec) -> Result<String, OrchestratorError> {
        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(spec.subnets.clone()))
            .set_security_groups(Some(spec.security_groups.clone()))
            .assign_public_ip(if spec.assign_public_ip {
                AssignPublicIp::Enabled
            } else {
                AssignPublicIp::Disabled
            })
            .build()
            .map_err(|e| OrchestratorError::Submit(e.to_string()))?;

        let env: Vec<KeyValuePair> = spec
            .env
            .iter()
            .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
            .collect();

        let overrides = TaskOverride::builder()
            .container_overrides(
                ContainerOverride::builder()
                    .name(&spec.container_name)
                    .set_environment(Some(env))
                    .build(),
            )
            .build();

        let response = self
            .client
            .run_task()
            .cluster(&self.cluster)
            .task_definition(&spec.task_definition)
            .count(1)
            .launch_type(LaunchType::Fargate)
            .started_by(&spec.started_by)
            .network_configuration(
                NetworkConfiguration::builder().awsvpc_configuration(vpc).build(),
            )
            .overrides(overrides)
            .send()
            .await
            .map_err(|e| OrchestratorError::Submit(format!("{}", DisplayErrorContext(e))))?;

        if let Some(arn) = response.tasks().first().and_then(|t| t.task_arn()) {
            return Ok(arn.to_string());
        }

        // RunTask can "succeed" at the HTTP level while placing nothing.
        let reason = response
            .failures()
            .first()
            .and_then(|f| f.reason())
            .unwrap_or("no task returned");
        Err(OrchestratorError::Submit(reason.to_string()))
    }

    async fn list_tasks(
        &self,
        started_by: &str,
        desired_status: Option<TaskDesiredStatus>,
    ) -> Result<Vec<String>, OrchestratorError> {
        let mut request = self
            .client
            .list_tasks()
            .cluster(&self.cluster)
            .started_by(started_by);

        request = match desired_status {
            Some(TaskDesiredStatus::Running) => request.desired_status(DesiredStatus::Running),
            Some(TaskDesiredStatus::Stopped) => request.desired_status(DesiredStatus::Stopped),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| OrchestratorError::Backend(format!("{}", DisplayErrorContext(e))))?;

        Ok(response.task_arns().to_vec())
    }

    async fn describe_task(&self, task_arn: &str) -> Result<TaskOverview, OrchestratorError> {
        let response = self
            .client
            .describe_tasks()
            .cluster(&self.cluster)
            .tasks(task_arn)
            .send()
            .await
            .map_err(|e| OrchestratorError::Backend(format!("{}", DisplayErrorContext(e))))?;

        let task = response
            .tasks()
            .first()
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_arn.to_string()))?;

        Ok(TaskOverview {
            arn: task.task_arn().unwrap_or(task_arn).to_string(),
            last_status: task.last_status().unwrap_or("UNKNOWN").to_string(),
            stop_code: task.stop_code().map(|c| c.as_str().to_string()),
            stopped_reason: task.stopped_reason().map(str::to_string),
            containers: task
                .containers()
                .iter()
                .map(|c| ContainerOverview {
                    name: c.name().unwrap_or_default().to_string(),
                    exit_code: c.exit_code(),
                })
                .collect(),
            task_definition_arn: task.task_definition_arn().map(str::to_string),
        })
    }

    async fn describe_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> Result<TaskDefinitionOverview, OrchestratorError> {
        let response = self
            .client
            .describe_task_definition()
            .task_definition(task_definition_arn)
            .send()
            .await
            .map_err(|e| OrchestratorError::Backend(format!("{}", DisplayErrorContext(e))))?;

        let definition = response.task_definition().ok_or_else(|| {
            OrchestratorError::Backend(format!(
                "task definition '{task_definition_arn}' missing from response"
            ))
        })?;

        let containers = definition
            .container_definitions()
            .iter()
            .map(|cd| {
                let options = cd.log_configuration().and_then(|lc| lc.options());
                ContainerLogConfig {
                    name: cd.name().unwrap_or_default().to_string(),
                    log_group: options.and_then(|o| o.get("awslogs-group").cloned()),
                    stream_prefix: options.and_then(|o| o.get("awslogs-stream-prefix").cloned()),
                }
            })
            .collect();

        Ok(TaskDefinitionOverview { containers })
    }
}
