//! CloudWatch Logs-backed [`LogStore`].

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;

use crate::logs::{LogEvent, LogPage, LogStore, LogStoreError};

/// Reads build output from CloudWatch Logs streams.
pub struct CloudWatchLogStore {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogStore {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogStore for CloudWatchLogStore {
    async fn create_log_group(&self, group: &str) -> Result<(), LogStoreError> {
        match self.client.create_log_group().log_group_name(group).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_already_exists_exception() {
                    Ok(())
                } else {
                    Err(LogStoreError::Backend(format!(
                        "{}",
                        DisplayErrorContext(service_err)
                    )))
                }
            }
        }
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogStoreError> {
        let mut request = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .start_from_head(from_head);
        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        match request.send().await {
            Ok(response) => Ok(LogPage {
                events: response
                    .events()
                    .iter()
                    .map(|e| LogEvent {
                        timestamp: e.timestamp().unwrap_or(0),
                        message: e.message().unwrap_or_default().to_string(),
                    })
                    .collect(),
                next_token: response.next_forward_token().map(str::to_string),
            }),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    // The backend reports a missing group and a missing
                    // stream with the same error type; only the message
                    // disambiguates.
                    let message = service_err.to_string().to_ascii_lowercase();
                    if message.contains("log group") {
                        Err(LogStoreError::GroupNotFound(group.to_string()))
                    } else {
                        Err(LogStoreError::StreamNotFound(stream.to_string()))
                    }
                } else {
                    Err(LogStoreError::Backend(format!(
                        "{}",
                        DisplayErrorContext(service_err)
                    )))
                }
            }
        }
    }

    async fn delete_log_stream(&self, group: &str, stream: &str) -> Result<(), LogStoreError> {
        match self
            .client
            .delete_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    Ok(())
                } else {
                    Err(LogStoreError::Backend(format!(
                        "{}",
                        DisplayErrorContext(service_err)
                    )))
                }
            }
        }
    }
}
