//! Invocation entry point.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::config::{Config, ConfigError};
use crate::notify::Notifier;
use crate::pipeline::PaginationDriver;
use crate::reporter::RunReporter;
use crate::storage::{MetadataStore, ObjectStore};
use crate::types::RunStats;
use crate::types::error::RefreshError;
use crate::types::summary::{JobStatus, JobSummary, format_duration};

const MESSAGE_COMPLETED: &str = "Presigned URL refresh completed";
const MESSAGE_FAILED: &str = "Presigned URL refresh failed";

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Service handles used by one job, constructed once per process.
#[derive(Clone)]
pub struct Collaborators {
    pub metadata_store: MetadataStore,
    pub object_store: ObjectStore,
    pub notifier: Notifier,
}

/// Result returned to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    fn completed(stats: &RunStats, duration: String) -> Self {
        Self {
            status_code: STATUS_OK,
            body: ResponseBody {
                message: MESSAGE_COMPLETED.to_string(),
                processed_count: stats.processed_count,
                success_count: stats.success_count,
                error_count: stats.error_count,
                duration: Some(duration),
                error: None,
            },
        }
    }

    fn failed(stats: &RunStats, error: String) -> Self {
        Self {
            status_code: STATUS_INTERNAL_ERROR,
            body: ResponseBody {
                message: MESSAGE_FAILED.to_string(),
                processed_count: stats.processed_count,
                success_count: stats.success_count,
                error_count: stats.error_count,
                duration: None,
                error: Some(error),
            },
        }
    }
}

/// `duration` is set on success, `error` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub message: String,
    pub processed_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One scheduled refresh run.
///
/// # Example
///
/// ```no_run
/// # async fn example(collaborators: presign_refresh::Collaborators) {
/// use presign_refresh::{Config, RefreshJob};
///
/// let config = Config::for_target("file-metadata", "my-bucket");
/// let result = RefreshJob::new(collaborators)
///     .handle(&serde_json::Value::Null, Ok(config))
///     .await;
/// println!("{}", serde_json::to_string(&result).unwrap());
/// # }
/// ```
pub struct RefreshJob {
    collaborators: Collaborators,
}

impl RefreshJob {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Run the job once and report it.
    ///
    /// A configuration error aborts before any store access. The reporter is
    /// invoked exactly once on every path, and nothing it does changes the
    /// returned result.
    pub async fn handle(
        &self,
        trigger: &serde_json::Value,
        config: Result<Config, ConfigError>,
    ) -> InvocationResult {
        let start_time = Utc::now();
        let started = Instant::now();
        info!(trigger = %trigger, "presigned URL refresh triggered.");

        let config = match config {
            Ok(config) => config,
            Err(config_error) => {
                let message =
                    RefreshError::InvalidConfig(config_error.message.clone()).to_string();
                error!(error = message, "invalid configuration. aborting.");
                let summary = JobSummary {
                    total_processed: 0,
                    success_count: 0,
                    error_count: 0,
                    failures: Default::default(),
                    duration: started.elapsed(),
                    start_time,
                    table_name: None,
                    bucket_name: None,
                    expiration_days: None,
                    status: JobStatus::Failed,
                    error: Some(message.clone()),
                };
                RunReporter::from_config_error(
                    self.collaborators.notifier.clone(),
                    &config_error,
                )
                .report(&summary)
                .await;
                return InvocationResult::failed(&RunStats::default(), message);
            }
        };

        info!(
            table = config.table_name,
            bucket = config.bucket_name,
            url_expiration_days = config.url_expiration_days,
            dry_run = config.dry_run,
            "presigned URL refresh started."
        );

        let driver = PaginationDriver::new(
            &config,
            self.collaborators.metadata_store.clone(),
            self.collaborators.object_store.clone(),
        );
        let outcome = driver.run().await;

        let duration = started.elapsed();
        let error_message = outcome.error.as_ref().map(|e| format!("{e:#}"));
        let mut summary = JobSummary {
            total_processed: 0,
            success_count: 0,
            error_count: 0,
            failures: Default::default(),
            duration,
            start_time,
            table_name: Some(config.table_name.clone()),
            bucket_name: Some(config.bucket_name.clone()),
            expiration_days: Some(config.url_expiration_days),
            status: if outcome.is_fatal() {
                JobStatus::Failed
            } else {
                JobStatus::Success
            },
            error: error_message.clone(),
        };
        summary.apply_stats(&outcome.stats);

        RunReporter::from_config(self.collaborators.notifier.clone(), &config)
            .report(&summary)
            .await;

        if outcome.is_fatal() {
            let message = error_message.unwrap_or_else(|| MESSAGE_FAILED.to_string());
            return InvocationResult::failed(&outcome.stats, message);
        }
        InvocationResult::completed(&outcome.stats, format_duration(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        MockMetadataStore, MockNotifier, MockObjectStore, ScanStep,
        init_dummy_tracing_subscriber, make_test_config, make_token, make_valid_page,
    };

    fn make_job(
        metadata_store: &MockMetadataStore,
        notifier: &MockNotifier,
    ) -> RefreshJob {
        RefreshJob::new(Collaborators {
            metadata_store: Box::new(metadata_store.clone()),
            object_store: Box::new(MockObjectStore::new()),
            notifier: Box::new(notifier.clone()),
        })
    }

    fn notifying_config() -> Config {
        let mut config = make_test_config();
        config.sender_email = Some("jobs@example.com".to_string());
        config.recipient_emails = vec!["ops@example.com".to_string()];
        config
    }

    #[tokio::test]
    async fn completed_run_returns_200() {
        init_dummy_tracing_subscriber();

        let metadata_store = MockMetadataStore::new(vec![
            make_valid_page("a", 2, Some(make_token("a-2"))),
            make_valid_page("b", 1, None),
        ]);
        let notifier = MockNotifier::new();
        let result = make_job(&metadata_store, &notifier)
            .handle(&serde_json::Value::Null, Ok(notifying_config()))
            .await;

        assert!(result.is_success());
        assert_eq!(result.body.processed_count, 3);
        assert_eq!(result.body.success_count, 3);
        assert!(result.body.duration.as_deref().unwrap().ends_with('s'));
        assert!(result.body.error.is_none());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn fatal_run_returns_500_with_partial_counts() {
        init_dummy_tracing_subscriber();

        let metadata_store = MockMetadataStore::scripted(vec![
            ScanStep::Page(make_valid_page("a", 2, Some(make_token("a-2")))),
            ScanStep::Fatal("AccessDeniedException: no scan".to_string()),
        ]);
        let notifier = MockNotifier::new();
        let result = make_job(&metadata_store, &notifier)
            .handle(&serde_json::Value::Null, Ok(notifying_config()))
            .await;

        assert_eq!(result.status_code, STATUS_INTERNAL_ERROR);
        assert_eq!(result.body.processed_count, 2);
        assert!(
            result
                .body
                .error
                .as_deref()
                .unwrap()
                .contains("AccessDeniedException")
        );
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("FAILED"));
    }

    #[tokio::test]
    async fn config_error_makes_no_store_calls() {
        init_dummy_tracing_subscriber();

        let metadata_store = MockMetadataStore::new(vec![make_valid_page("a", 1, None)]);
        let notifier = MockNotifier::new();
        let result = make_job(&metadata_store, &notifier)
            .handle(
                &serde_json::Value::Null,
                Err(ConfigError::new("Missing required configuration: TABLE_NAME")),
            )
            .await;

        assert_eq!(result.status_code, STATUS_INTERNAL_ERROR);
        assert_eq!(
            result.body.error.as_deref(),
            Some("Missing required configuration: TABLE_NAME")
        );
        assert!(metadata_store.scans().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn config_error_is_reported_to_readable_addresses() {
        init_dummy_tracing_subscriber();

        let metadata_store = MockMetadataStore::new(vec![make_valid_page("a", 1, None)]);
        let notifier = MockNotifier::new();
        let config_error = ConfigError::new("Missing required configuration: BUCKET_NAME")
            .with_notification(
                Some("jobs@example.com".to_string()),
                vec!["ops@example.com".to_string()],
            );
        let result = make_job(&metadata_store, &notifier)
            .handle(&serde_json::Value::Null, Err(config_error))
            .await;

        assert_eq!(result.status_code, STATUS_INTERNAL_ERROR);
        assert!(metadata_store.scans().is_empty());
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Presigned URL refresh FAILED");
        assert!(
            sent[0]
                .text_body
                .contains("Error: Missing required configuration: BUCKET_NAME")
        );
    }

    #[test]
    fn response_body_serializes_camel_case() {
        let stats = RunStats {
            processed_count: 3,
            success_count: 2,
            error_count: 1,
            ..RunStats::default()
        };

        let completed =
            serde_json::to_value(InvocationResult::completed(&stats, "1.234s".to_string()))
                .unwrap();
        assert_eq!(
            completed,
            serde_json::json!({
                "statusCode": 200,
                "body": {
                    "message": "Presigned URL refresh completed",
                    "processedCount": 3,
                    "successCount": 2,
                    "errorCount": 1,
                    "duration": "1.234s"
                }
            })
        );

        let failed =
            serde_json::to_value(InvocationResult::failed(&stats, "boom".to_string())).unwrap();
        assert_eq!(failed["statusCode"], 500);
        assert_eq!(failed["body"]["error"], "boom");
        assert!(failed["body"].get("duration").is_none());
    }
}
