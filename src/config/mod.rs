pub mod args;

use std::time::Duration;

/// Number of records requested per scan page.
pub const PAGE_SIZE: i32 = 25;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Main configuration for one refresh run.
///
/// Built once at startup from [`CLIArgs`](crate::CLIArgs) (command line or
/// environment) and never mutated afterwards. The expiration window is held
/// in seconds; the conversion from days happens exactly once, in
/// `TryFrom<CLIArgs>`.
///
/// # Quick Start
///
/// ```
/// use presign_refresh::Config;
///
/// let config = Config::for_target("file-metadata", "my-bucket");
/// assert_eq!(config.url_expiration_days, 7);
/// assert_eq!(config.url_expiration_seconds, 7 * 24 * 60 * 60);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub bucket_name: String,
    pub url_expiration_days: u32,
    pub url_expiration_seconds: u64,
    pub sender_email: Option<String>,
    pub recipient_emails: Vec<String>,
    pub inter_page_delay_milliseconds: u64,
    pub throttle_backoff_milliseconds: u64,
    pub max_throttle_retries: u32,
    pub dry_run: bool,
    pub trigger_payload: Option<String>,
    pub client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
}

impl Config {
    /// Create a `Config` with production defaults for the given table and bucket.
    pub fn for_target(table_name: &str, bucket_name: &str) -> Self {
        Config {
            table_name: table_name.to_string(),
            bucket_name: bucket_name.to_string(),
            ..Config::default()
        }
    }

    pub fn url_expiration(&self) -> Duration {
        Duration::from_secs(self.url_expiration_seconds)
    }

    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_milliseconds)
    }

    pub fn throttle_backoff(&self) -> Duration {
        Duration::from_millis(self.throttle_backoff_milliseconds)
    }

}

/// Configuration that could not be turned into a [`Config`].
///
/// The notification addresses that could still be read travel with the
/// message, so the failed run is reported like any other.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
    pub sender_email: Option<String>,
    pub recipient_emails: Vec<String>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sender_email: None,
            recipient_emails: Vec::new(),
        }
    }

    pub fn with_notification(
        mut self,
        sender_email: Option<String>,
        recipient_emails: Vec<String>,
    ) -> Self {
        self.sender_email = sender_email;
        self.recipient_emails = recipient_emails;
        self
    }
}

impl Default for Config {
    /// The table and bucket default to empty strings; set them before running.
    fn default() -> Self {
        Config {
            table_name: String::new(),
            bucket_name: String::new(),
            url_expiration_days: args::DEFAULT_URL_EXPIRATION_DAYS,
            url_expiration_seconds: args::DEFAULT_URL_EXPIRATION_DAYS as u64 * SECONDS_PER_DAY,
            sender_email: None,
            recipient_emails: Vec::new(),
            inter_page_delay_milliseconds: args::DEFAULT_INTER_PAGE_DELAY_MILLISECONDS,
            throttle_backoff_milliseconds: args::DEFAULT_THROTTLE_BACKOFF_MILLISECONDS,
            max_throttle_retries: args::DEFAULT_MAX_THROTTLE_RETRIES,
            dry_run: false,
            trigger_payload: None,
            client_config: None,
            tracing_config: None,
        }
    }
}

/// AWS client configuration shared by the DynamoDB, S3 and SES clients.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
}

/// Retry configuration for AWS SDK operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: args::DEFAULT_AWS_MAX_ATTEMPTS,
            initial_backoff_milliseconds: args::DEFAULT_INITIAL_BACKOFF_MILLISECONDS,
        }
    }
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

impl Default for TracingConfig {
    /// Info level, plain text. Used when the arguments themselves could not be parsed.
    fn default() -> Self {
        TracingConfig {
            tracing_level: log::Level::Info,
            json_tracing: false,
            aws_sdk_tracing: false,
            span_events_tracing: false,
            disable_color_tracing: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_target_uses_defaults() {
        let config = Config::for_target("files", "bucket");

        assert_eq!(config.table_name, "files");
        assert_eq!(config.bucket_name, "bucket");
        assert_eq!(config.url_expiration(), Duration::from_secs(604_800));
        assert_eq!(config.inter_page_delay(), Duration::from_millis(100));
        assert_eq!(config.throttle_backoff(), Duration::from_millis(1000));
        assert_eq!(config.max_throttle_retries, 10);
        assert!(!config.dry_run);
    }

    #[test]
    fn config_error_keeps_notification_addresses() {
        let error = ConfigError::new("Missing required configuration: BUCKET_NAME")
            .with_notification(
                Some("jobs@example.com".to_string()),
                vec!["ops@example.com".to_string()],
            );

        assert_eq!(
            error.to_string(),
            "Missing required configuration: BUCKET_NAME"
        );
        assert_eq!(error.sender_email.as_deref(), Some("jobs@example.com"));
        assert_eq!(error.recipient_emails, vec!["ops@example.com".to_string()]);
    }

    #[test]
    fn page_size_is_fixed() {
        assert_eq!(PAGE_SIZE, 25);
    }
}
