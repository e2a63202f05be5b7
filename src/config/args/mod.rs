use crate::config::{
    CLITimeoutConfig, ClientConfig, Config, ConfigError, RetryConfig, SECONDS_PER_DAY,
    TracingConfig,
};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::ffi::OsString;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

pub const DEFAULT_URL_EXPIRATION_DAYS: u32 = 7;
/// SigV4 presigned URLs are valid for at most one week.
pub const MAX_URL_EXPIRATION_DAYS: u32 = 7;
pub const DEFAULT_INTER_PAGE_DELAY_MILLISECONDS: u64 = 100;
pub const DEFAULT_THROTTLE_BACKOFF_MILLISECONDS: u64 = 1000;
pub const DEFAULT_MAX_THROTTLE_RETRIES: u32 = 10;
pub const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_MISSING_CONFIGURATION: &str = "Missing required configuration";
const ERROR_MESSAGE_INVALID_CONFIGURATION: &str = "Invalid configuration";
const ERROR_MESSAGE_URL_EXPIRATION_DAYS_ZERO: &str = "URL expiration must be at least 1 day.";
const ERROR_MESSAGE_URL_EXPIRATION_DAYS_TOO_LONG: &str = "URL expiration must be at most 7 days.";
const ERROR_MESSAGE_AWS_MAX_ATTEMPTS_ZERO: &str = "AWS max attempts must be at least 1.";

const ENV_TABLE_NAME: &str = "TABLE_NAME";
const ENV_BUCKET_NAME: &str = "BUCKET_NAME";
const ENV_SENDER_EMAIL: &str = "SENDER_EMAIL";
const ENV_RECIPIENT_EMAILS: &str = "RECIPIENT_EMAILS";

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// presign-refresh - Regenerate presigned S3 URLs stored in a DynamoDB table.
///
/// Every option can also be supplied through the environment variable named
/// after it (e.g. TABLE_NAME, BUCKET_NAME, URL_EXPIRATION_DAYS).
///
/// Example:
///   presign-refresh --table-name file-metadata --bucket-name my-bucket
///   TABLE_NAME=file-metadata BUCKET_NAME=my-bucket presign-refresh --dry-run -v
#[derive(Parser, Clone, Debug)]
#[command(name = "presign-refresh", version, about, long_about = None)]
pub struct CLIArgs {
    // -----------------------------------------------------------------------
    // Target
    // -----------------------------------------------------------------------
    /// DynamoDB table holding the file metadata records.
    #[arg(long, env, help_heading = "Target")]
    pub table_name: Option<String>,

    /// S3 bucket the presigned URLs point into.
    #[arg(long, env, help_heading = "Target")]
    pub bucket_name: Option<String>,

    /// Lifetime of each generated URL in days (1 to 7). Default: 7.
    #[arg(long, env, default_value_t = DEFAULT_URL_EXPIRATION_DAYS, help_heading = "Target")]
    pub url_expiration_days: u32,

    // -----------------------------------------------------------------------
    // General options
    // -----------------------------------------------------------------------
    /// Generate URLs but do not write them back to the table.
    #[arg(short = 'd', long, env, default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    pub dry_run: bool,

    /// Opaque trigger payload (JSON). Only logged.
    #[arg(long, env, help_heading = "General")]
    pub trigger_payload: Option<String>,

    // -----------------------------------------------------------------------
    // Notification options
    // -----------------------------------------------------------------------
    /// Sender address of the run summary email.
    #[arg(long, env, help_heading = "Notification")]
    pub sender_email: Option<String>,

    /// Comma-separated recipient addresses of the run summary email.
    #[arg(long, env, help_heading = "Notification")]
    pub recipient_emails: Option<String>,

    // -----------------------------------------------------------------------
    // Pacing options
    // -----------------------------------------------------------------------
    /// Pause between two page fetches in milliseconds. Default: 100.
    #[arg(long, env, default_value_t = DEFAULT_INTER_PAGE_DELAY_MILLISECONDS, help_heading = "Pacing")]
    pub inter_page_delay_milliseconds: u64,

    /// Wait after a throttled page fetch in milliseconds. Default: 1000.
    #[arg(long, env, default_value_t = DEFAULT_THROTTLE_BACKOFF_MILLISECONDS, help_heading = "Pacing")]
    pub throttle_backoff_milliseconds: u64,

    /// Consecutive throttled fetches of one page before the run is aborted. Default: 10.
    #[arg(long, env, default_value_t = DEFAULT_MAX_THROTTLE_RETRIES, help_heading = "Pacing")]
    pub max_throttle_retries: u32,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (info), -v, -vv.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Output logs in JSON format.
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable AWS SDK tracing.
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Enable tracing span events.
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum retry attempts for AWS SDK operations. Default: 10.
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds for SDK retries. Default: 100.
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    /// Overall operation timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    /// Per-attempt operation timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    /// Connection timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    /// Read timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // AWS configuration
    // -----------------------------------------------------------------------
    /// AWS region. If not set, the SDK default chain decides.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub region: Option<String>,

    /// Custom endpoint URL (e.g. LocalStack) used for all AWS services.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub endpoint_url: Option<String>,

    /// Force path-style S3 URLs.
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub force_path_style: bool,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use presign_refresh::config::args::parse_from_args;
///
/// let args = vec!["presign-refresh", "--table-name", "files", "--dry-run"];
/// let cli_args = parse_from_args(args).unwrap();
/// assert!(cli_args.dry_run);
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
///
/// A parse failure becomes a [`ConfigError`] without notification addresses.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args =
        CLIArgs::try_parse_from(args).map_err(|e| config_error_from_parse_error(&e, |_| None))?;
    Config::try_from(cli_args)
}

/// Turn an argument parse failure (malformed number, unknown flag) into a
/// [`ConfigError`].
///
/// `lookup` resolves environment variables, so the notification addresses
/// survive even though `CLIArgs` could not be built.
pub fn config_error_from_parse_error<F>(error: &clap::Error, lookup: F) -> ConfigError
where
    F: Fn(&str) -> Option<String>,
{
    let rendered = error.to_string();
    let first_line = rendered.lines().next().unwrap_or_default();
    let detail = first_line.strip_prefix("error: ").unwrap_or(first_line);

    ConfigError::new(format!("{ERROR_MESSAGE_INVALID_CONFIGURATION}: {detail}")).with_notification(
        non_blank(lookup(ENV_SENDER_EMAIL)),
        lookup(ENV_RECIPIENT_EMAILS)
            .as_deref()
            .map(parse_recipient_list)
            .unwrap_or_default(),
    )
}

/// Split a comma-separated address list, trimming each entry and dropping empties.
pub fn parse_recipient_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

fn missing_configuration(name: &str) -> String {
    format!("{ERROR_MESSAGE_MISSING_CONFIGURATION}: {name}")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|value| value.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if is_blank(&self.table_name) {
            return Err(missing_configuration(ENV_TABLE_NAME));
        }
        if is_blank(&self.bucket_name) {
            return Err(missing_configuration(ENV_BUCKET_NAME));
        }
        if self.url_expiration_days == 0 {
            return Err(ERROR_MESSAGE_URL_EXPIRATION_DAYS_ZERO.to_string());
        }
        if self.url_expiration_days > MAX_URL_EXPIRATION_DAYS {
            return Err(ERROR_MESSAGE_URL_EXPIRATION_DAYS_TOO_LONG.to_string());
        }
        if self.aws_max_attempts == 0 {
            return Err(ERROR_MESSAGE_AWS_MAX_ATTEMPTS_ZERO.to_string());
        }
        Ok(())
    }

    /// AWS client settings only; usable even when `validate` fails, so the
    /// clients can be built before the configuration error is reported.
    pub fn build_client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
        }
    }

    /// Returns `None` when the user silenced logging completely (`-qqq`).
    pub fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        let sender_email = non_blank(args.sender_email.clone());
        let recipient_emails = args
            .recipient_emails
            .as_deref()
            .map(parse_recipient_list)
            .unwrap_or_default();

        if let Err(message) = args.validate() {
            return Err(
                ConfigError::new(message).with_notification(sender_email, recipient_emails)
            );
        }

        let client_config = Some(args.build_client_config());
        let tracing_config = args.build_tracing_config();

        Ok(Config {
            table_name: args.table_name.unwrap_or_default().trim().to_string(),
            bucket_name: args.bucket_name.unwrap_or_default().trim().to_string(),
            url_expiration_days: args.url_expiration_days,
            url_expiration_seconds: args.url_expiration_days as u64 * SECONDS_PER_DAY,
            sender_email,
            recipient_emails,
            inter_page_delay_milliseconds: args.inter_page_delay_milliseconds,
            throttle_backoff_milliseconds: args.throttle_backoff_milliseconds,
            max_throttle_retries: args.max_throttle_retries,
            dry_run: args.dry_run,
            trigger_payload: args.trigger_payload,
            client_config,
            tracing_config,
        })
    }
}
