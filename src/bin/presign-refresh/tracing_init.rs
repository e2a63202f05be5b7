// Initializes the tracing subscriber for the CLI binary.

use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use presign_refresh::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";
const CRATE_TARGET: &str = "presign_refresh";
const AWS_SDK_TARGETS: [&str; 6] = [
    "aws_config",
    "aws_sigv4",
    "aws_smithy_runtime",
    "aws_sdk_dynamodb",
    "aws_sdk_s3",
    "aws_sdk_sesv2",
];

/// Logs go to stderr; stdout carries only the invocation result.
pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (event_filter, show_target) = event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .with_ansi(!config.disable_color_tracing && std::io::stderr().is_terminal())
        .with_span_events(fmt_span)
        .with_env_filter(event_filter)
        .with_target(show_target);

    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}

/// Used when the arguments could not be parsed, so the configuration error
/// is still logged before the job reports it.
pub fn init_fallback_tracing() {
    init_tracing(&TracingConfig::default());
}

/// Filter directives and whether event targets are shown.
///
/// AWS SDK tracing wins over `RUST_LOG`; without either, only this crate's
/// events at the configured level pass.
fn event_filter(config: &TracingConfig, rust_log: Option<String>) -> (String, bool) {
    let tracing_level = config.tracing_level;

    if config.aws_sdk_tracing {
        let directives = std::iter::once(CRATE_TARGET)
            .chain(AWS_SDK_TARGETS)
            .map(|target| format!("{target}={tracing_level}"))
            .collect::<Vec<_>>()
            .join(",");
        return (directives, true);
    }

    match rust_log {
        Some(filter) if !filter.trim().is_empty() => (filter, true),
        _ => (format!("{CRATE_TARGET}={tracing_level}"), false),
    }
}
