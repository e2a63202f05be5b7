use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, trace};

use presign_refresh::config::ClientConfig;
use presign_refresh::config::args::config_error_from_parse_error;
use presign_refresh::notify::SesNotifier;
use presign_refresh::storage::dynamodb::DynamoDbMetadataStore;
use presign_refresh::storage::s3::S3ObjectStore;
use presign_refresh::{CLIArgs, Collaborators, Config, ConfigError, RefreshJob};

mod tracing_init;

const EXIT_CODE_FAILED: i32 = 1;

/// presign-refresh - Regenerate presigned S3 URLs stored in a DynamoDB table.
///
/// This binary is a thin wrapper over the presign-refresh library.
/// It runs the job once and prints the invocation result as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    let (client_config, config) =
        match resolve_config(CLIArgs::try_parse(), |name| std::env::var(name).ok()) {
            Ok(resolved) => resolved,
            Err(e) => e.exit(),
        };
    trace!("config = {:?}", config);

    let trigger = parse_trigger_payload(
        config
            .as_ref()
            .ok()
            .and_then(|config| config.trigger_payload.as_deref()),
    );

    let collaborators = build_collaborators(&client_config).await;
    let result = RefreshJob::new(collaborators).handle(&trigger, config).await;

    println!("{}", serde_json::to_string(&result)?);

    if !result.is_success() {
        std::process::exit(EXIT_CODE_FAILED);
    }

    debug!("presign-refresh has been completed.");
    Ok(())
}

/// Client settings and the run configuration from the parsed arguments.
///
/// Help and version requests come back as `Err` for clap to print. Every
/// other parse failure is a configuration error for the job to report, with
/// the AWS clients built from defaults.
fn resolve_config<F>(
    parsed: Result<CLIArgs, clap::Error>,
    lookup: F,
) -> Result<(ClientConfig, Result<Config, ConfigError>), clap::Error>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed {
        Ok(cli_args) => {
            start_tracing_if_necessary(&cli_args);
            Ok((cli_args.build_client_config(), Config::try_from(cli_args)))
        }
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => Err(e),
        Err(e) => {
            tracing_init::init_fallback_tracing();
            Ok((
                ClientConfig::default(),
                Err(config_error_from_parse_error(&e, lookup)),
            ))
        }
    }
}

fn start_tracing_if_necessary(cli_args: &CLIArgs) -> bool {
    let Some(tracing_config) = cli_args.build_tracing_config() else {
        return false;
    };

    tracing_init::init_tracing(&tracing_config);
    true
}

async fn build_collaborators(client_config: &ClientConfig) -> Collaborators {
    let sdk_config = client_config.load_sdk_config().await;

    Collaborators {
        metadata_store: DynamoDbMetadataStore::boxed(
            client_config.create_dynamodb_client(&sdk_config),
        ),
        object_store: S3ObjectStore::boxed(client_config.create_s3_client(&sdk_config)),
        notifier: SesNotifier::boxed(client_config.create_ses_client(&sdk_config)),
    }
}

/// The trigger is opaque; a payload that is not JSON is kept as a string.
fn parse_trigger_payload(payload: Option<&str>) -> serde_json::Value {
    match payload {
        Some(payload) => serde_json::from_str(payload)
            .unwrap_or_else(|_| serde_json::Value::String(payload.to_string())),
        None => serde_json::Value::Null,
    }
}
