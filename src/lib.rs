/*!
# Overview
presign-refresh regenerates the presigned S3 URLs stored in a DynamoDB
metadata table and reports each run by email.

A scheduled invocation walks the table page by page (25 records per page),
presigns every record's `s3Key`, writes `presignedUrl` and
`presignedUrlUpdatedAt` back with a partial update, and sends a run summary
through SES.

## Features
- **Failure isolation**: records of a page are refreshed concurrently; one
  failing record never stops the others
- **Throttle-safe pagination**: a throttled page fetch is retried with the same
  continuation token, so no record is skipped or processed twice
- **Dry run**: generate URLs without writing them back
- **Library-first**: the `presign-refresh` binary is a thin wrapper over
  [`RefreshJob`], and every AWS service sits behind a trait

## As a Library

```no_run
use presign_refresh::config::args::parse_from_args;
use presign_refresh::notify::SesNotifier;
use presign_refresh::storage::dynamodb::DynamoDbMetadataStore;
use presign_refresh::storage::s3::S3ObjectStore;
use presign_refresh::{Collaborators, Config, RefreshJob};

#[tokio::main]
async fn main() {
    let args = vec![
        "presign-refresh",
        "--table-name",
        "file-metadata",
        "--bucket-name",
        "my-bucket",
        "--dry-run",
    ];

    let cli_args = parse_from_args(args).unwrap();
    let client_config = cli_args.build_client_config();
    let sdk_config = client_config.load_sdk_config().await;

    let collaborators = Collaborators {
        metadata_store: DynamoDbMetadataStore::boxed(
            client_config.create_dynamodb_client(&sdk_config),
        ),
        object_store: S3ObjectStore::boxed(client_config.create_s3_client(&sdk_config)),
        notifier: SesNotifier::boxed(client_config.create_ses_client(&sdk_config)),
    };

    let result = RefreshJob::new(collaborators)
        .handle(&serde_json::Value::Null, Config::try_from(cli_args))
        .await;
    println!("{}", serde_json::to_string(&result).unwrap());
}
```
*/

pub mod batch;
pub mod config;
pub mod credential;
pub mod job;
pub mod key_resolver;
pub mod notify;
pub mod pipeline;
pub mod reporter;
pub mod storage;
pub mod types;
pub mod updater;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Config, ConfigError};
pub use config::args::CLIArgs;
pub use job::{Collaborators, InvocationResult, RefreshJob, ResponseBody};
pub use pipeline::{PaginationDriver, RunOutcome, ScanState};
pub use types::error::{RefreshError, is_throttling_error};
pub use types::summary::{JobStatus, JobSummary};
