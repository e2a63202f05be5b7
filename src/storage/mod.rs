use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use dyn_clone::DynClone;

use crate::types::{ContinuationToken, Page};

pub mod client_builder;
pub mod dynamodb;
pub mod s3;

/// Type alias for a boxed metadata store trait object.
pub type MetadataStore = Box<dyn MetadataStoreTrait + Send + Sync>;

/// Type alias for a boxed object store trait object.
pub type ObjectStore = Box<dyn ObjectStoreTrait + Send + Sync>;

/// Paginated metadata table the refresh job walks and updates.
///
/// Implementations must signal a provisioned-capacity rejection of
/// `scan_page` by returning an `anyhow::Error` wrapping
/// [`RefreshError::Throttled`](crate::types::error::RefreshError::Throttled);
/// the pagination loop retries exactly those and treats every other error as
/// fatal.
#[async_trait]
pub trait MetadataStoreTrait: DynClone {
    /// Fetch one page of at most `limit` records, resuming after
    /// `continuation_token` when given.
    async fn scan_page(
        &self,
        table: &str,
        limit: i32,
        continuation_token: Option<ContinuationToken>,
    ) -> Result<Page>;

    /// Set `fields` on the record addressed by `key`, leaving every other
    /// attribute untouched.
    async fn partial_update(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        fields: HashMap<String, AttributeValue>,
    ) -> Result<()>;
}

dyn_clone::clone_trait_object!(MetadataStoreTrait);

/// Object storage able to issue time-limited read URLs.
#[async_trait]
pub trait ObjectStoreTrait: DynClone {
    async fn sign_url(&self, bucket: &str, object_key: &str, expiration: Duration)
    -> Result<String>;
}

dyn_clone::clone_trait_object!(ObjectStoreTrait);

/// Extracts the service error code and message from an AWS SDK error.
///
/// `SdkError` is shared by every AWS client crate, so this serves the
/// DynamoDB, S3 and SES bindings alike. For service errors, returns the error
/// code (e.g. "ResourceNotFoundException") and the message from the response.
/// For other error types (network, timeout, construction failure), returns
/// "N/A" as the code and the full error description as the message.
pub(crate) fn extract_sdk_error_details<E, R>(e: &SdkError<E, R>) -> (String, String)
where
    E: std::fmt::Display + ProvideErrorMetadata,
{
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}
