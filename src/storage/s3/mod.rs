use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;

use crate::storage::{ObjectStore, ObjectStoreTrait, extract_sdk_error_details};
use crate::types::error::RefreshError;

/// Object store that presigns S3 `GetObject` requests.
///
/// Presigning is a local signing operation; no request reaches S3 until the
/// URL is used.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn boxed(client: Client) -> ObjectStore {
        Box::new(Self::new(client))
    }
}

#[async_trait]
impl ObjectStoreTrait for S3ObjectStore {
    async fn sign_url(
        &self,
        bucket: &str,
        object_key: &str,
        expiration: Duration,
    ) -> Result<String> {
        // SigV4 caps the lifetime at seven days; longer windows fail here.
        let presigning_config = PresigningConfig::expires_in(expiration)
            .map_err(|e| anyhow!(RefreshError::Upstream(e.to_string())))
            .context("aws_sdk_s3::presigning::PresigningConfig::expires_in() failed.")?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(object_key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::warn!(
                    bucket = bucket,
                    key = object_key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 GetObject presigning failed for s3://{}/{}: {} ({}).",
                    bucket,
                    object_key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow!(RefreshError::Upstream(format!(
                    "{s3_error_code}: {s3_error_message}"
                )))
            })?;

        Ok(presigned_request.uri().to_string())
    }
}
