//! Presigned URL generation for a single object reference.

use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::storage::ObjectStore;
use crate::types::error::RefreshError;

/// Issues presigned read URLs for objects in one bucket.
///
/// The expiration window is fixed when the generator is built and applies to
/// every URL of the run.
#[derive(Clone)]
pub struct CredentialGenerator {
    object_store: ObjectStore,
    bucket: String,
    expiration: Duration,
}

impl CredentialGenerator {
    pub fn new(object_store: ObjectStore, bucket: &str, expiration: Duration) -> Self {
        Self {
            object_store,
            bucket: bucket.to_string(),
            expiration,
        }
    }

    pub fn from_config(object_store: ObjectStore, config: &Config) -> Self {
        Self::new(object_store, &config.bucket_name, config.url_expiration())
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Presign `object_key`.
    ///
    /// An empty key is rejected with [`RefreshError::InvalidReference`] before
    /// the object store is consulted; any object store failure comes back as
    /// [`RefreshError::Upstream`]. Nothing is retried here.
    pub async fn generate(&self, object_key: &str) -> Result<String, RefreshError> {
        if object_key.trim().is_empty() {
            return Err(RefreshError::InvalidReference(
                "object key is empty".to_string(),
            ));
        }

        let url = self
            .object_store
            .sign_url(&self.bucket, object_key, self.expiration)
            .await
            .map_err(|e| match e.downcast::<RefreshError>() {
                Ok(RefreshError::Upstream(message)) => RefreshError::Upstream(message),
                Ok(other) => RefreshError::Upstream(other.to_string()),
                Err(e) => RefreshError::Upstream(format!("{e:#}")),
            })?;

        debug!(
            bucket = self.bucket,
            object_key = object_key,
            expiration_secs = self.expiration.as_secs(),
            "presigned URL generated."
        );

        Ok(url)
    }
}
