//! Per-record refresh: presign, stage, resolve, write.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::credential::CredentialGenerator;
use crate::key_resolver::resolve_key;
use crate::storage::MetadataStore;
use crate::types::{
    ATTR_PRESIGNED_URL, ATTR_PRESIGNED_URL_UPDATED_AT, FailureReason, Outcome, Record,
};

/// Refreshes the presigned URL of one record at a time.
///
/// Cheap to clone; the batch processor hands one clone to every task of a
/// page. `update` never returns an error: every failure becomes an
/// [`Outcome::Failure`].
#[derive(Clone)]
pub struct RecordUpdater {
    generator: CredentialGenerator,
    metadata_store: MetadataStore,
    table: String,
    dry_run: bool,
}

impl RecordUpdater {
    pub fn new(
        generator: CredentialGenerator,
        metadata_store: MetadataStore,
        table: &str,
        dry_run: bool,
    ) -> Self {
        Self {
            generator,
            metadata_store,
            table: table.to_string(),
            dry_run,
        }
    }

    pub async fn update(&self, record: &Record) -> Outcome {
        let mut fields = HashMap::with_capacity(2);

        if let Some(object_key) = record.object_key() {
            match self.generator.generate(object_key).await {
                Ok(url) => {
                    fields.insert(ATTR_PRESIGNED_URL.to_string(), AttributeValue::S(url));
                }
                Err(e) => {
                    warn!(
                        table = self.table,
                        object_key = object_key,
                        error = e.to_string(),
                        "failed to generate presigned URL."
                    );
                }
            }
        }

        fields.insert(
            ATTR_PRESIGNED_URL_UPDATED_AT.to_string(),
            AttributeValue::S(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        if !fields.contains_key(ATTR_PRESIGNED_URL) {
            debug!(
                table = self.table,
                "no presigned URL staged, record left untouched."
            );
            return Outcome::failure(FailureReason::NoCredentialGenerated);
        }

        let Some(key) = resolve_key(record) else {
            warn!(
                table = self.table,
                object_key = record.object_key(),
                "record has no fileName, selectionId or id. skipping update."
            );
            return Outcome::failure(FailureReason::UnresolvableKey);
        };

        let record_key = key.to_string();
        let key_kind = key.kind();

        if self.dry_run {
            info!(
                table = self.table,
                record_key = record_key,
                "[dry-run] presigned URL refreshed, update skipped."
            );
            return Outcome::Success;
        }

        match self
            .metadata_store
            .partial_update(&self.table, key.into_attributes(), fields)
            .await
        {
            Ok(()) => {
                debug!(
                    table = self.table,
                    record_key = record_key,
                    key_kind = key_kind,
                    "presigned URL updated."
                );
                Outcome::Success
            }
            Err(e) => {
                warn!(
                    table = self.table,
                    record_key = record_key,
                    error = format!("{e:#}"),
                    "failed to update record."
                );
                Outcome::failure(FailureReason::UpdateFailed(e.to_string()))
            }
        }
    }
}
