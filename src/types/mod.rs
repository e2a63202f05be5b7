use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use aws_sdk_dynamodb::types::AttributeValue;

pub mod error;
pub mod summary;

/// Primary name field. Half of the composite key.
pub const ATTR_FILE_NAME: &str = "fileName";
/// Selection identifier. The other half of the composite key.
pub const ATTR_SELECTION_ID: &str = "selectionId";
/// Generic identifier, the weakest key fallback.
pub const ATTR_ID: &str = "id";
/// Object key in the bucket that the presigned URL points at.
pub const ATTR_OBJECT_KEY: &str = "s3Key";
/// Presigned URL owned by this job.
pub const ATTR_PRESIGNED_URL: &str = "presignedUrl";
/// ISO-8601 time of the last regeneration attempt.
pub const ATTR_PRESIGNED_URL_UPDATED_AT: &str = "presignedUrlUpdatedAt";

/// One item of the metadata table.
///
/// Wraps the raw DynamoDB item. Only the identifying attributes, the object
/// reference and the two URL attributes are interpreted; everything else is
/// carried along untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(HashMap<String, AttributeValue>);

impl Record {
    pub fn new(item: HashMap<String, AttributeValue>) -> Self {
        Self(item)
    }

    /// Returns the attribute if it is present and carries a value.
    ///
    /// `NULL` attributes and empty strings count as absent.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name).filter(|value| is_present(value))
    }

    /// The object key used to regenerate the presigned URL.
    pub fn object_key(&self) -> Option<&str> {
        self.attribute(ATTR_OBJECT_KEY)
            .and_then(|value| value.as_s().ok())
            .map(String::as_str)
    }
}

fn is_present(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Null(_) => false,
        AttributeValue::S(s) => !s.is_empty(),
        _ => true,
    }
}

/// Renders a key attribute for logs and error messages.
pub fn format_attribute(value: &AttributeValue) -> String {
    match value {
        AttributeValue::S(s) => s.clone(),
        AttributeValue::N(n) => n.clone(),
        AttributeValue::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

/// The attributes that address a record in the metadata table.
///
/// Attribute values keep their DynamoDB type, so a numeric `id` is sent back
/// as a number.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    Composite {
        file_name: AttributeValue,
        selection_id: AttributeValue,
    },
    FileName(AttributeValue),
    SelectionId(AttributeValue),
    Id(AttributeValue),
}

impl RecordKey {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Composite { .. } => "composite",
            Self::FileName(_) => ATTR_FILE_NAME,
            Self::SelectionId(_) => ATTR_SELECTION_ID,
            Self::Id(_) => ATTR_ID,
        }
    }

    /// Converts the key into the attribute map expected by `UpdateItem`.
    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        let mut key = HashMap::with_capacity(2);
        match self {
            Self::Composite {
                file_name,
                selection_id,
            } => {
                key.insert(ATTR_FILE_NAME.to_string(), file_name);
                key.insert(ATTR_SELECTION_ID.to_string(), selection_id);
            }
            Self::FileName(value) => {
                key.insert(ATTR_FILE_NAME.to_string(), value);
            }
            Self::SelectionId(value) => {
                key.insert(ATTR_SELECTION_ID.to_string(), value);
            }
            Self::Id(value) => {
                key.insert(ATTR_ID.to_string(), value);
            }
        }
        key
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composite {
                file_name,
                selection_id,
            } => write!(
                f,
                "{ATTR_FILE_NAME}={},{ATTR_SELECTION_ID}={}",
                format_attribute(file_name),
                format_attribute(selection_id)
            ),
            Self::FileName(value) => write!(f, "{ATTR_FILE_NAME}={}", format_attribute(value)),
            Self::SelectionId(value) => {
                write!(f, "{ATTR_SELECTION_ID}={}", format_attribute(value))
            }
            Self::Id(value) => write!(f, "{ATTR_ID}={}", format_attribute(value)),
        }
    }
}

/// Opaque scan cursor (DynamoDB `LastEvaluatedKey`).
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(HashMap<String, AttributeValue>);

impl ContinuationToken {
    pub fn new(last_evaluated_key: HashMap<String, AttributeValue>) -> Self {
        Self(last_evaluated_key)
    }

    /// An absent or empty `LastEvaluatedKey` ends the scan.
    pub fn from_last_evaluated_key(
        last_evaluated_key: Option<&HashMap<String, AttributeValue>>,
    ) -> Option<Self> {
        last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(|key| Self(key.clone()))
    }

    pub fn into_inner(self) -> HashMap<String, AttributeValue> {
        self.0
    }
}

/// One page of a table scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub continuation_token: Option<ContinuationToken>,
}

impl Page {
    pub fn new(items: Vec<Record>, continuation_token: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation_token,
        }
    }
}

/// Why a single record could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No object reference, or presigning it failed.
    NoCredentialGenerated,
    UnresolvableKey,
    /// The partial update was rejected by the metadata store.
    UpdateFailed(String),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentialGenerated => write!(f, "no credential generated"),
            Self::UnresolvableKey => write!(f, "unresolvable key"),
            Self::UpdateFailed(message) => write!(f, "{message}"),
        }
    }
}

/// Result of refreshing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

impl Outcome {
    pub fn failure(reason: FailureReason) -> Self {
        Self::Failure(reason)
    }
}

/// Error counts split by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureBreakdown {
    pub no_credential: u64,
    pub unresolvable_key: u64,
    pub update_failed: u64,
    /// Records counted as failed because the page's join itself broke down.
    pub join_failed: u64,
    /// Page fetches rejected with a throttling error.
    pub fetch_throttled: u64,
}

impl FailureBreakdown {
    pub fn record(&mut self, reason: &FailureReason) {
        match reason {
            FailureReason::NoCredentialGenerated => self.no_credential += 1,
            FailureReason::UnresolvableKey => self.unresolvable_key += 1,
            FailureReason::UpdateFailed(_) => self.update_failed += 1,
        }
    }

    pub fn merge(&mut self, other: &FailureBreakdown) {
        self.no_credential += other.no_credential;
        self.unresolvable_key += other.unresolvable_key;
        self.update_failed += other.update_failed;
        self.join_failed += other.join_failed;
        self.fetch_throttled += other.fetch_throttled;
    }

    pub fn total(&self) -> u64 {
        self.no_credential
            + self.unresolvable_key
            + self.update_failed
            + self.join_failed
            + self.fetch_throttled
    }
}

/// Per-page tally produced by the batch processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub success_count: u64,
    pub error_count: u64,
    pub failures: FailureBreakdown,
}

impl BatchCounts {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut counts = BatchCounts::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Success => counts.success_count += 1,
                Outcome::Failure(reason) => {
                    counts.error_count += 1;
                    counts.failures.record(reason);
                }
            }
        }
        counts
    }

    /// Every record of the page counted as failed.
    pub fn all_failed(page_size: usize) -> Self {
        BatchCounts {
            success_count: 0,
            error_count: page_size as u64,
            failures: FailureBreakdown {
                join_failed: page_size as u64,
                ..FailureBreakdown::default()
            },
        }
    }

    pub fn total(&self) -> u64 {
        self.success_count + self.error_count
    }
}

/// Running totals owned by the pagination loop for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records seen across all fetched pages.
    pub processed_count: u64,
    pub success_count: u64,
    /// Per-record failures plus throttled page fetches.
    pub error_count: u64,
    pub page_count: u64,
    pub failures: FailureBreakdown,
}

impl RunStats {
    pub fn absorb_page(&mut self, page_size: usize, counts: &BatchCounts) {
        self.processed_count += page_size as u64;
        self.success_count += counts.success_count;
        self.error_count += counts.error_count;
        self.page_count += 1;
        self.failures.merge(&counts.failures);
    }

    pub fn record_throttled_fetch(&mut self) {
        self.error_count += 1;
        self.failures.fetch_throttled += 1;
    }
}
