//! Shared test utilities for the presign-refresh library crate.
//!
//! Mock collaborators record every call in `Arc<Mutex<..>>` so tests can
//! inspect them after handing a boxed clone to the code under test.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::config::Config;
use crate::notify::{NotifierTrait, OutgoingEmail};
use crate::storage::{MetadataStoreTrait, ObjectStoreTrait};
use crate::types::error::RefreshError;
use crate::types::{ATTR_ID, ATTR_OBJECT_KEY, ContinuationToken, Page, Record, format_attribute};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// A [`Config`] for `file-metadata` / `test-bucket` with all waits disabled.
pub(crate) fn make_test_config() -> Config {
    Config {
        inter_page_delay_milliseconds: 0,
        throttle_backoff_milliseconds: 0,
        ..Config::for_target("file-metadata", "test-bucket")
    }
}

/// Build a record from string attributes.
pub(crate) fn make_record(attributes: &[(&str, &str)]) -> Record {
    Record::new(
        attributes
            .iter()
            .map(|(name, value)| (name.to_string(), AttributeValue::S(value.to_string())))
            .collect(),
    )
}

pub(crate) fn make_token(value: &str) -> ContinuationToken {
    ContinuationToken::new(HashMap::from([(
        ATTR_ID.to_string(),
        AttributeValue::S(value.to_string()),
    )]))
}

/// A page of `count` records that refresh cleanly, with ids `<prefix>-<n>`.
pub(crate) fn make_valid_page(
    prefix: &str,
    count: usize,
    continuation_token: Option<ContinuationToken>,
) -> Page {
    let items = (0..count)
        .map(|i| {
            let id = format!("{prefix}-{i}");
            let object_key = format!("uploads/{id}.pdf");
            make_record(&[(ATTR_ID, id.as_str()), (ATTR_OBJECT_KEY, object_key.as_str())])
        })
        .collect();
    Page::new(items, continuation_token)
}

// ---------------------------------------------------------------------------
// Metadata store
// ---------------------------------------------------------------------------

/// One scripted response of [`MockMetadataStore::scan_page`].
#[derive(Debug, Clone)]
pub(crate) enum ScanStep {
    Page(Page),
    Throttled,
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScanCall {
    pub table: String,
    pub limit: i32,
    pub continuation_token: Option<ContinuationToken>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpdateCall {
    pub table: String,
    pub key: HashMap<String, AttributeValue>,
    pub fields: HashMap<String, AttributeValue>,
}

/// Replays scripted scan steps; once the script runs out every scan returns
/// an empty last page.
#[derive(Clone, Default)]
pub(crate) struct MockMetadataStore {
    script: Arc<Mutex<VecDeque<ScanStep>>>,
    scans: Arc<Mutex<Vec<ScanCall>>>,
    updates: Arc<Mutex<Vec<UpdateCall>>>,
    failing_update_keys: Vec<String>,
}

impl MockMetadataStore {
    pub fn new(pages: Vec<Page>) -> Self {
        Self::scripted(pages.into_iter().map(ScanStep::Page).collect())
    }

    pub fn scripted(steps: Vec<ScanStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            ..Self::default()
        }
    }

    /// Reject updates whose key contains an attribute rendered as `key_value`.
    pub fn with_failing_update(mut self, key_value: &str) -> Self {
        self.failing_update_keys.push(key_value.to_string());
        self
    }

    pub fn scans(&self) -> Vec<ScanCall> {
        self.scans.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataStoreTrait for MockMetadataStore {
    async fn scan_page(
        &self,
        table: &str,
        limit: i32,
        continuation_token: Option<ContinuationToken>,
    ) -> Result<Page> {
        self.scans.lock().unwrap().push(ScanCall {
            table: table.to_string(),
            limit,
            continuation_token,
        });

        match self.script.lock().unwrap().pop_front() {
            Some(ScanStep::Page(page)) => Ok(page),
            Some(ScanStep::Throttled) => Err(anyhow!(RefreshError::Throttled(
                "ProvisionedThroughputExceededException".to_string()
            ))),
            Some(ScanStep::Fatal(message)) => Err(anyhow!(RefreshError::Store(message))),
            None => Ok(Page::default()),
        }
    }

    async fn partial_update(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        fields: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        let rejected = key.values().any(|value| {
            self.failing_update_keys
                .contains(&format_attribute(value))
        });
        if rejected {
            return Err(anyhow!(RefreshError::Store(
                "ConditionalCheckFailedException: update rejected".to_string()
            )));
        }

        self.updates.lock().unwrap().push(UpdateCall {
            table: table.to_string(),
            key,
            fields,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SignCall {
    pub bucket: String,
    pub object_key: String,
    pub expiration: Duration,
}

/// Returns `https://<bucket>.example.com/<key>?expires=<secs>`.
#[derive(Clone, Default)]
pub(crate) struct MockObjectStore {
    calls: Arc<Mutex<Vec<SignCall>>>,
    failing_keys: Vec<String>,
    panicking_keys: Vec<String>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(object_keys: &[&str]) -> Self {
        Self {
            failing_keys: object_keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn panicking_for(object_keys: &[&str]) -> Self {
        Self {
            panicking_keys: object_keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SignCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStoreTrait for MockObjectStore {
    async fn sign_url(
        &self,
        bucket: &str,
        object_key: &str,
        expiration: Duration,
    ) -> Result<String> {
        if self.panicking_keys.iter().any(|k| k == object_key) {
            panic!("mock object store panicked on {object_key}");
        }

        self.calls.lock().unwrap().push(SignCall {
            bucket: bucket.to_string(),
            object_key: object_key.to_string(),
            expiration,
        });

        if self.failing_keys.iter().any(|k| k == object_key) {
            return Err(anyhow!(RefreshError::Upstream(
                "AccessDenied: signing refused".to_string()
            )));
        }

        Ok(format!(
            "https://{bucket}.example.com/{object_key}?expires={}",
            expiration.as_secs()
        ))
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct MockNotifier {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt, then fails delivery.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierTrait for MockNotifier {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(anyhow!(RefreshError::Notification(
                "MessageRejected: Email address is not verified.".to_string()
            )));
        }
        Ok(())
    }
}
