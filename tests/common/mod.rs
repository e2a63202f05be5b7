//! Shared infrastructure for the job scenario tests.
//!
//! In-memory collaborators implementing the public storage and notifier
//! traits. Each mock records its calls so scenarios can assert on them after
//! `RefreshJob::handle` returns.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use presign_refresh::notify::{NotifierTrait, OutgoingEmail};
use presign_refresh::storage::{MetadataStoreTrait, ObjectStoreTrait};
use presign_refresh::types::{ContinuationToken, Page, Record};
use presign_refresh::{Collaborators, Config, RefreshError, RefreshJob};

pub enum Scan {
    Page(Page),
    Throttled,
    Fatal(&'static str),
}

/// Table contents served page by page, plus every call received.
#[derive(Clone, Default)]
pub struct InMemoryTable {
    script: Arc<Mutex<VecDeque<Scan>>>,
    pub scan_tokens: Arc<Mutex<Vec<Option<ContinuationToken>>>>,
    pub updates: Arc<Mutex<Vec<(HashMap<String, AttributeValue>, HashMap<String, AttributeValue>)>>>,
}

impl InMemoryTable {
    pub fn new(script: Vec<Scan>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    pub fn scan_count(&self) -> usize {
        self.scan_tokens.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl MetadataStoreTrait for InMemoryTable {
    async fn scan_page(
        &self,
        _table: &str,
        _limit: i32,
        continuation_token: Option<ContinuationToken>,
    ) -> Result<Page> {
        self.scan_tokens.lock().unwrap().push(continuation_token);
        match self.script.lock().unwrap().pop_front() {
            Some(Scan::Page(page)) => Ok(page),
            Some(Scan::Throttled) => Err(anyhow!(RefreshError::Throttled(
                "ProvisionedThroughputExceededException".to_string()
            ))),
            Some(Scan::Fatal(message)) => Err(anyhow!(RefreshError::Store(message.to_string()))),
            None => Ok(Page::default()),
        }
    }

    async fn partial_update(
        &self,
        _table: &str,
        key: HashMap<String, AttributeValue>,
        fields: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        self.updates.lock().unwrap().push((key, fields));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeSigner {
    pub signed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ObjectStoreTrait for FakeSigner {
    async fn sign_url(&self, bucket: &str, object_key: &str, expiration: Duration) -> Result<String> {
        self.signed.lock().unwrap().push(object_key.to_string());
        Ok(format!(
            "https://{bucket}.s3.amazonaws.com/{object_key}?X-Amz-Expires={}",
            expiration.as_secs()
        ))
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    pub fail: bool,
}

#[async_trait]
impl NotifierTrait for RecordingNotifier {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(anyhow!(RefreshError::Notification(
                "Throttling: Maximum sending rate exceeded.".to_string()
            )));
        }
        Ok(())
    }
}

pub struct Harness {
    pub table: InMemoryTable,
    pub signer: FakeSigner,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(script: Vec<Scan>) -> Self {
        Self {
            table: InMemoryTable::new(script),
            signer: FakeSigner::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    pub fn with_failing_notifier(mut self) -> Self {
        self.notifier.fail = true;
        self
    }

    pub fn job(&self) -> RefreshJob {
        RefreshJob::new(Collaborators {
            metadata_store: Box::new(self.table.clone()),
            object_store: Box::new(self.signer.clone()),
            notifier: Box::new(self.notifier.clone()),
        })
    }
}

/// Config with waits disabled and notification addresses set.
pub fn test_config() -> Config {
    let mut config = Config::for_target("file-metadata", "test-bucket");
    config.inter_page_delay_milliseconds = 0;
    config.throttle_backoff_milliseconds = 0;
    config.sender_email = Some("jobs@example.com".to_string());
    config.recipient_emails = vec!["ops@example.com".to_string()];
    config
}

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

/// A record addressed by `fileName` + `selectionId` with an object key.
pub fn file_record(file_name: &str, selection_id: &str) -> Record {
    Record::new(HashMap::from([
        ("fileName".to_string(), s(file_name)),
        ("selectionId".to_string(), s(selection_id)),
        ("s3Key".to_string(), s(&format!("uploads/{file_name}"))),
    ]))
}

pub fn files_page(prefix: &str, count: usize, next: Option<&str>) -> Page {
    let items = (0..count)
        .map(|i| file_record(&format!("{prefix}-{i}.pdf"), &format!("sel-{i}")))
        .collect();
    Page::new(items, next.map(token))
}

pub fn token(value: &str) -> ContinuationToken {
    ContinuationToken::new(HashMap::from([("fileName".to_string(), s(value))]))
}
