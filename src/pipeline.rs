//! Pagination driver.
//!
//! Walks the metadata table one page at a time and feeds every page to the
//! [`BatchProcessor`]. Pages are strictly sequential: the next fetch needs the
//! continuation token of the current page, and a page's batch fully settles
//! before the next fetch starts.
//!
//! ```text
//!                 ┌──────── page ok, token ────────┐
//!                 ▼                                │
//!   start ──▶ Scanning ──── page ok, no token ──▶ Done
//!              │    ▲
//!     throttled│    │backoff elapsed
//!              ▼    │
//!           ThrottleWait         any other error ──▶ Fatal
//! ```
//!
//! A throttled fetch is retried with the same continuation token, so no page
//! is skipped or fetched twice. Too many consecutive throttles turn the run
//! fatal.

use std::time::Duration;

use anyhow::Error;
use tracing::{debug, error, info, warn};

use crate::batch::BatchProcessor;
use crate::config::{Config, PAGE_SIZE};
use crate::credential::CredentialGenerator;
use crate::storage::{MetadataStore, ObjectStore};
use crate::types::error::is_throttling_error;
use crate::types::{ContinuationToken, Page, RunStats};
use crate::updater::RecordUpdater;

/// States of the pagination loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Scanning,
    ThrottleWait,
    Done,
    Fatal,
}

/// What the driver hands back: the counters accumulated so far and, for a
/// fatal run, the error that stopped it.
#[derive(Debug)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub final_state: ScanState,
    pub error: Option<Error>,
}

impl RunOutcome {
    pub fn is_fatal(&self) -> bool {
        self.final_state == ScanState::Fatal
    }
}

pub struct PaginationDriver {
    metadata_store: MetadataStore,
    batch_processor: BatchProcessor,
    table: String,
    page_size: i32,
    inter_page_delay: Duration,
    throttle_backoff: Duration,
    max_throttle_retries: u32,
}

impl PaginationDriver {
    /// Wire the driver and the per-record components from one configuration.
    pub fn new(config: &Config, metadata_store: MetadataStore, object_store: ObjectStore) -> Self {
        let generator = CredentialGenerator::from_config(object_store, config);
        let updater = RecordUpdater::new(
            generator,
            metadata_store.clone(),
            &config.table_name,
            config.dry_run,
        );

        Self {
            metadata_store,
            batch_processor: BatchProcessor::new(updater),
            table: config.table_name.clone(),
            page_size: PAGE_SIZE,
            inter_page_delay: config.inter_page_delay(),
            throttle_backoff: config.throttle_backoff(),
            max_throttle_retries: config.max_throttle_retries,
        }
    }

    /// Run the loop until it reaches `Done` or `Fatal`.
    pub async fn run(&self) -> RunOutcome {
        let mut stats = RunStats::default();
        let mut continuation_token: Option<ContinuationToken> = None;
        let mut consecutive_throttles: u32 = 0;
        let mut fatal_error: Option<Error> = None;
        let mut state = ScanState::Scanning;

        loop {
            state = match state {
                ScanState::Scanning => {
                    match self
                        .metadata_store
                        .scan_page(&self.table, self.page_size, continuation_token.clone())
                        .await
                    {
                        Ok(page) => {
                            consecutive_throttles = 0;
                            let next_token = self.process_page(page, &mut stats).await;
                            match next_token {
                                Some(token) => {
                                    continuation_token = Some(token);
                                    if !self.inter_page_delay.is_zero() {
                                        tokio::time::sleep(self.inter_page_delay).await;
                                    }
                                    ScanState::Scanning
                                }
                                None => ScanState::Done,
                            }
                        }
                        Err(e) if is_throttling_error(&e) => {
                            stats.record_throttled_fetch();
                            consecutive_throttles += 1;

                            if consecutive_throttles > self.max_throttle_retries {
                                error!(
                                    table = self.table,
                                    consecutive_throttles = consecutive_throttles,
                                    "page fetch still throttled after {} retries. giving up.",
                                    self.max_throttle_retries,
                                );
                                fatal_error = Some(e.context(format!(
                                    "page fetch throttled {consecutive_throttles} times in a row"
                                )));
                                ScanState::Fatal
                            } else {
                                warn!(
                                    table = self.table,
                                    consecutive_throttles = consecutive_throttles,
                                    error = e.to_string(),
                                    "page fetch throttled. retrying the same page."
                                );
                                ScanState::ThrottleWait
                            }
                        }
                        Err(e) => {
                            error!(
                                table = self.table,
                                error = format!("{e:#}"),
                                "page fetch failed. aborting the run."
                            );
                            fatal_error = Some(e);
                            ScanState::Fatal
                        }
                    }
                }
                ScanState::ThrottleWait => {
                    if !self.throttle_backoff.is_zero() {
                        tokio::time::sleep(self.throttle_backoff).await;
                    }
                    ScanState::Scanning
                }
                ScanState::Done | ScanState::Fatal => break,
            };
        }

        debug!(
            table = self.table,
            state = ?state,
            pages = stats.page_count,
            processed_count = stats.processed_count,
            "pagination finished."
        );

        RunOutcome {
            stats,
            final_state: state,
            error: fatal_error,
        }
    }

    /// Process one fetched page and return the token of the next one.
    async fn process_page(&self, page: Page, stats: &mut RunStats) -> Option<ContinuationToken> {
        let Page {
            items,
            continuation_token,
        } = page;

        if items.is_empty() {
            debug!(table = self.table, "empty page.");
            return continuation_token;
        }

        let page_size = items.len();
        let counts = self.batch_processor.process_batch(items).await;
        stats.absorb_page(page_size, &counts);

        info!(
            table = self.table,
            page = stats.page_count,
            page_size = page_size,
            success_count = counts.success_count,
            error_count = counts.error_count,
            processed_count = stats.processed_count,
            "page processed."
        );

        continuation_token
    }
}
