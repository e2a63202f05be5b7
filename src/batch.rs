//! Concurrent refresh of one page of records.

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::types::{BatchCounts, Outcome, Record};
use crate::updater::RecordUpdater;

/// Fans a page out to one task per record and waits for every task.
///
/// A failing record never cancels its siblings. A task that dies without
/// producing an outcome (panic or abort) makes the whole page count as
/// failed, after the remaining tasks have settled.
pub struct BatchProcessor {
    updater: RecordUpdater,
}

impl BatchProcessor {
    pub fn new(updater: RecordUpdater) -> Self {
        Self { updater }
    }

    pub async fn process_batch(&self, records: Vec<Record>) -> BatchCounts {
        let page_size = records.len();
        let mut join_set = JoinSet::new();

        for record in records {
            let updater = self.updater.clone();
            join_set.spawn(async move { updater.update(&record).await });
        }

        let mut outcomes: Vec<Outcome> = Vec::with_capacity(page_size);
        let mut join_failed = false;
        while let Some(join_result) = join_set.join_next().await {
            match join_result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(error = e.to_string(), "record update task failed.");
                    join_failed = true;
                }
            }
        }

        if join_failed {
            error!(
                page_size = page_size,
                "batch join failed. counting the whole page as failed."
            );
            return BatchCounts::all_failed(page_size);
        }

        let counts = BatchCounts::from_outcomes(&outcomes);
        debug!(
            page_size = page_size,
            success_count = counts.success_count,
            error_count = counts.error_count,
            "batch processed."
        );
        counts
    }
}
