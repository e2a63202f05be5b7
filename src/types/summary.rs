use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::{FailureBreakdown, RunStats};

/// Terminal status of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failed,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// End-of-run report handed to the notifier exactly once per invocation.
///
/// Table and bucket are optional because a configuration failure can leave
/// them unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub total_processed: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub failures: FailureBreakdown,
    pub duration: Duration,
    pub start_time: DateTime<Utc>,
    pub table_name: Option<String>,
    pub bucket_name: Option<String>,
    pub expiration_days: Option<u32>,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl JobSummary {
    pub fn duration_string(&self) -> String {
        format_duration(self.duration)
    }

    pub(crate) fn apply_stats(&mut self, stats: &RunStats) {
        self.total_processed = stats.processed_count;
        self.success_count = stats.success_count;
        self.error_count = stats.error_count;
        self.failures = stats.failures;
    }
}

/// Seconds with millisecond precision, e.g. `1.234s`.
pub fn format_duration(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}
