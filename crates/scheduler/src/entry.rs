//! Per-job schedule entry type.

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::job::JobKind;

/// Scheduling state for a single job.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub job: JobKind,
    /// Expression as configured (usually 5 fields).
    pub expression: String,
    /// Normalized 6-field cron expression (seconds prepended).
    pub cron_expression: String,
    pub(crate) schedule: Schedule,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// Error message of the last run, `None` if it succeeded.
    pub last_error: Option<String>,
}

impl JobEntry {
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }
}
