//! Cron scheduling for the background jobs (reminders, digests, pruning,
//! backups).
//!
//! This crate only decides *when* a job runs. Job bodies live in the server,
//! whose tick loop asks [`JobScheduler::due_jobs`] once a minute.

mod job_scheduler;
mod cron_expr;
mod entry;
mod job;

#[cfg(test)]
mod tests;

pub use self::job_scheduler::JobScheduler;
pub use self::cron_expr::{normalize_cron, parse_duration};
pub use self::entry::JobEntry;
pub use self::job::JobKind;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expression}' for job {job}: {reason}")]
    InvalidCron {
        job: String,
        expression: String,
        reason: String,
    },

    #[error("unknown job: {0}")]
    UnknownJob(String),
}
