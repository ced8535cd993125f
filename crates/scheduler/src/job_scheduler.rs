//! [`JobScheduler`]: cron state for the background job table.

use std::collections::BTreeMap;

use bow_core::config::ScheduleConfig;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cron_expr::{is_cron_due, normalize_cron, parse_schedule};
use crate::entry::JobEntry;
use crate::job::JobKind;
use crate::SchedulerError;

/// Override values that switch a single job off.
const DISABLED_VALUES: &[&str] = &["off", "disabled", "none", "false"];

/// Tracks cron expression, enablement and last run for every job.
///
/// Call [`due_jobs`](JobScheduler::due_jobs) from the tick loop and
/// [`record_run`](JobScheduler::record_run) after each execution.
#[derive(Debug, Clone)]
pub struct JobScheduler {
    entries: BTreeMap<JobKind, JobEntry>,
}

impl JobScheduler {
    /// All jobs on their default schedules.
    pub fn new() -> Self {
        let entries = JobKind::ALL
            .into_iter()
            .filter_map(|job| {
                let schedule = parse_schedule(job.as_str(), job.default_cron()).ok()?;
                Some((
                    job,
                    JobEntry {
                        job,
                        expression: job.default_cron().to_string(),
                        cron_expression: normalize_cron(job.default_cron()),
                        schedule,
                        enabled: true,
                        last_run: None,
                        last_error: None,
                    },
                ))
            })
            .collect();
        Self { entries }
    }

    /// Defaults with `SCHEDULE_{JOB}` overrides applied. An override of
    /// `off` disables the job.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, SchedulerError> {
        let mut scheduler = Self::new();
        for job in JobKind::ALL {
            let Some(expression) = config.cron_override(job.as_str()) else {
                continue;
            };
            if DISABLED_VALUES.contains(&expression.trim().to_lowercase().as_str()) {
                scheduler.set_enabled(job, false);
                info!(job = %job, "job disabled by configuration");
            } else {
                scheduler.set_cron(job, expression)?;
                info!(job = %job, cron = %expression, "job schedule overridden");
            }
        }
        Ok(scheduler)
    }

    /// Replace a job's cron expression, keeping its run history.
    pub fn set_cron(&mut self, job: JobKind, expression: &str) -> Result<(), SchedulerError> {
        let schedule = parse_schedule(job.as_str(), expression)?;
        if let Some(entry) = self.entries.get_mut(&job) {
            entry.expression = expression.trim().to_string();
            entry.cron_expression = normalize_cron(expression);
            entry.schedule = schedule;
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, job: JobKind, enabled: bool) {
        if let Some(entry) = self.entries.get_mut(&job) {
            entry.enabled = enabled;
        }
    }

    /// Mark every job as having run at `now`, so that ticks missed while
    /// the process was down are not replayed on start-up.
    pub fn prime(&mut self, now: DateTime<Utc>) {
        for entry in self.entries.values_mut() {
            if entry.last_run.is_none() {
                entry.last_run = Some(now);
            }
        }
    }

    /// Whether a single job should run at the given instant.
    pub fn should_run(&self, job: JobKind, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.entries.get(&job) else {
            return false;
        };
        if !entry.enabled {
            debug!(job = %job, "job disabled");
            return false;
        }
        is_cron_due(&entry.schedule, now, entry.last_run)
    }

    /// Jobs due at `now`, in table order.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<JobKind> {
        self.entries
            .keys()
            .copied()
            .filter(|job| self.should_run(*job, now))
            .collect()
    }

    pub fn next_run(&self, job: JobKind, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries
            .get(&job)
            .filter(|e| e.enabled)
            .and_then(|e| e.next_after(now))
    }

    /// Record a run of `job` at `at` with its outcome.
    pub fn record_run(&mut self, job: JobKind, at: DateTime<Utc>, error: Option<String>) {
        if let Some(entry) = self.entries.get_mut(&job) {
            entry.last_run = Some(at);
            entry.last_error = error;
        }
    }

    pub fn get(&self, job: JobKind) -> Option<&JobEntry> {
        self.entries.get(&job)
    }

    pub fn entries(&self) -> impl Iterator<Item = &JobEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}
