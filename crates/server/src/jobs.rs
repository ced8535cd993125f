//! Bodies of the scheduled jobs and the tick loop that runs them.
//!
//! Jobs run sequentially. A failing job is logged, recorded in `job_runs`
//! and on the scheduler entry, and never stops the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use bow_core::models::{NotificationKind, User};
use bow_core::reminders;
use bow_scheduler::{parse_duration, JobKind};
use bow_storage::{BackupInfo, Snapshot};

use crate::messaging::{self, Delivery};
use crate::repo;
use crate::state::AppState;

const TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobReport {
    pub job: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: String,
}

/// Outcome of writing a backup and applying retention.
#[derive(Debug, Clone, Serialize)]
pub struct BackupOutcome {
    pub backup: BackupInfo,
    pub pruned: Vec<String>,
}

#[derive(Debug, Default)]
struct Tally {
    selected: usize,
    stored: usize,
    emailed: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, delivery: anyhow::Result<Delivery>) {
        match delivery {
            Ok(d) => {
                self.stored += usize::from(d.stored);
                self.emailed += usize::from(d.emailed);
            }
            Err(e) => {
                self.failed += 1;
                warn!(error = %format!("{e:#}"), "notification failed");
            }
        }
    }

    fn summary(&self) -> String {
        format!(
            "{} selected, {} stored, {} e-mailed, {} failed",
            self.selected, self.stored, self.emailed, self.failed
        )
    }
}

fn require_pool(state: &AppState) -> anyhow::Result<&PgPool> {
    state.pg_pool.as_ref().context("PostgreSQL not configured")
}

/// Run one job now, record the outcome and return a report.
pub async fn run_job(state: &AppState, job: JobKind) -> anyhow::Result<JobReport> {
    let started_at = Utc::now();
    info!(job = %job, "job started");
    let outcome = execute(state, job, started_at).await;
    let finished_at = Utc::now();

    let error = outcome.as_ref().err().map(|e| format!("{e:#}"));
    state.scheduler.lock().await.record_run(job, started_at, error.clone());

    if let Some(pool) = &state.pg_pool {
        let summary = outcome.as_ref().ok().map(String::as_str);
        if let Err(e) =
            repo::record_job_run(pool, job.as_str(), started_at, finished_at, summary, error.as_deref()).await
        {
            warn!(job = %job, error = %e, "could not record job run");
        }
    }

    match outcome {
        Ok(summary) => {
            info!(job = %job, summary = %summary, "job finished");
            Ok(JobReport {
                job: job.as_str().to_string(),
                started_at,
                finished_at,
                summary,
            })
        }
        Err(e) => {
            error!(job = %job, error = %format!("{e:#}"), "job failed");
            Err(e)
        }
    }
}

async fn execute(state: &AppState, job: JobKind, now: DateTime<Utc>) -> anyhow::Result<String> {
    match job {
        JobKind::WeeklyDigest => weekly_digest(state, now).await,
        JobKind::PruneNotifications => prune_notifications(state, now).await,
        JobKind::Backup => {
            let outcome = create_backup(state, now).await?;
            Ok(format!(
                "wrote {} ({} bytes), pruned {}",
                outcome.backup.name,
                outcome.backup.size_bytes,
                outcome.pruned.len()
            ))
        }
        reminder_job => send_reminders(state, reminder_job, now).await,
    }
}

async fn active_users(pool: &PgPool) -> anyhow::Result<HashMap<Uuid, User>> {
    Ok(repo::users::active(pool)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

async fn send_reminders(state: &AppState, job: JobKind, now: DateTime<Utc>) -> anyhow::Result<String> {
    let pool = require_pool(state)?;
    let today = now.date_naive();
    let schedule = &state.config.schedule;
    let window = schedule.reminder_window_days;

    let selected = match job {
        JobKind::DeadlineReminders => {
            reminders::deadline_reminders(&repo::work_items::open(pool).await?, today, window)
        }
        JobKind::OverdueAlerts => reminders::overdue_items(&repo::work_items::open(pool).await?, today),
        JobKind::RiskReviewReminders => reminders::risk_reviews_due(&repo::risks::open(pool).await?, today, window),
        JobKind::ContractExpiryAlerts => reminders::expiring_contracts(
            &repo::suppliers::with_contracts(pool).await?,
            today,
            schedule.contract_expiry_window_days,
        ),
        JobKind::GovernanceReviewReminders => {
            reminders::governance_reviews_due(&repo::governance::current(pool).await?, today, window)
        }
        other => anyhow::bail!("{other} does not send reminders"),
    };

    let users = active_users(pool).await?;
    let mut tally = Tally {
        selected: selected.len(),
        ..Default::default()
    };
    for reminder in &selected {
        // Inactive or deleted recipients get nothing.
        let Some(user) = users.get(&reminder.recipient_id) else {
            continue;
        };
        let ctx = messaging::reminder_context(state, user, reminder);
        let delivery = messaging::deliver(
            state,
            pool,
            user,
            reminder.kind,
            &ctx,
            Some(reminder.link.clone()),
            Some(reminder.dedupe_key.clone()),
        )
        .await;
        tally.record(delivery);
    }
    Ok(tally.summary())
}

async fn weekly_digest(state: &AppState, now: DateTime<Utc>) -> anyhow::Result<String> {
    let pool = require_pool(state)?;
    let today = now.date_naive();
    let open = repo::work_items::open(pool).await?;
    let users = repo::users::active(pool).await?;

    let mut tally = Tally::default();
    for user in &users {
        let Some(digest) = reminders::weekly_digest(user, &open, today) else {
            continue;
        };
        tally.selected += 1;
        let ctx = messaging::digest_context(state, user, &digest);
        let delivery = messaging::deliver(
            state,
            pool,
            user,
            NotificationKind::WeeklyDigest,
            &ctx,
            Some("/work-items".to_string()),
            Some(digest.dedupe_key.clone()),
        )
        .await;
        tally.record(delivery);
    }
    Ok(tally.summary())
}

async fn prune_notifications(state: &AppState, now: DateTime<Utc>) -> anyhow::Result<String> {
    let pool = require_pool(state)?;
    let raw = &state.config.schedule.notification_retention;
    let retention = parse_duration(raw).with_context(|| format!("invalid NOTIFICATION_RETENTION '{raw}'"))?;
    let cutoff = now - chrono::Duration::from_std(retention)?;
    let deleted = repo::notifications::prune_read(pool, cutoff).await?;
    Ok(format!("deleted {deleted} read notifications older than {raw}"))
}

/// Snapshot every table to the backup store, then apply retention.
pub async fn create_backup(state: &AppState, now: DateTime<Utc>) -> anyhow::Result<BackupOutcome> {
    let pool = require_pool(state)?;
    let store = state.backups.as_ref().context("backup storage not configured")?;

    let snapshot = repo::dump_tables(pool)
        .await?
        .into_iter()
        .fold(Snapshot::new(now), |snapshot, (table, rows)| snapshot.with_table(table, rows));
    let backup = store.write_snapshot(&snapshot).await?;

    let keep = &state.config.backup;
    let pruned = store.prune(now, keep.keep_days, keep.keep_min as usize).await?;
    info!(
        name = %backup.name,
        size_bytes = backup.size_bytes,
        pruned = pruned.len(),
        location = %store.location(),
        "backup written"
    );
    Ok(BackupOutcome { backup, pruned })
}

/// Run due jobs once. Returns the jobs that were due.
pub async fn tick(state: &AppState, now: DateTime<Utc>) -> Vec<JobKind> {
    let due = state.scheduler.lock().await.due_jobs(now);
    for job in &due {
        // Failures are logged and recorded by run_job.
        let _ = run_job(state, *job).await;
    }
    due
}

/// Start the minute tick loop. Missed ticks are not replayed.
pub fn spawn_scheduler(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        state.scheduler.lock().await.prime(Utc::now());
        info!("job scheduler started");

        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            tick(&state, Utc::now()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_job_is_recorded_on_the_scheduler() {
        let state = AppState::for_tests();
        let err = run_job(&state, JobKind::OverdueAlerts).await.unwrap_err();
        assert!(err.to_string().contains("PostgreSQL"), "got: {err}");

        let scheduler = state.scheduler.lock().await;
        let entry = scheduler.get(JobKind::OverdueAlerts).unwrap();
        assert!(entry.last_error.as_deref().unwrap().contains("PostgreSQL"));
    }

    #[tokio::test]
    async fn primed_scheduler_has_nothing_due() {
        let state = AppState::for_tests();
        let due = tick(&state, Utc::now()).await;
        assert!(due.is_empty());
    }

    #[test]
    fn tally_counts_deliveries() {
        let mut tally = Tally {
            selected: 3,
            ..Default::default()
        };
        tally.record(Ok(Delivery { stored: true, emailed: true }));
        tally.record(Ok(Delivery::default()));
        tally.record(Err(anyhow::anyhow!("smtp down")));
        assert_eq!(tally.summary(), "3 selected, 1 stored, 1 e-mailed, 1 failed");
    }
}
