//! Tests for the job scheduler.

use std::time::Duration;

use bow_core::config::ScheduleConfig;
use chrono::{DateTime, Utc};

use crate::{normalize_cron, parse_duration, JobKind, JobScheduler, SchedulerError};

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

fn config(overrides: &[(&str, &str)]) -> ScheduleConfig {
    ScheduleConfig {
        cron_overrides: overrides
            .iter()
            .map(|(job, cron)| (job.to_string(), cron.to_string()))
            .collect(),
        ..ScheduleConfig::default()
    }
}

// -- normalize_cron ----------------------------------------------------

#[test]
fn normalize_cron_5_to_6_fields() {
    assert_eq!(normalize_cron("*/15 * * * *"), "0 */15 * * * *");
    assert_eq!(normalize_cron("0 7 * * Mon"), "0 0 7 * * Mon");
}

#[test]
fn normalize_cron_passes_6_fields_and_trims() {
    assert_eq!(normalize_cron("0 */15 * * * *"), "0 */15 * * * *");
    assert_eq!(normalize_cron("  */5 * * * *  "), "0 */5 * * * *");
}

// -- parse_duration ----------------------------------------------------

#[test]
fn parse_duration_units() {
    assert_eq!(parse_duration("90d"), Some(Duration::from_secs(90 * 86_400)));
    assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3_600)));
    assert_eq!(
        parse_duration("1d2h30m15s"),
        Some(Duration::from_secs(86_400 + 7_200 + 1_800 + 15))
    );
    assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
}

#[test]
fn parse_duration_rejects_garbage() {
    assert_eq!(parse_duration(""), None);
    assert_eq!(parse_duration("  "), None);
    assert_eq!(parse_duration("abc"), None);
    assert_eq!(parse_duration("30m15"), None);
    assert_eq!(parse_duration("3w"), None);
}

// -- JobKind -----------------------------------------------------------

#[test]
fn job_names_parse_leniently() {
    assert_eq!("weekly_digest".parse::<JobKind>().unwrap(), JobKind::WeeklyDigest);
    assert_eq!("Prune-Notifications".parse::<JobKind>().unwrap(), JobKind::PruneNotifications);
    assert!(matches!("reindex".parse::<JobKind>(), Err(SchedulerError::UnknownJob(_))));
}

#[test]
fn default_table_is_complete_and_valid() {
    let sched = JobScheduler::new();
    assert_eq!(sched.len(), JobKind::ALL.len());
    assert!(sched.entries().all(|e| e.enabled && e.last_run.is_none()));
}

// -- configuration -----------------------------------------------------

#[test]
fn overrides_and_disable() {
    let sched = JobScheduler::from_config(&config(&[
        ("backup", "0 4 * * *"),
        ("weekly_digest", "off"),
    ]))
    .unwrap();

    let backup = sched.get(JobKind::Backup).unwrap();
    assert_eq!(backup.expression, "0 4 * * *");
    assert_eq!(backup.cron_expression, "0 0 4 * * *");
    assert!(!sched.get(JobKind::WeeklyDigest).unwrap().enabled);
}

#[test]
fn invalid_override_is_an_error() {
    let err = JobScheduler::from_config(&config(&[("backup", "every night")])).unwrap_err();
    assert!(err.to_string().contains("backup"), "got: {err}");
}

// -- due checks --------------------------------------------------------

#[test]
fn due_after_tick_respects_last_run() {
    let mut sched = JobScheduler::new();
    sched.set_cron(JobKind::OverdueAlerts, "*/5 * * * *").unwrap();

    let just_after_tick = at("2026-01-15T10:00:01Z");
    sched.record_run(JobKind::OverdueAlerts, just_after_tick, None);

    assert!(!sched.should_run(JobKind::OverdueAlerts, just_after_tick + chrono::Duration::minutes(2)));
    assert!(sched.should_run(JobKind::OverdueAlerts, just_after_tick + chrono::Duration::minutes(5)));
}

#[test]
fn never_run_job_catches_up_within_a_day_unless_primed() {
    let now = at("2026-01-15T10:00:00Z");
    let sched = JobScheduler::new();
    assert!(sched.due_jobs(now).contains(&JobKind::Backup));

    let mut primed = JobScheduler::new();
    primed.prime(now);
    assert!(primed.due_jobs(now + chrono::Duration::minutes(1)).is_empty());
}

#[test]
fn disabled_job_is_never_due() {
    let now = at("2026-01-15T10:00:00Z");
    let mut sched = JobScheduler::new();
    sched.set_enabled(JobKind::Backup, false);
    assert!(!sched.should_run(JobKind::Backup, now));
    assert_eq!(sched.next_run(JobKind::Backup, now), None);
}

#[test]
fn next_run_times() {
    let now = at("2026-01-15T10:00:00Z");
    let sched = JobScheduler::new();
    assert_eq!(sched.next_run(JobKind::Backup, now), Some(at("2026-01-16T02:00:00Z")));
    assert_eq!(sched.next_run(JobKind::WeeklyDigest, now), Some(at("2026-01-19T07:00:00Z")));
}

#[test]
fn record_run_keeps_last_error() {
    let mut sched = JobScheduler::new();
    let now = Utc::now();
    sched.record_run(JobKind::Backup, now, Some("disk full".into()));
    let entry = sched.get(JobKind::Backup).unwrap();
    assert_eq!(entry.last_run, Some(now));
    assert_eq!(entry.last_error.as_deref(), Some("disk full"));
}
