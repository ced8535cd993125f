//! Scheduled job table and manual runs. Admin only.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use bow_core::models::User;
use bow_scheduler::JobKind;

use crate::auth::AuthUser;
use crate::jobs::{self, JobReport};
use crate::state::AppState;

use super::common::{bad_request, forbidden, internal_error, ApiResult};

#[derive(Debug, Serialize, ToSchema)]
pub struct JobInfo {
    pub job: String,
    pub description: String,
    pub expression: String,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub next_run: Option<DateTime<Utc>>,
}

fn require_admin(user: &User) -> ApiResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(forbidden("Only administrators can manage scheduled jobs."))
    }
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    tag = "Jobs",
    responses(
        (status = 200, description = "Every job with its schedule and last outcome", body = Vec<JobInfo>),
        (status = 403, description = "Admins only")
    )
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
) -> ApiResult<Json<Vec<JobInfo>>> {
    require_admin(&user)?;
    let now = Utc::now();
    let scheduler = state.scheduler.lock().await;
    let jobs = scheduler
        .entries()
        .map(|entry| JobInfo {
            job: entry.job.as_str().to_string(),
            description: entry.job.description().to_string(),
            expression: entry.expression.clone(),
            enabled: entry.enabled,
            last_run: entry.last_run,
            last_error: entry.last_error.clone(),
            next_run: scheduler.next_run(entry.job, now),
        })
        .collect();
    Ok(Json(jobs))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{job}/run",
    tag = "Jobs",
    params(("job" = String, Path, description = "Job name, e.g. deadline_reminders")),
    responses(
        (status = 200, description = "Job ran", body = JobReport),
        (status = 400, description = "Unknown job"),
        (status = 403, description = "Admins only"),
        (status = 500, description = "Job failed; the error is recorded")
    )
)]
pub async fn run(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(job): Path<String>,
) -> ApiResult<Json<JobReport>> {
    require_admin(&user)?;
    let job = job.parse::<JobKind>().map_err(|e| bad_request(e.to_string()))?;
    tracing::info!(job = %job, user_id = %user.id, "manual job run");
    let report = jobs::run_job(&state, job)
        .await
        .map_err(|e| internal_error(format!("{e:#}")))?;
    Ok(Json(report))
}
