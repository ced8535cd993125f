//! Dashboard summary and calendar feed over the records the caller can see.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use sqlx::PgPool;

use bow_core::calendar::{self, CalendarEvent, CalendarInput, CalendarQuery};
use bow_core::dashboard::{self, Dashboard, DashboardInput, DashboardSettings};
use bow_core::models::{GovernanceItem, Risk, Supplier, Team, User, WorkItem};
use bow_core::query::ListParams;

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{domain_error, internal_error, require_pg, ApiResult};

/// Every record visible to one user.
struct Visible {
    work_items: Vec<WorkItem>,
    risks: Vec<Risk>,
    suppliers: Vec<Supplier>,
    governance: Vec<GovernanceItem>,
}

async fn visible(pool: &PgPool, user: &User) -> Result<Visible, sqlx::Error> {
    let department = bow_core::department_filter(user);
    let params = ListParams::default();
    let (work_items, risks, suppliers, governance) = tokio::try_join!(
        repo::work_items::LISTING.fetch_all::<WorkItem>(pool, &params, department),
        repo::risks::LISTING.fetch_all::<Risk>(pool, &params, department),
        repo::suppliers::LISTING.fetch_all::<Supplier>(pool, &params, department),
        repo::governance::LISTING.fetch_all::<GovernanceItem>(pool, &params, department),
    )?;
    Ok(Visible {
        work_items,
        risks,
        suppliers,
        governance,
    })
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses((status = 200, description = "Counts, top risks, upcoming dates and team workload", body = Dashboard))
)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
) -> ApiResult<Json<Dashboard>> {
    let pool = require_pg(&state)?;
    let records = visible(pool, &user).await.map_err(internal_error)?;
    let teams: Vec<Team> = repo::org::all_teams(pool, bow_core::department_filter(&user))
        .await
        .map_err(internal_error)?;

    let settings = DashboardSettings {
        rag: state.rag(),
        review_window_days: state.config.schedule.reminder_window_days,
    };
    let input = DashboardInput {
        work_items: &records.work_items,
        risks: &records.risks,
        suppliers: &records.suppliers,
        governance: &records.governance,
        teams: &teams,
    };
    Ok(Json(dashboard::build(input, state.today(), settings)))
}

#[utoipa::path(
    get,
    path = "/api/calendar",
    tag = "Dashboard",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Dated events in the range, by date", body = Vec<CalendarEvent>),
        (status = 400, description = "Bad range or unknown source")
    )
)]
pub async fn calendar(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    // Reject bad ranges before touching the database.
    query.validate().map_err(domain_error)?;
    query.sources().map_err(domain_error)?;

    let pool = require_pg(&state)?;
    let records = visible(pool, &user).await.map_err(internal_error)?;
    let input = CalendarInput {
        work_items: &records.work_items,
        risks: &records.risks,
        suppliers: &records.suppliers,
        governance: &records.governance,
    };
    let events = calendar::events(input, &query, state.today(), state.rag()).map_err(domain_error)?;
    Ok(Json(events))
}
