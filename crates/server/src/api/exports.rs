//! CSV downloads of the records the caller can see.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bow_core::models::{GovernanceItem, GovernanceItemView, Risk, RiskView, Supplier, SupplierView, WorkItem, WorkItemView};
use bow_core::query::ListParams;
use bow_core::{authorize, department_filter, Action, RecordScope};
use bow_import::ImportTarget;
use tracing::info;

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{bad_request, denied, internal_error, require_pg, ApiResult};

#[utoipa::path(
    get,
    path = "/api/exports/{target}",
    tag = "Imports",
    params(
        ("target" = String, Path, description = "work_items, risks, suppliers or governance_items"),
        ListParams
    ),
    responses(
        (status = 200, description = "CSV with a RAG column", content_type = "text/csv", body = String),
        (status = 400, description = "Unknown target")
    )
)]
pub async fn export(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(target): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Response> {
    let target = target.parse::<ImportTarget>().map_err(bad_request)?;
    authorize(&user, Action::Export, target.resource(), &RecordScope::department(user.department_id))
        .map_err(|d| denied(d, "Export", None))?;

    let pool = require_pg(&state)?;
    let department = department_filter(&user);
    let today = state.today();
    let rag = state.rag();

    let (csv, rows) = match target {
        ImportTarget::WorkItems => {
            let rows = repo::work_items::LISTING
                .fetch_all::<WorkItem>(pool, &params, department)
                .await
                .map_err(internal_error)?;
            let views: Vec<WorkItemView> =
                rows.into_iter().map(|w| WorkItemView::new(w, today, rag.amber_days)).collect();
            (bow_import::export_records(&views), views.len())
        }
        ImportTarget::Risks => {
            let rows = repo::risks::LISTING
                .fetch_all::<Risk>(pool, &params, department)
                .await
                .map_err(internal_error)?;
            let views: Vec<RiskView> = rows.into_iter().map(RiskView::from).collect();
            (bow_import::export_records(&views), views.len())
        }
        ImportTarget::Suppliers => {
            let rows = repo::suppliers::LISTING
                .fetch_all::<Supplier>(pool, &params, department)
                .await
                .map_err(internal_error)?;
            let views: Vec<SupplierView> = rows
                .into_iter()
                .map(|s| SupplierView::new(s, today, rag.contract_window_days))
                .collect();
            (bow_import::export_records(&views), views.len())
        }
        ImportTarget::GovernanceItems => {
            let rows = repo::governance::LISTING
                .fetch_all::<GovernanceItem>(pool, &params, department)
                .await
                .map_err(internal_error)?;
            let views: Vec<GovernanceItemView> = rows
                .into_iter()
                .map(|g| GovernanceItemView::new(g, today, rag.amber_days))
                .collect();
            (bow_import::export_records(&views), views.len())
        }
    };
    let csv = csv.map_err(internal_error)?;

    info!(target = %target, rows, user_id = %user.id, "export generated");
    let filename = format!("{}-{}.csv", target.as_str().replace('_', "-"), today.format("%Y%m%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        csv,
    )
        .into_response())
}
