//! Supplier and contract endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use bow_core::models::{CreateSupplier, Supplier, SupplierView, UpdateSupplier, User};
use bow_core::query::{ListParams, Page};
use bow_core::{authorize, department_filter, Action, RecordScope, Resource, Scoped};

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{db_error, denied, internal_error, not_found, require_pg, validate, ApiResult};

const RESOURCE: &str = "Supplier";

async fn load(state: &AppState, user: &User, id: Uuid, action: Action) -> ApiResult<Supplier> {
    let pool = require_pg(state)?;
    let supplier = repo::suppliers::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(user, action, Resource::Supplier, &supplier.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    Ok(supplier)
}

fn view(state: &AppState, supplier: Supplier) -> SupplierView {
    SupplierView::new(supplier, state.today(), state.rag().contract_window_days)
}

#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "Suppliers",
    params(ListParams),
    responses((status = 200, description = "Visible suppliers", body = Page<SupplierView>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<SupplierView>>> {
    let pool = require_pg(&state)?;
    let department = department_filter(&user);

    if let Some(rag) = params.rag {
        let rows = repo::suppliers::LISTING
            .fetch_all::<Supplier>(pool, &params, department)
            .await
            .map_err(internal_error)?;
        let views = rows
            .into_iter()
            .map(|s| view(&state, s))
            .filter(|v| v.rag == rag)
            .collect();
        return Ok(Json(Page::from_vec(views, &params)));
    }

    let (rows, total) = repo::suppliers::LISTING
        .fetch_page::<Supplier>(pool, &params, department)
        .await
        .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params).map(|s| view(&state, s))))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    tag = "Suppliers",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "The supplier", body = SupplierView),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SupplierView>> {
    let supplier = load(&state, &user, id, Action::View).await?;
    Ok(Json(view(&state, supplier)))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "Suppliers",
    request_body = CreateSupplier,
    responses(
        (status = 201, description = "Created", body = SupplierView),
        (status = 403, description = "Not allowed"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateSupplier>,
) -> ApiResult<(StatusCode, Json<SupplierView>)> {
    let pool = require_pg(&state)?;
    let department_id = super::record_department(&user, input.department_id);
    let scope = RecordScope {
        department_id,
        owner_id: input.owner_id.or(Some(user.id)),
        ..Default::default()
    };
    authorize(&user, Action::Create, Resource::Supplier, &scope).map_err(|d| denied(d, RESOURCE, None))?;

    let supplier = Supplier::new(input, user.id, department_id, Utc::now());
    validate(&supplier)?;
    repo::suppliers::insert(pool, &supplier).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(view(&state, supplier))))
}

#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    tag = "Suppliers",
    params(("id" = Uuid, Path, description = "Supplier id")),
    request_body = UpdateSupplier,
    responses(
        (status = 200, description = "Updated", body = SupplierView),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateSupplier>,
) -> ApiResult<Json<SupplierView>> {
    let mut supplier = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;

    supplier.apply(patch, Utc::now());
    authorize(&user, Action::Update, Resource::Supplier, &supplier.scope())
        .map_err(|d| denied(d, RESOURCE, None))?;
    validate(&supplier)?;
    repo::suppliers::update(pool, &supplier).await.map_err(db_error)?;
    Ok(Json(view(&state, supplier)))
}

#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    tag = "Suppliers",
    params(("id" = Uuid, Path, description = "Supplier id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load(&state, &user, id, Action::Delete).await?;
    let pool = require_pg(&state)?;
    if !repo::suppliers::delete(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
