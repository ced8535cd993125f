//! Spreadsheet imports: upload, preview a column mapping, confirm or cancel.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use bow_core::models::{
    CreateGovernanceItem, CreateRisk, CreateSupplier, CreateWorkItem, GovernanceItem, NotificationKind, Risk,
    Supplier, User, WorkItem,
};
use bow_core::{authorize, department_filter, Action, RecordScope, Validate, ValidationErrors};
use bow_import::{ColumnMapping, ImportError, ImportTarget, Preview, Record};

use crate::auth::AuthUser;
use crate::imports::{ImportSession, SESSION_TTL_MINUTES};
use crate::messaging;
use crate::repo;
use crate::state::AppState;

use super::common::{
    bad_request, db_error, denied, internal_error, not_found, require_pg, unprocessable, ApiError, ApiResult,
};

const RESOURCE: &str = "Import";
const DEFAULT_SAMPLE: usize = 10;
const MAX_SAMPLE: usize = 100;

/// Import columns holding an e-mail and the id field each resolves to.
const EMAIL_REFERENCES: &[(&str, &str)] = &[("assignee_email", "assignee_id"), ("owner_email", "owner_id")];

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldInfo {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub target: ImportTarget,
    pub filename: String,
    pub headers: Vec<String>,
    pub rows: usize,
    pub fields: Vec<FieldInfo>,
    /// Field name to zero-based column index.
    pub suggested_mapping: ColumnMapping,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PreviewRequest {
    pub mapping: ColumnMapping,
    /// Rows of each kind to return; defaults to 10.
    pub sample: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    pub mapping: ColumnMapping,
    /// Drop invalid rows instead of rejecting the whole file.
    #[serde(default)]
    pub skip_invalid: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResult {
    #[schema(value_type = String)]
    pub target: ImportTarget,
    pub imported: usize,
    pub skipped: usize,
}

fn import_error(e: ImportError) -> ApiError {
    match e {
        ImportError::InvalidMapping(errors) => unprocessable(errors),
        e @ ImportError::InvalidRows { .. } => unprocessable(ValidationErrors::single("rows", e.to_string())),
        e => bad_request(e.to_string()),
    }
}

fn authorize_import(user: &User, target: ImportTarget) -> ApiResult<()> {
    let scope = RecordScope::department(super::record_department(user, None));
    authorize(user, Action::Import, target.resource(), &scope).map_err(|d| denied(d, RESOURCE, None))
}

async fn session(state: &AppState, user: &User, id: Uuid) -> ApiResult<ImportSession> {
    state
        .imports
        .get(id, user.id, Utc::now())
        .await
        .ok_or_else(|| not_found(RESOURCE, id))
}

#[utoipa::path(
    post,
    path = "/api/imports",
    tag = "Imports",
    request_body(content_type = "multipart/form-data", description = "Fields `target` and `file` (.csv, .xlsx, .xls)"),
    responses(
        (status = 201, description = "Upload parsed; map columns next", body = UploadResponse),
        (status = 400, description = "Unreadable or empty file"),
        (status = 403, description = "Not allowed to import this target")
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut target = None;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("target") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read target: {e}")))?;
                target = Some(raw.parse::<ImportTarget>().map_err(bad_request)?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file: {e}")))?;
                file = Some((filename, bytes));
            }
            _ => {}
        }
    }

    let target = target.ok_or_else(|| bad_request("Missing field: target"))?;
    let (filename, bytes) = file.ok_or_else(|| bad_request("No file provided"))?;
    authorize_import(&user, target)?;

    let table = bow_import::read_table(&filename, &bytes).map_err(import_error)?;
    let now = Utc::now();
    let session = ImportSession {
        id: Uuid::new_v4(),
        user_id: user.id,
        target,
        filename,
        table,
        created_at: now,
    };
    let response = UploadResponse {
        id: session.id,
        target,
        filename: session.filename.clone(),
        headers: session.table.headers.clone(),
        rows: session.table.len(),
        fields: target
            .fields()
            .iter()
            .map(|f| FieldInfo {
                name: f.name,
                label: f.label,
                required: f.required,
                kind: f.kind.as_str(),
            })
            .collect(),
        suggested_mapping: bow_import::suggest_mapping(&session.table.headers, target),
        expires_at: now + Duration::minutes(SESSION_TTL_MINUTES),
    };

    info!(import_id = %session.id, target = %target, rows = response.rows, user_id = %user.id, "import uploaded");
    state.imports.insert(session, now).await;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/imports/{id}/preview",
    tag = "Imports",
    params(("id" = Uuid, Path, description = "Import session id")),
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Row counts with sample and failing rows"),
        (status = 404, description = "Session missing or expired"),
        (status = 422, description = "Invalid mapping")
    )
)]
pub async fn preview(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<Json<Preview>> {
    let session = session(&state, &user, id).await?;
    let sample = req.sample.unwrap_or(DEFAULT_SAMPLE).min(MAX_SAMPLE);
    let preview = bow_import::preview(&session.table, session.target, &req.mapping, sample).map_err(import_error)?;
    Ok(Json(preview))
}

#[utoipa::path(
    post,
    path = "/api/imports/{id}/confirm",
    tag = "Imports",
    params(("id" = Uuid, Path, description = "Import session id")),
    request_body = ConfirmRequest,
    responses(
        (status = 201, description = "Rows inserted", body = ImportResult),
        (status = 404, description = "Session missing or expired"),
        (status = 422, description = "Invalid mapping or invalid rows")
    )
)]
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> ApiResult<(StatusCode, Json<ImportResult>)> {
    let pool = require_pg(&state)?;
    let session = session(&state, &user, id).await?;
    authorize_import(&user, session.target)?;

    let confirmed =
        bow_import::confirm(&session.table, session.target, &req.mapping, req.skip_invalid).map_err(import_error)?;
    let mut records = confirmed.records;
    resolve_emails(pool, &mut records).await.map_err(internal_error)?;

    let department_id = super::record_department(&user, None);
    let now = Utc::now();
    let rows = build_rows(session.target, records, &user, department_id, now).map_err(unprocessable)?;

    let mut tx = pool.begin().await.map_err(internal_error)?;
    for row in &rows {
        match row {
            Row::WorkItem(item) => {
                let mut item = item.clone();
                item.position =
                    repo::work_items::next_position(&mut *tx, item.status, department_filter(&user))
                        .await
                        .map_err(internal_error)?;
                repo::work_items::insert(&mut *tx, &item).await.map_err(db_error)?;
            }
            Row::Risk(risk) => repo::risks::insert(&mut *tx, risk).await.map_err(db_error)?,
            Row::Supplier(supplier) => repo::suppliers::insert(&mut *tx, supplier).await.map_err(db_error)?,
            Row::Governance(item) => repo::governance::insert(&mut *tx, item).await.map_err(db_error)?,
        }
    }
    tx.commit().await.map_err(internal_error)?;
    state.imports.remove(id, user.id).await;

    let result = ImportResult {
        target: session.target,
        imported: rows.len(),
        skipped: confirmed.skipped,
    };
    info!(
        import_id = %id,
        target = %session.target,
        imported = result.imported,
        skipped = result.skipped,
        user_id = %user.id,
        "import confirmed"
    );

    let ctx = bow_notify::MessageContext {
        title: session.filename.clone(),
        count: Some(result.imported),
        ..messaging::context_for(&state, &user)
    };
    let link = format!("/{}", session.target.as_str().replace('_', "-"));
    if let Err(e) =
        messaging::deliver(&state, pool, &user, NotificationKind::ImportCompleted, &ctx, Some(link), None).await
    {
        warn!(import_id = %id, error = %e, "import notification failed");
    }

    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    delete,
    path = "/api/imports/{id}",
    tag = "Imports",
    params(("id" = Uuid, Path, description = "Import session id")),
    responses(
        (status = 204, description = "Upload discarded"),
        (status = 404, description = "Session missing or expired")
    )
)]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.imports.remove(id, user.id).await {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Record building ──────────────────────────────────────────────

enum Row {
    WorkItem(WorkItem),
    Risk(Risk),
    Supplier(Supplier),
    Governance(GovernanceItem),
}

/// Swap `*_email` columns for user ids. Unknown addresses become null.
async fn resolve_emails(pool: &sqlx::PgPool, records: &mut [Record]) -> Result<(), sqlx::Error> {
    let mut emails: Vec<String> = records
        .iter()
        .flat_map(|r| EMAIL_REFERENCES.iter().filter_map(|(email, _)| r.get(*email)))
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    emails.sort();
    emails.dedup();

    let ids: HashMap<String, Uuid> = if emails.is_empty() {
        HashMap::new()
    } else {
        repo::users::ids_by_email(pool, &emails).await?.into_iter().collect()
    };

    for record in records.iter_mut() {
        for (email_field, id_field) in EMAIL_REFERENCES {
            if let Some(email) = record.remove(*email_field) {
                let id = email.as_str().and_then(|e| ids.get(e)).map(|id| Value::String(id.to_string()));
                record.insert(id_field.to_string(), id.unwrap_or(Value::Null));
            }
        }
    }
    Ok(())
}

fn input<T: DeserializeOwned>(record: Record) -> Result<T, String> {
    serde_json::from_value(Value::Object(record)).map_err(|e| e.to_string())
}

fn build_rows(
    target: ImportTarget,
    records: Vec<Record>,
    user: &User,
    department_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Vec<Row>, ValidationErrors> {
    let mut rows = Vec::with_capacity(records.len());
    let mut errors = ValidationErrors::new();

    for (index, record) in records.into_iter().enumerate() {
        let built = match target {
            ImportTarget::WorkItems => input::<CreateWorkItem>(record)
                .map(|i| Row::WorkItem(WorkItem::new(i, user.id, department_id, 0, now))),
            ImportTarget::Risks => {
                input::<CreateRisk>(record).map(|i| Row::Risk(Risk::new(i, user.id, department_id, now)))
            }
            ImportTarget::Suppliers => input::<CreateSupplier>(record)
                .map(|i| Row::Supplier(Supplier::new(i, user.id, department_id, now))),
            ImportTarget::GovernanceItems => input::<CreateGovernanceItem>(record)
                .map(|i| Row::Governance(GovernanceItem::new(i, user.id, department_id, now))),
        };
        let field = format!("rows.{}", index + 1);
        let row = match built {
            Ok(row) => row,
            Err(e) => {
                errors.add(&field, e);
                continue;
            }
        };
        let checked = match &row {
            Row::WorkItem(r) => r.validate(),
            Row::Risk(r) => r.validate(),
            Row::Supplier(r) => r.validate(),
            Row::Governance(r) => r.validate(),
        };
        if let Err(invalid) = checked {
            for message in invalid.into_inner().into_values().flatten() {
                errors.add(&field, message);
            }
            continue;
        }
        rows.push(row);
    }

    errors.into_result().map(|()| rows)
}
