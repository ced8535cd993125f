//! Shared helpers and type aliases for the API handlers.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use bow_core::{BowError, Denied, Validate, ValidationErrors};

use crate::db;
use crate::state::AppState;

// ── Types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Field name to messages, on validation failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

// ── Helpers ──────────────────────────────────────────────────────

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            errors: None,
        }),
    )
}

pub(crate) fn require_pg(state: &AppState) -> ApiResult<&sqlx::PgPool> {
    state
        .pg_pool
        .as_ref()
        .ok_or_else(|| unavailable("PostgreSQL not configured"))
}

pub(crate) fn unavailable(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::SERVICE_UNAVAILABLE, msg)
}

pub(crate) fn internal_error(e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub(crate) fn not_found(resource: &str, id: Uuid) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("{} not found: {}", resource, id))
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, msg)
}

pub(crate) fn unauthorized(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, msg)
}

pub(crate) fn forbidden(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::FORBIDDEN, msg)
}

pub(crate) fn conflict(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::CONFLICT, msg)
}

pub(crate) fn unprocessable(errors: ValidationErrors) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: "The given data was invalid.".into(),
            errors: Some(errors),
        }),
    )
}

pub(crate) fn validate(value: &impl Validate) -> ApiResult<()> {
    value.validate().map_err(unprocessable)
}

/// A permission denial for `resource`/`id`. Records in another department
/// answer 404 so their existence is not revealed.
pub(crate) fn denied(d: Denied, resource: &str, id: Option<Uuid>) -> ApiError {
    match id {
        Some(id) if d.hides_record() => not_found(resource, id),
        _ => forbidden(d.to_string()),
    }
}

/// Database errors: unique violations are 409, dangling references 422.
pub(crate) fn db_error(e: sqlx::Error) -> ApiError {
    if db::is_unique_violation(&e) {
        return conflict("A record with the same unique value already exists.");
    }
    if let Some(column) = db::foreign_key_column(&e) {
        return unprocessable(ValidationErrors::single(
            &column,
            format!("The selected {} is invalid.", column.replace('_', " ")),
        ));
    }
    internal_error(e)
}

pub(crate) fn domain_error(e: BowError) -> ApiError {
    match e {
        BowError::Validation(errors) => unprocessable(errors),
        BowError::NotFound { resource, id } => not_found(resource, id),
        BowError::Forbidden(msg) => forbidden(msg),
        e @ (BowError::InvalidRange(_) | BowError::UnknownVariant { .. }) => bad_request(e.to_string()),
        BowError::UnknownCard(id) => not_found("Work item", id),
        BowError::Other(msg) => internal_error(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_body_shape() {
        let (status, Json(body)) = unprocessable(ValidationErrors::single("title", "The title field is required."));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "The given data was invalid.");
        assert_eq!(json["errors"]["title"][0], "The title field is required.");
    }

    #[test]
    fn plain_errors_omit_field_map() {
        let (status, Json(body)) = not_found("Risk", Uuid::nil());
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn other_department_denial_is_not_found() {
        let d = Denied {
            action: "view",
            resource: "risk",
            reason: "record belongs to another department",
        };
        assert_eq!(denied(d.clone(), "Risk", Some(Uuid::nil())).0, StatusCode::NOT_FOUND);
        assert_eq!(denied(d, "Risk", None).0, StatusCode::FORBIDDEN);

        let role = Denied {
            action: "delete",
            resource: "risk",
            reason: "role does not permit this",
        };
        assert_eq!(denied(role, "Risk", Some(Uuid::nil())).0, StatusCode::FORBIDDEN);
    }
}
