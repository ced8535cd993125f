//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// `*` allows any origin; otherwise a comma-separated origin list.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.server.max_upload_mb as usize * 1024 * 1024;
    let cors = cors_layer(&state.config.server.cors_origin);

    let app = Router::new()
        .route("/health", get(api::health::health))
        // Auth
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/auth/password", put(api::auth::change_password))
        // Organisation
        .route(
            "/api/departments",
            get(api::departments::list).post(api::departments::create),
        )
        .route(
            "/api/departments/{id}",
            get(api::departments::get)
                .put(api::departments::update)
                .delete(api::departments::delete),
        )
        .route("/api/teams", get(api::teams::list).post(api::teams::create))
        .route(
            "/api/teams/{id}",
            get(api::teams::get).put(api::teams::update).delete(api::teams::delete),
        )
        .route("/api/teams/{id}/members", get(api::teams::members))
        .route("/api/users", get(api::users::list).post(api::users::create))
        .route(
            "/api/users/{id}",
            get(api::users::get).put(api::users::update).delete(api::users::delete),
        )
        // Work items: /board MUST precede /{id}
        .route("/api/work-items/board", get(api::work_items::board))
        .route(
            "/api/work-items",
            get(api::work_items::list).post(api::work_items::create),
        )
        .route(
            "/api/work-items/{id}",
            get(api::work_items::get)
                .put(api::work_items::update)
                .delete(api::work_items::delete),
        )
        .route("/api/work-items/{id}/move", post(api::work_items::move_card))
        // Registers
        .route("/api/risks", get(api::risks::list).post(api::risks::create))
        .route(
            "/api/risks/{id}",
            get(api::risks::get).put(api::risks::update).delete(api::risks::delete),
        )
        .route(
            "/api/suppliers",
            get(api::suppliers::list).post(api::suppliers::create),
        )
        .route(
            "/api/suppliers/{id}",
            get(api::suppliers::get)
                .put(api::suppliers::update)
                .delete(api::suppliers::delete),
        )
        .route(
            "/api/governance-items",
            get(api::governance::list).post(api::governance::create),
        )
        .route(
            "/api/governance-items/{id}",
            get(api::governance::get)
                .put(api::governance::update)
                .delete(api::governance::delete),
        )
        .route("/api/governance-items/{id}/review", post(api::governance::review))
        // Notifications: fixed paths MUST precede /{id}
        .route("/api/notifications", get(api::notifications::list))
        .route(
            "/api/notifications/unread-count",
            get(api::notifications::unread_count),
        )
        .route("/api/notifications/read-all", post(api::notifications::mark_all_read))
        .route(
            "/api/notifications/{id}",
            axum::routing::delete(api::notifications::delete),
        )
        .route("/api/notifications/{id}/read", post(api::notifications::mark_read))
        // Dashboard
        .route("/api/dashboard", get(api::dashboard::dashboard))
        .route("/api/calendar", get(api::dashboard::calendar));

    let app = app
        .route(
            "/api/imports",
            post(api::imports::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/imports/{id}", axum::routing::delete(api::imports::cancel))
        .route("/api/imports/{id}/preview", post(api::imports::preview))
        .route("/api/imports/{id}/confirm", post(api::imports::confirm))
        .route("/api/exports/{target}", get(api::exports::export))
        // Operations
        .route("/api/backups", get(api::backups::list).post(api::backups::create))
        .route("/api/jobs", get(api::jobs::list))
        .route("/api/jobs/{job}/run", post(api::jobs::run));

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let app = build_router(AppState::for_tests());
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_missing_database() {
        let (status, json) = send(get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], false);
        assert_eq!(json["backups"], false);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for uri in ["/api/auth/me", "/api/work-items", "/api/work-items/board", "/api/jobs"] {
            let (status, json) = send(get_request(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(json["error"], "Unauthenticated.");
        }
    }

    #[tokio::test]
    async fn token_without_database_is_unavailable() {
        let request = Request::builder()
            .uri("/api/risks")
            .header(header::AUTHORIZATION, "Bearer 0123456789abcdef")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "PostgreSQL not configured");
    }

    #[tokio::test]
    async fn login_validates_before_touching_the_database() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email": "", "password": ""}"#))
            .unwrap();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "The given data was invalid.");
        assert!(json["errors"]["email"].is_array());
        assert!(json["errors"]["password"].is_array());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = send(get_request("/api/nothing-here")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn docs_are_served() {
        let app = build_router(AppState::for_tests());
        let response = app.oneshot(get_request("/docs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
