//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book of Work API",
        version = "0.1.0",
        description = "Departmental work items, risks, suppliers and governance reviews with RAG status, reminders and backups.",
    ),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "Health", description = "Server readiness"),
        (name = "Auth", description = "Login, logout, current user and password changes"),
        (name = "Departments", description = "Department CRUD"),
        (name = "Teams", description = "Team CRUD and membership"),
        (name = "Users", description = "User accounts and roles"),
        (name = "Work items", description = "Work items, kanban board and card moves"),
        (name = "Risks", description = "Risk register with likelihood x impact scoring"),
        (name = "Suppliers", description = "Suppliers and contract dates"),
        (name = "Governance", description = "Policies and procedures with periodic reviews"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Dashboard", description = "Summary counts and calendar feed"),
        (name = "Imports", description = "CSV/XLSX import and CSV export"),
        (name = "Backups", description = "Database snapshots"),
        (name = "Jobs", description = "Scheduled job table and manual runs"),
    ),
    paths(
        // Health
        crate::api::health::health,
        // Auth
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::me,
        crate::api::auth::change_password,
        // Departments
        crate::api::departments::list,
        crate::api::departments::get,
        crate::api::departments::create,
        crate::api::departments::update,
        crate::api::departments::delete,
        // Teams
        crate::api::teams::list,
        crate::api::teams::get,
        crate::api::teams::members,
        crate::api::teams::create,
        crate::api::teams::update,
        crate::api::teams::delete,
        // Users
        crate::api::users::list,
        crate::api::users::get,
        crate::api::users::create,
        crate::api::users::update,
        crate::api::users::delete,
        // Work items
        crate::api::work_items::list,
        crate::api::work_items::get,
        crate::api::work_items::create,
        crate::api::work_items::update,
        crate::api::work_items::delete,
        crate::api::work_items::board,
        crate::api::work_items::move_card,
        // Risks
        crate::api::risks::list,
        crate::api::risks::get,
        crate::api::risks::create,
        crate::api::risks::update,
        crate::api::risks::delete,
        // Suppliers
        crate::api::suppliers::list,
        crate::api::suppliers::get,
        crate::api::suppliers::create,
        crate::api::suppliers::update,
        crate::api::suppliers::delete,
        // Governance
        crate::api::governance::list,
        crate::api::governance::get,
        crate::api::governance::create,
        crate::api::governance::update,
        crate::api::governance::delete,
        crate::api::governance::review,
        // Notifications
        crate::api::notifications::list,
        crate::api::notifications::unread_count,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,
        crate::api::notifications::delete,
        // Dashboard
        crate::api::dashboard::dashboard,
        crate::api::dashboard::calendar,
        // Imports and exports
        crate::api::imports::upload,
        crate::api::imports::preview,
        crate::api::imports::confirm,
        crate::api::imports::cancel,
        crate::api::exports::export,
        // Backups
        crate::api::backups::list,
        crate::api::backups::create,
        // Jobs
        crate::api::jobs::list,
        crate::api::jobs::run,
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/login",
            "/api/work-items/board",
            "/api/work-items/{id}/move",
            "/api/governance-items/{id}/review",
            "/api/imports/{id}/confirm",
            "/api/exports/{target}",
            "/api/jobs/{job}/run",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
