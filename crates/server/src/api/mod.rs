//! Domain-focused API endpoint modules.
//!
//! Each sub-module owns a single responsibility area. Shared error types
//! and helpers live in `common`.

pub mod auth;
pub mod backups;
pub mod common;
pub mod dashboard;
pub mod departments;
pub mod doc;
pub mod exports;
pub mod governance;
pub mod health;
pub mod imports;
pub mod jobs;
pub mod notifications;
pub mod risks;
pub mod suppliers;
pub mod teams;
pub mod users;
pub mod work_items;

use uuid::Uuid;

use bow_core::models::User;

/// Department a new record is filed under: the requested one, else the
/// caller's own. Permission checks reject foreign departments afterwards.
pub(crate) fn record_department(user: &User, requested: Option<Uuid>) -> Option<Uuid> {
    if user.is_admin() {
        requested
    } else {
        requested.or(user.department_id)
    }
}
