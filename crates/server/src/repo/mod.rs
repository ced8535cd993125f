//! PostgreSQL access, one module per table family.
//!
//! Functions return `sqlx::Error`; handlers map it to an HTTP error and jobs
//! to `anyhow`.

pub mod governance;
pub mod notifications;
pub mod org;
pub mod risks;
pub mod suppliers;
pub mod users;
pub mod work_items;

mod listing;
mod snapshot;

pub use listing::Listing;
pub use snapshot::{dump_tables, record_job_run, BACKUP_TABLES};
