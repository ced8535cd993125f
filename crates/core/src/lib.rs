pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod kanban;
pub mod models;
pub mod permissions;
pub mod query;
pub mod rag;
pub mod reminders;
pub mod validation;

pub use config::Config;
pub use error::*;
pub use permissions::{authorize, department_filter, Action, Denied, RecordScope, Resource, Scoped};
pub use validation::{Validate, ValidationErrors};
