use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum BowError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: Uuid },

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("invalid calendar range: {0}")]
    InvalidRange(String),

    #[error("card not on board: {0}")]
    UnknownCard(Uuid),

    #[error("unknown value '{value}' for {field}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("{0}")]
    Other(String),
}

impl From<ValidationErrors> for BowError {
    fn from(errors: ValidationErrors) -> Self {
        BowError::Validation(errors)
    }
}
