//! Field-level validation with Laravel-compatible error bags.
//!
//! Errors are collected per field (never short-circuited) so a form can show
//! every problem at once. The serialized shape is `{field: [messages]}`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_TEXT_LEN: usize = 10_000;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Field name → list of messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error bag holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for messages in self.0.values() {
            for message in messages {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Types that can check their own field-level constraints.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

// ── Rules ─────────────────────────────────────────────────────

pub fn required(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("The {} field is required.", label(field)));
    }
}

pub fn max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("The {} may not be greater than {} characters.", label(field), max),
        );
    }
}

/// Required, non-blank and at most [`MAX_NAME_LEN`] characters.
pub fn name_like(errors: &mut ValidationErrors, field: &str, value: &str) {
    required(errors, field, value);
    max_len(errors, field, value, MAX_NAME_LEN);
}

pub fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        max_len(errors, field, v, max);
    }
}

pub fn email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_valid_email(value) {
        errors.add(field, format!("The {} must be a valid email address.", label(field)));
    }
}

pub fn between(errors: &mut ValidationErrors, field: &str, value: i32, min: i32, max: i32) {
    if value < min || value > max {
        errors.add(
            field,
            format!("The {} must be between {} and {}.", label(field), min, max),
        );
    }
}

pub fn non_negative(errors: &mut ValidationErrors, field: &str, value: i64) {
    if value < 0 {
        errors.add(field, format!("The {} must be at least 0.", label(field)));
    }
}

/// `end` must not precede `start` when both are present.
pub fn date_order(
    errors: &mut ValidationErrors,
    start_field: &str,
    start: Option<NaiveDate>,
    end_field: &str,
    end: Option<NaiveDate>,
) {
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            errors.add(
                end_field,
                format!(
                    "The {} must be a date after or equal to {}.",
                    label(end_field),
                    label(start_field)
                ),
            );
        }
    }
}

pub fn password(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            format!("The {} must be at least {} characters.", label(field), MIN_PASSWORD_LEN),
        );
    }
}

/// Pragmatic address check: one `@`, non-empty local part, dotted domain,
/// no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_all_messages_per_field() {
        let mut errors = ValidationErrors::new();
        required(&mut errors, "title", "   ");
        max_len(&mut errors, "title", &"x".repeat(300), 255);
        between(&mut errors, "likelihood", 9, 1, 5);

        assert_eq!(errors.get("title").map(|m| m.len()), Some(2));
        assert_eq!(
            errors.get("likelihood").unwrap()[0],
            "The likelihood must be between 1 and 5."
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn serializes_as_field_map() {
        let errors = ValidationErrors::single("due_date", "bad");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"due_date": ["bad"]}));
    }

    #[test]
    fn date_order_flags_end_field() {
        let mut errors = ValidationErrors::new();
        let start = NaiveDate::from_ymd_opt(2025, 3, 10);
        let end = NaiveDate::from_ymd_opt(2025, 3, 1);
        date_order(&mut errors, "start_date", start, "due_date", end);
        assert_eq!(
            errors.get("due_date").unwrap()[0],
            "The due date must be a date after or equal to start date."
        );

        let mut ok = ValidationErrors::new();
        date_order(&mut ok, "start_date", start, "due_date", None);
        assert!(ok.is_empty());
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("jane.doe@example.co.uk"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("jane@example."));
    }

    #[test]
    fn merge_appends_messages() {
        let mut a = ValidationErrors::single("name", "one");
        a.merge(ValidationErrors::single("name", "two"));
        assert_eq!(a.get("name").unwrap(), ["one".to_string(), "two".to_string()]);
        assert_eq!(a.to_string(), "one two");
    }
}
