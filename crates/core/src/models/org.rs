//! Departments, teams and users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::Role;
use super::patch::{clean_text, deserialize_some, set, set_nullable};
use crate::validation::{self, Validate, ValidationErrors, MAX_TEXT_LEN};

// ── Department ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDepartment {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateDepartment {
    pub name: Option<String>,
}

impl Department {
    pub fn new(input: CreateDepartment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateDepartment, now: DateTime<Utc>) {
        set(&mut self.name, patch.name.map(|n| n.trim().to_string()));
        self.updated_at = now;
    }
}

impl Validate for Department {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "name", &self.name);
        errors.into_result()
    }
}

// ── Team ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub department_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTeam {
    pub name: String,
    /// Defaults to the caller's department.
    pub department_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub department_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub lead_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl Team {
    pub fn new(input: CreateTeam, department_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            department_id,
            lead_id: input.lead_id,
            description: clean_text(input.description),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateTeam, now: DateTime<Utc>) {
        set(&mut self.name, patch.name.map(|n| n.trim().to_string()));
        set(&mut self.department_id, patch.department_id);
        set_nullable(&mut self.lead_id, patch.lead_id);
        set_nullable(&mut self.description, patch.description.map(clean_text));
        self.updated_at = now;
    }
}

impl Validate for Team {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "name", &self.name);
        validation::optional_text(&mut errors, "description", self.description.as_deref(), MAX_TEXT_LEN);
        errors.into_result()
    }
}

// ── User ─────────────────────────────────────────────────────────

/// A user account. The password hash lives in its own column and is never
/// part of this type.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
    pub email_notifications: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub team_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    pub email_notifications: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Normalise an e-mail address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn new(input: &CreateUser, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: normalize_email(&input.email),
            role: input.role,
            department_id: input.department_id,
            team_id: input.team_id,
            is_active: true,
            email_notifications: input.email_notifications,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply profile fields from a patch. The password is handled by the
    /// caller since it needs hashing.
    pub fn apply(&mut self, patch: &UpdateUser, now: DateTime<Utc>) {
        set(&mut self.name, patch.name.as_ref().map(|n| n.trim().to_string()));
        set(&mut self.email, patch.email.as_deref().map(normalize_email));
        set(&mut self.role, patch.role);
        set_nullable(&mut self.department_id, patch.department_id);
        set_nullable(&mut self.team_id, patch.team_id);
        set(&mut self.is_active, patch.is_active);
        set(&mut self.email_notifications, patch.email_notifications);
        self.updated_at = now;
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "name", &self.name);
        validation::email(&mut errors, "email", &self.email);
        if self.role != Role::Admin && self.department_id.is_none() {
            errors.add("department_id", "The department id field is required unless role is admin.");
        }
        errors.into_result()
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::password(&mut errors, "password", &self.password);
        if let Err(profile) = User::new(self, Utc::now()).validate() {
            errors.merge(profile);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input() -> CreateUser {
        CreateUser {
            name: "  Ada Lovelace ".into(),
            email: " Ada@Example.COM ".into(),
            password: "correct horse".into(),
            role: Role::Member,
            department_id: Some(Uuid::new_v4()),
            team_id: None,
            email_notifications: true,
        }
    }

    #[test]
    fn new_user_normalises_fields() {
        let user = User::new(&create_input(), Utc::now());
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.is_active);
    }

    #[test]
    fn create_user_validation_checks_password_and_department() {
        let mut input = create_input();
        input.password = "short".into();
        input.department_id = None;
        let errors = input.validate().unwrap_err();
        assert!(errors.get("password").is_some());
        assert!(errors.get("department_id").is_some());

        input.role = Role::Admin;
        input.password = "long enough".into();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn team_patch_clears_lead() {
        let now = Utc::now();
        let mut team = Team::new(
            CreateTeam {
                name: "Platform".into(),
                department_id: None,
                lead_id: Some(Uuid::new_v4()),
                description: Some("  ".into()),
            },
            Uuid::new_v4(),
            now,
        );
        assert_eq!(team.description, None);

        let patch: UpdateTeam = serde_json::from_str(r#"{"lead_id": null}"#).unwrap();
        team.apply(patch, now);
        assert_eq!(team.lead_id, None);
        assert_eq!(team.name, "Platform");
    }
}
