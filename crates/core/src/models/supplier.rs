use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{Criticality, Rag, SupplierStatus};
use super::patch::{clean_text, deserialize_some, set, set_nullable};
use crate::permissions::{RecordScope, Scoped};
use crate::rag;
use crate::validation::{self, Validate, ValidationErrors, MAX_NAME_LEN, MAX_TEXT_LEN};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub criticality: Criticality,
    pub status: SupplierStatus,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    /// Annual contract value in minor units (pence/cents).
    pub annual_value_cents: Option<i64>,
    pub owner_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSupplier {
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub criticality: Criticality,
    #[serde(default)]
    pub status: SupplierStatus,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub annual_value_cents: Option<i64>,
    pub owner_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub criticality: Option<Criticality>,
    pub status: Option<SupplierStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub contract_start: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub contract_end: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i64>)]
    pub annual_value_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub owner_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

impl Supplier {
    pub fn new(input: CreateSupplier, creator_id: Uuid, department_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            contact_name: clean_text(input.contact_name),
            contact_email: clean_text(input.contact_email).map(|e| e.to_lowercase()),
            phone: clean_text(input.phone),
            category: clean_text(input.category),
            criticality: input.criticality,
            status: input.status,
            contract_start: input.contract_start,
            contract_end: input.contract_end,
            annual_value_cents: input.annual_value_cents,
            owner_id: input.owner_id.or(Some(creator_id)),
            department_id,
            notes: clean_text(input.notes),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateSupplier, now: DateTime<Utc>) {
        set(&mut self.name, patch.name.map(|n| n.trim().to_string()));
        set_nullable(&mut self.contact_name, patch.contact_name.map(clean_text));
        set_nullable(
            &mut self.contact_email,
            patch.contact_email.map(|e| clean_text(e).map(|e| e.to_lowercase())),
        );
        set_nullable(&mut self.phone, patch.phone.map(clean_text));
        set_nullable(&mut self.category, patch.category.map(clean_text));
        set(&mut self.criticality, patch.criticality);
        set(&mut self.status, patch.status);
        set_nullable(&mut self.contract_start, patch.contract_start);
        set_nullable(&mut self.contract_end, patch.contract_end);
        set_nullable(&mut self.annual_value_cents, patch.annual_value_cents);
        set_nullable(&mut self.owner_id, patch.owner_id);
        set_nullable(&mut self.department_id, patch.department_id);
        set_nullable(&mut self.notes, patch.notes.map(clean_text));
        self.updated_at = now;
    }

    pub fn is_active(&self) -> bool {
        self.status == SupplierStatus::Active
    }

    /// Anything but inactive: onboarding and under-review suppliers still
    /// have contracts to watch.
    pub fn is_current(&self) -> bool {
        self.status != SupplierStatus::Inactive
    }

    /// Days until the contract ends; negative once it has lapsed.
    pub fn days_to_contract_end(&self, today: NaiveDate) -> Option<i64> {
        self.contract_end.map(|end| (end - today).num_days())
    }

    pub fn rag(&self, today: NaiveDate, window_days: u32) -> Rag {
        rag::supplier_rag(self, today, window_days)
    }
}

impl Validate for Supplier {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "name", &self.name);
        validation::optional_text(&mut errors, "contact_name", self.contact_name.as_deref(), MAX_NAME_LEN);
        validation::optional_text(&mut errors, "phone", self.phone.as_deref(), 50);
        validation::optional_text(&mut errors, "category", self.category.as_deref(), MAX_NAME_LEN);
        validation::optional_text(&mut errors, "notes", self.notes.as_deref(), MAX_TEXT_LEN);
        if let Some(email) = self.contact_email.as_deref() {
            validation::email(&mut errors, "contact_email", email);
        }
        validation::date_order(
            &mut errors,
            "contract_start",
            self.contract_start,
            "contract_end",
            self.contract_end,
        );
        if let Some(value) = self.annual_value_cents {
            validation::non_negative(&mut errors, "annual_value_cents", value);
        }
        errors.into_result()
    }
}

impl Scoped for Supplier {
    fn scope(&self) -> RecordScope {
        RecordScope {
            department_id: self.department_id,
            owner_id: self.owner_id,
            assignee_id: None,
            team_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupplierView {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub rag: Rag,
    pub days_to_contract_end: Option<i64>,
}

impl SupplierView {
    pub fn new(supplier: Supplier, today: NaiveDate, window_days: u32) -> Self {
        let rag = supplier.rag(today, window_days);
        let days_to_contract_end = supplier.days_to_contract_end(today);
        Self { supplier, rag, days_to_contract_end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateSupplier {
        CreateSupplier {
            name: "Acme Hosting".into(),
            contact_name: None,
            contact_email: Some(" Ops@Acme.IO ".into()),
            phone: None,
            category: None,
            criticality: Criticality::High,
            status: SupplierStatus::Active,
            contract_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            contract_end: NaiveDate::from_ymd_opt(2025, 12, 31),
            annual_value_cents: Some(1_250_000),
            owner_id: None,
            department_id: None,
            notes: None,
        }
    }

    #[test]
    fn contact_email_is_normalised_and_validated() {
        let supplier = Supplier::new(input(), Uuid::new_v4(), None, Utc::now());
        assert_eq!(supplier.contact_email.as_deref(), Some("ops@acme.io"));
        assert!(supplier.validate().is_ok());

        let mut bad = supplier.clone();
        bad.apply(
            UpdateSupplier {
                contact_email: Some(Some("nope".into())),
                annual_value_cents: Some(Some(-1)),
                ..Default::default()
            },
            Utc::now(),
        );
        let errors = bad.validate().unwrap_err();
        assert!(errors.get("contact_email").is_some());
        assert!(errors.get("annual_value_cents").is_some());
    }

    #[test]
    fn contract_countdown() {
        let supplier = Supplier::new(input(), Uuid::new_v4(), None, Utc::now());
        let today = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(supplier.days_to_contract_end(today), Some(30));
        let view = SupplierView::new(supplier, today, 90);
        assert_eq!(view.rag, Rag::Amber);
    }
}
