use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{GovernanceKind, GovernanceStatus, Rag, ReviewFrequency};
use super::patch::{clean_text, deserialize_some, set, set_nullable};
use crate::permissions::{RecordScope, Scoped};
use crate::rag;
use crate::validation::{self, Validate, ValidationErrors, MAX_TEXT_LEN};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct GovernanceItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: GovernanceKind,
    pub status: GovernanceStatus,
    pub review_frequency: ReviewFrequency,
    pub last_reviewed: Option<NaiveDate>,
    pub next_review_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGovernanceItem {
    pub title: String,
    pub description: Option<String>,
    pub kind: GovernanceKind,
    #[serde(default)]
    pub status: GovernanceStatus,
    #[serde(default)]
    pub review_frequency: ReviewFrequency,
    pub last_reviewed: Option<NaiveDate>,
    /// Derived from `last_reviewed` + frequency when omitted.
    pub next_review_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateGovernanceItem {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub kind: Option<GovernanceKind>,
    pub status: Option<GovernanceStatus>,
    pub review_frequency: Option<ReviewFrequency>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub last_reviewed: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub next_review_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub owner_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
}

/// Add a review cycle to a date, clamping to month end (31 Jan + 1 month
/// = 28/29 Feb).
pub fn next_review_after(date: NaiveDate, frequency: ReviewFrequency) -> NaiveDate {
    date.checked_add_months(Months::new(frequency.months()))
        .unwrap_or(NaiveDate::MAX)
}

impl GovernanceItem {
    pub fn new(input: CreateGovernanceItem, creator_id: Uuid, department_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        let next_review_date = input
            .next_review_date
            .or_else(|| input.last_reviewed.map(|d| next_review_after(d, input.review_frequency)));
        Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: clean_text(input.description),
            kind: input.kind,
            status: input.status,
            review_frequency: input.review_frequency,
            last_reviewed: input.last_reviewed,
            next_review_date,
            owner_id: input.owner_id.or(Some(creator_id)),
            department_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateGovernanceItem, now: DateTime<Utc>) {
        set(&mut self.title, patch.title.map(|t| t.trim().to_string()));
        set_nullable(&mut self.description, patch.description.map(clean_text));
        set(&mut self.kind, patch.kind);
        set(&mut self.status, patch.status);
        set(&mut self.review_frequency, patch.review_frequency);
        set_nullable(&mut self.last_reviewed, patch.last_reviewed);
        set_nullable(&mut self.next_review_date, patch.next_review_date);
        set_nullable(&mut self.owner_id, patch.owner_id);
        set_nullable(&mut self.department_id, patch.department_id);
        self.updated_at = now;
    }

    /// Record a completed review on `today` and schedule the next one.
    pub fn mark_reviewed(&mut self, today: NaiveDate, now: DateTime<Utc>) {
        self.last_reviewed = Some(today);
        self.next_review_date = Some(next_review_after(today, self.review_frequency));
        self.status = GovernanceStatus::Active;
        self.updated_at = now;
    }

    pub fn is_retired(&self) -> bool {
        self.status == GovernanceStatus::Retired
    }

    pub fn rag(&self, today: NaiveDate, amber_days: u32) -> Rag {
        rag::governance_rag(self, today, amber_days)
    }
}

impl Validate for GovernanceItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "title", &self.title);
        validation::optional_text(&mut errors, "description", self.description.as_deref(), MAX_TEXT_LEN);
        validation::date_order(
            &mut errors,
            "last_reviewed",
            self.last_reviewed,
            "next_review_date",
            self.next_review_date,
        );
        errors.into_result()
    }
}

impl Scoped for GovernanceItem {
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
pub struct GovernanceItemView {
    #[serde(flatten)]
    pub item: GovernanceItem,
    pub rag: Rag,
}

impl GovernanceItemView {
    pub fn new(item: GovernanceItem, today: NaiveDate, amber_days: u32) -> Self {
        let rag = item.rag(today, amber_days);
        Self { item, rag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input() -> CreateGovernanceItem {
        CreateGovernanceItem {
            title: "Information security policy".into(),
            description: None,
            kind: GovernanceKind::Policy,
            status: GovernanceStatus::Draft,
            review_frequency: ReviewFrequency::Quarterly,
            last_reviewed: Some(date(2025, 1, 15)),
            next_review_date: None,
            owner_id: None,
            department_id: None,
        }
    }

    #[test]
    fn next_review_derived_from_last_review() {
        let item = GovernanceItem::new(input(), Uuid::new_v4(), None, Utc::now());
        assert_eq!(item.next_review_date, Some(date(2025, 4, 15)));
    }

    #[test]
    fn month_end_is_clamped() {
        assert_eq!(next_review_after(date(2025, 1, 31), ReviewFrequency::Monthly), date(2025, 2, 28));
        assert_eq!(next_review_after(date(2024, 8, 31), ReviewFrequency::SemiAnnual), date(2025, 2, 28));
    }

    #[test]
    fn mark_reviewed_advances_cycle_and_activates() {
        let mut item = GovernanceItem::new(input(), Uuid::new_v4(), None, Utc::now());
        item.mark_reviewed(date(2025, 6, 30), Utc::now());
        assert_eq!(item.last_reviewed, Some(date(2025, 6, 30)));
        assert_eq!(item.next_review_date, Some(date(2025, 9, 30)));
        assert_eq!(item.status, GovernanceStatus::Active);
    }
}
