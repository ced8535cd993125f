use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{Rag, RiskStatus};
use super::patch::{clean_text, deserialize_some, set, set_nullable};
use crate::permissions::{RecordScope, Scoped};
use crate::rag;
use crate::validation::{self, Validate, ValidationErrors, MAX_TEXT_LEN};

/// Likelihood and impact are scored 1..=5.
pub const SCALE_MIN: i32 = 1;
pub const SCALE_MAX: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Risk {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub likelihood: i32,
    pub impact: i32,
    pub status: RiskStatus,
    pub owner_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub mitigation: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRisk {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub likelihood: i32,
    pub impact: i32,
    #[serde(default)]
    pub status: RiskStatus,
    pub owner_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub mitigation: Option<String>,
    pub review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRisk {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub likelihood: Option<i32>,
    pub impact: Option<i32>,
    pub status: Option<RiskStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub owner_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub mitigation: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub review_date: Option<Option<NaiveDate>>,
}

impl Risk {
    /// `owner_id` falls back to the creator when the input names nobody.
    pub fn new(input: CreateRisk, creator_id: Uuid, department_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: clean_text(input.description),
            category: clean_text(input.category),
            likelihood: input.likelihood,
            impact: input.impact,
            status: input.status,
            owner_id: input.owner_id.or(Some(creator_id)),
            department_id,
            mitigation: clean_text(input.mitigation),
            review_date: input.review_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateRisk, now: DateTime<Utc>) {
        set(&mut self.title, patch.title.map(|t| t.trim().to_string()));
        set_nullable(&mut self.description, patch.description.map(clean_text));
        set_nullable(&mut self.category, patch.category.map(clean_text));
        set(&mut self.likelihood, patch.likelihood);
        set(&mut self.impact, patch.impact);
        set(&mut self.status, patch.status);
        set_nullable(&mut self.owner_id, patch.owner_id);
        set_nullable(&mut self.department_id, patch.department_id);
        set_nullable(&mut self.mitigation, patch.mitigation.map(clean_text));
        set_nullable(&mut self.review_date, patch.review_date);
        self.updated_at = now;
    }

    pub fn score(&self) -> i32 {
        self.likelihood * self.impact
    }

    pub fn is_open(&self) -> bool {
        self.status != RiskStatus::Closed
    }

    pub fn rag(&self) -> Rag {
        rag::risk_rag(self.score(), self.status)
    }
}

impl Validate for Risk {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "title", &self.title);
        validation::optional_text(&mut errors, "description", self.description.as_deref(), MAX_TEXT_LEN);
        validation::optional_text(&mut errors, "category", self.category.as_deref(), validation::MAX_NAME_LEN);
        validation::optional_text(&mut errors, "mitigation", self.mitigation.as_deref(), MAX_TEXT_LEN);
        validation::between(&mut errors, "likelihood", self.likelihood, SCALE_MIN, SCALE_MAX);
        validation::between(&mut errors, "impact", self.impact, SCALE_MIN, SCALE_MAX);
        errors.into_result()
    }
}

impl Scoped for Risk {
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
pub struct RiskView {
    #[serde(flatten)]
    pub risk: Risk,
    pub score: i32,
    pub rag: Rag,
}

impl From<Risk> for RiskView {
    fn from(risk: Risk) -> Self {
        let score = risk.score();
        let rag = risk.rag();
        Self { risk, score, rag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(likelihood: i32, impact: i32) -> CreateRisk {
        CreateRisk {
            title: "Key supplier insolvency".into(),
            description: None,
            category: Some(" Supply chain ".into()),
            likelihood,
            impact,
            status: RiskStatus::Open,
            owner_id: None,
            department_id: None,
            mitigation: None,
            review_date: None,
        }
    }

    #[test]
    fn score_and_rag() {
        let creator = Uuid::new_v4();
        let risk = Risk::new(input(4, 4), creator, None, Utc::now());
        assert_eq!(risk.owner_id, Some(creator));
        assert_eq!(risk.category.as_deref(), Some("Supply chain"));
        let view = RiskView::from(risk);
        assert_eq!(view.score, 16);
        assert_eq!(view.rag, Rag::Red);
    }

    #[test]
    fn scale_is_validated() {
        let risk = Risk::new(input(0, 6), Uuid::new_v4(), None, Utc::now());
        let errors = risk.validate().unwrap_err();
        assert!(errors.get("likelihood").is_some());
        assert!(errors.get("impact").is_some());
    }

    #[test]
    fn closing_turns_blue() {
        let mut risk = Risk::new(input(5, 5), Uuid::new_v4(), None, Utc::now());
        risk.apply(UpdateRisk { status: Some(RiskStatus::Closed), ..Default::default() }, Utc::now());
        assert!(!risk.is_open());
        assert_eq!(risk.rag(), Rag::Blue);
    }
}
