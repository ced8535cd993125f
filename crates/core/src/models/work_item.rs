use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::{Priority, Rag, WorkStatus};
use super::patch::{clean_text, deserialize_some, set, set_nullable};
use crate::permissions::{RecordScope, Scoped};
use crate::rag;
use crate::validation::{self, Validate, ValidationErrors, MAX_TEXT_LEN};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: WorkStatus,
    pub priority: Priority,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Order within the kanban column, dense from 0.
    pub position: i32,
    pub rag_override: Option<Rag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateWorkItem {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: WorkStatus,
    #[serde(default)]
    pub priority: Priority,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub rag_override: Option<Rag>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateWorkItem {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<WorkStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub department_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub team_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub owner_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Rag>)]
    pub rag_override: Option<Option<Rag>>,
}

impl WorkItem {
    pub fn new(
        input: CreateWorkItem,
        owner_id: Uuid,
        department_id: Option<Uuid>,
        position: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let completed_at = input.status.is_done().then_some(now);
        Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: clean_text(input.description),
            status: input.status,
            priority: input.priority,
            department_id,
            team_id: input.team_id,
            owner_id: Some(owner_id),
            assignee_id: input.assignee_id,
            start_date: input.start_date,
            due_date: input.due_date,
            completed_at,
            position,
            rag_override: input.rag_override,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateWorkItem, now: DateTime<Utc>) {
        set(&mut self.title, patch.title.map(|t| t.trim().to_string()));
        set_nullable(&mut self.description, patch.description.map(clean_text));
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        set(&mut self.priority, patch.priority);
        set_nullable(&mut self.department_id, patch.department_id);
        set_nullable(&mut self.team_id, patch.team_id);
        set_nullable(&mut self.owner_id, patch.owner_id);
        set_nullable(&mut self.assignee_id, patch.assignee_id);
        set_nullable(&mut self.start_date, patch.start_date);
        set_nullable(&mut self.due_date, patch.due_date);
        set_nullable(&mut self.rag_override, patch.rag_override);
        self.updated_at = now;
    }

    /// Change status, stamping or clearing `completed_at` on transitions
    /// into or out of `done`.
    pub fn set_status(&mut self, status: WorkStatus, now: DateTime<Utc>) {
        match (self.status.is_done(), status.is_done()) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            _ => {}
        }
        self.status = status;
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_done()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date.is_some_and(|d| d < today)
    }

    /// The user a reminder about this item should go to.
    pub fn responsible_id(&self) -> Option<Uuid> {
        self.assignee_id.or(self.owner_id)
    }

    pub fn rag(&self, today: NaiveDate, amber_days: u32) -> Rag {
        rag::work_item_rag(self, today, amber_days)
    }
}

impl Validate for WorkItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::name_like(&mut errors, "title", &self.title);
        validation::optional_text(&mut errors, "description", self.description.as_deref(), MAX_TEXT_LEN);
        validation::date_order(&mut errors, "start_date", self.start_date, "due_date", self.due_date);
        if self.position < 0 {
            errors.add("position", "The position must be at least 0.");
        }
        errors.into_result()
    }
}

impl Scoped for WorkItem {
    fn scope(&self) -> RecordScope {
        RecordScope {
            department_id: self.department_id,
            owner_id: self.owner_id,
            assignee_id: self.assignee_id,
            team_id: self.team_id,
        }
    }
}

/// API representation with the computed RAG flag.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkItemView {
    #[serde(flatten)]
    pub item: WorkItem,
    pub rag: Rag,
}

impl WorkItemView {
    pub fn new(item: WorkItem, today: NaiveDate, amber_days: u32) -> Self {
        let rag = item.rag(today, amber_days);
        Self { item, rag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new(
            CreateWorkItem {
                title: " Migrate ledger ".into(),
                ..Default::default()
            },
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            0,
            Utc::now(),
        )
    }

    #[test]
    fn new_item_defaults() {
        let item = item();
        assert_eq!(item.title, "Migrate ledger");
        assert_eq!(item.status, WorkStatus::Backlog);
        assert_eq!(item.priority, Priority::Medium);
        assert!(item.completed_at.is_none());
        assert_eq!(item.responsible_id(), item.owner_id);
    }

    #[test]
    fn status_transitions_track_completion() {
        let mut item = item();
        let now = Utc::now();
        item.set_status(WorkStatus::Done, now);
        assert_eq!(item.completed_at, Some(now));
        item.set_status(WorkStatus::Done, now + chrono::Duration::hours(1));
        assert_eq!(item.completed_at, Some(now));
        item.set_status(WorkStatus::Review, now);
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn patch_then_validate_catches_date_order() {
        let mut item = item();
        let patch: UpdateWorkItem = serde_json::from_value(serde_json::json!({
            "start_date": "2025-05-10",
            "due_date": "2025-05-01",
            "status": "in_progress"
        }))
        .unwrap();
        item.apply(patch, Utc::now());
        assert_eq!(item.status, WorkStatus::InProgress);
        let errors = item.validate().unwrap_err();
        assert!(errors.get("due_date").is_some());
    }

    #[test]
    fn overdue_requires_open_item() {
        let mut item = item();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        item.due_date = NaiveDate::from_ymd_opt(2025, 5, 31);
        assert!(item.is_overdue(today));
        item.set_status(WorkStatus::Done, Utc::now());
        assert!(!item.is_overdue(today));
    }

    #[test]
    fn view_flattens_with_rag() {
        let view = WorkItemView::new(item(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 14);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["rag"], "green");
        assert_eq!(json["title"], "Migrate ledger");
    }
}
