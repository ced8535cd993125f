//! Calendar feed built from every dated field across the record types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::BowError;
use crate::models::{GovernanceItem, Rag, Risk, Supplier, WorkItem};
use crate::rag::{self, RagSettings};

/// Longest range a single calendar request may cover.
pub const MAX_SPAN_DAYS: i64 = 366;

/// Declaration order is the secondary sort order of events on the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    WorkItem,
    Risk,
    Supplier,
    GovernanceItem,
}

impl EventSource {
    pub const ALL: [EventSource; 4] = [
        EventSource::WorkItem,
        EventSource::Risk,
        EventSource::Supplier,
        EventSource::GovernanceItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::WorkItem => "work_item",
            EventSource::Risk => "risk",
            EventSource::Supplier => "supplier",
            EventSource::GovernanceItem => "governance_item",
        }
    }

    /// Frontend route for a record of this source.
    pub fn link(&self, id: Uuid) -> String {
        let base = match self {
            EventSource::WorkItem => "work-items",
            EventSource::Risk => "risks",
            EventSource::Supplier => "suppliers",
            EventSource::GovernanceItem => "governance-items",
        };
        format!("/{base}/{id}")
    }

    fn parse(raw: &str) -> Result<Self, BowError> {
        let normalized = crate::models::enums::normalize_variant(raw);
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == normalized || s.as_str().trim_end_matches("_item") == normalized)
            .ok_or_else(|| BowError::UnknownVariant {
                field: "sources",
                value: raw.trim().to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Due,
    RiskReview,
    ContractEnd,
    GovernanceReview,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub source: EventSource,
    pub kind: EventKind,
    pub title: String,
    pub date: NaiveDate,
    pub rag: Rag,
    pub link: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Comma-separated sources, e.g. `work_item,risk`. All when omitted.
    pub sources: Option<String>,
    /// Restricts work items to one team.
    pub team_id: Option<Uuid>,
    /// Work items assigned to (or, for other records, owned by) this user.
    pub assignee_id: Option<Uuid>,
}

impl CalendarQuery {
    pub fn validate(&self) -> Result<(), BowError> {
        if self.to < self.from {
            return Err(BowError::InvalidRange(format!(
                "'to' ({}) is before 'from' ({})",
                self.to, self.from
            )));
        }
        let span = (self.to - self.from).num_days();
        if span > MAX_SPAN_DAYS {
            return Err(BowError::InvalidRange(format!(
                "range of {span} days exceeds {MAX_SPAN_DAYS}"
            )));
        }
        Ok(())
    }

    pub fn sources(&self) -> Result<Vec<EventSource>, BowError> {
        let Some(raw) = self.sources.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(EventSource::ALL.to_vec());
        };
        let mut sources = Vec::new();
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let source = EventSource::parse(part)?;
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        Ok(sources)
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// Records to draw events from, already restricted to what the caller may see.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarInput<'a> {
    pub work_items: &'a [WorkItem],
    pub risks: &'a [Risk],
    pub suppliers: &'a [Supplier],
    pub governance: &'a [GovernanceItem],
}

pub fn events(
    input: CalendarInput<'_>,
    query: &CalendarQuery,
    today: NaiveDate,
    settings: RagSettings,
) -> Result<Vec<CalendarEvent>, BowError> {
    query.validate()?;
    let sources = query.sources()?;
    let mut out = Vec::new();
    let mut push = |id: Uuid, source: EventSource, kind: EventKind, title: &str, date: NaiveDate, rag: Rag| {
        if query.contains(date) {
            out.push(CalendarEvent {
                id,
                source,
                kind,
                title: title.to_string(),
                date,
                rag,
                link: source.link(id),
            });
        }
    };

    if sources.contains(&EventSource::WorkItem) {
        let items = input.work_items.iter().filter(|w| {
            query.team_id.map_or(true, |t| w.team_id == Some(t))
                && query.assignee_id.map_or(true, |a| w.assignee_id == Some(a))
        });
        for item in items {
            let rag = item.rag(today, settings.amber_days);
            if let Some(start) = item.start_date {
                push(item.id, EventSource::WorkItem, EventKind::Start, &item.title, start, rag);
            }
            if let Some(due) = item.due_date {
                push(item.id, EventSource::WorkItem, EventKind::Due, &item.title, due, rag);
            }
        }
    }

    let owned_by = |owner: Option<Uuid>| query.assignee_id.map_or(true, |a| owner == Some(a));

    if sources.contains(&EventSource::Risk) {
        for risk in input.risks.iter().filter(|r| owned_by(r.owner_id)) {
            if let Some(date) = risk.review_date {
                push(risk.id, EventSource::Risk, EventKind::RiskReview, &risk.title, date, risk.rag());
            }
        }
    }

    if sources.contains(&EventSource::Supplier) {
        for supplier in input.suppliers.iter().filter(|s| owned_by(s.owner_id)) {
            if let Some(date) = supplier.contract_end {
                let rag = supplier.rag(today, settings.contract_window_days);
                push(supplier.id, EventSource::Supplier, EventKind::ContractEnd, &supplier.name, date, rag);
            }
        }
    }

    if sources.contains(&EventSource::GovernanceItem) {
        for item in input.governance.iter().filter(|g| owned_by(g.owner_id)) {
            if let Some(date) = item.next_review_date {
                let rag = rag::governance_rag(item, today, settings.amber_days);
                push(item.id, EventSource::GovernanceItem, EventKind::GovernanceReview, &item.title, date, rag);
            }
        }
    }

    out.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.source.cmp(&b.source))
            .then_with(|| a.title.cmp(&b.title))
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateRisk, CreateWorkItem, RiskStatus};
    use chrono::Utc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn query(from: NaiveDate, to: NaiveDate) -> CalendarQuery {
        CalendarQuery { from, to, sources: None, team_id: None, assignee_id: None }
    }

    fn work_item(title: &str, start: Option<NaiveDate>, due: Option<NaiveDate>) -> WorkItem {
        WorkItem::new(
            CreateWorkItem {
                title: title.into(),
                start_date: start,
                due_date: due,
                ..Default::default()
            },
            Uuid::new_v4(),
            None,
            0,
            Utc::now(),
        )
    }

    #[test]
    fn range_is_validated() {
        assert!(query(d(2025, 3, 2), d(2025, 3, 1)).validate().is_err());
        assert!(query(d(2025, 1, 1), d(2026, 1, 2)).validate().is_ok());
        assert!(query(d(2025, 1, 1), d(2026, 1, 3)).validate().is_err());
    }

    #[test]
    fn sources_parse_leniently() {
        let mut q = query(d(2025, 1, 1), d(2025, 1, 31));
        q.sources = Some("Work Item, risk,risk, governance".into());
        assert_eq!(
            q.sources().unwrap(),
            vec![EventSource::WorkItem, EventSource::Risk, EventSource::GovernanceItem]
        );
        q.sources = Some("invoices".into());
        assert!(matches!(q.sources(), Err(BowError::UnknownVariant { .. })));
    }

    #[test]
    fn events_are_windowed_and_sorted() {
        let items = vec![
            work_item("Zeta rollout", Some(d(2025, 2, 25)), Some(d(2025, 3, 5))),
            work_item("Alpha review", None, Some(d(2025, 3, 5))),
        ];
        let risk = Risk::new(
            CreateRisk {
                title: "Data loss".into(),
                description: None,
                category: None,
                likelihood: 3,
                impact: 5,
                status: RiskStatus::Open,
                owner_id: None,
                department_id: None,
                mitigation: None,
                review_date: Some(d(2025, 3, 5)),
            },
            Uuid::new_v4(),
            None,
            Utc::now(),
        );
        let risks = vec![risk];
        let input = CalendarInput { work_items: &items, risks: &risks, ..Default::default() };

        let events = events(input, &query(d(2025, 3, 1), d(2025, 3, 31)), d(2025, 3, 1), RagSettings::default()).unwrap();
        let titles: Vec<_> = events.iter().map(|e| (e.title.as_str(), e.source)).collect();
        assert_eq!(
            titles,
            vec![
                ("Alpha review", EventSource::WorkItem),
                ("Zeta rollout", EventSource::WorkItem),
                ("Data loss", EventSource::Risk),
            ]
        );
        assert_eq!(events[2].rag, Rag::Red);
        assert!(events[0].link.starts_with("/work-items/"));
    }

    #[test]
    fn team_filter_limits_work_items() {
        let team = Uuid::new_v4();
        let mut mine = work_item("Mine", None, Some(d(2025, 3, 10)));
        mine.team_id = Some(team);
        let items = vec![mine, work_item("Other", None, Some(d(2025, 3, 10)))];
        let mut q = query(d(2025, 3, 1), d(2025, 3, 31));
        q.team_id = Some(team);
        let input = CalendarInput { work_items: &items, ..Default::default() };
        let events = events(input, &q, d(2025, 3, 1), RagSettings::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Mine");
    }
}
