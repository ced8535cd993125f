//! Dashboard aggregation over already-fetched, permission-filtered records.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::calendar::{self, CalendarEvent, CalendarInput, CalendarQuery, EventKind};
use crate::models::{
    Criticality, GovernanceItem, GovernanceStatus, Rag, Risk, RiskView, Supplier, SupplierView, Team,
    WorkItem, WorkStatus,
};
use crate::models::risk::{SCALE_MAX, SCALE_MIN};
use crate::rag::RagSettings;

const DUE_SOON_DAYS: i64 = 7;
const COMPLETED_LOOKBACK_DAYS: i64 = 30;
const UPCOMING_DAYS: i64 = 14;
const UPCOMING_LIMIT: usize = 20;
const TOP_RISKS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    pub rag: RagSettings,
    /// Horizon for "governance reviews due".
    pub review_window_days: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            rag: RagSettings::default(),
            review_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardInput<'a> {
    pub work_items: &'a [WorkItem],
    pub risks: &'a [Risk],
    pub suppliers: &'a [Supplier],
    pub governance: &'a [GovernanceItem],
    pub teams: &'a [Team],
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkItemSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_rag: BTreeMap<String, usize>,
    pub overdue: usize,
    pub due_this_week: usize,
    pub completed_last_30_days: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RiskSummary {
    pub total: usize,
    pub open: usize,
    pub by_rag: BTreeMap<String, usize>,
    /// `heat_map[likelihood - 1][impact - 1]`, open risks only.
    pub heat_map: Vec<Vec<usize>>,
    pub top: Vec<RiskView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupplierSummary {
    pub total: usize,
    /// Suppliers in the `active` status only.
    pub active: usize,
    pub by_criticality: BTreeMap<String, usize>,
    pub expiring: Vec<SupplierView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GovernanceSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub reviews_due: usize,
    pub overdue_reviews: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamWorkload {
    pub team_id: Uuid,
    pub team_name: String,
    pub open: usize,
    pub overdue: usize,
    pub blocked: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub work_items: WorkItemSummary,
    pub risks: RiskSummary,
    pub suppliers: SupplierSummary,
    pub governance: GovernanceSummary,
    pub upcoming: Vec<CalendarEvent>,
    pub teams: Vec<TeamWorkload>,
}

fn zeroed<I: IntoIterator<Item = &'static str>>(keys: I) -> BTreeMap<String, usize> {
    keys.into_iter().map(|k| (k.to_string(), 0)).collect()
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

fn within(date: NaiveDate, today: NaiveDate, days: i64) -> bool {
    date >= today && date <= today + Duration::days(days)
}

pub fn build(input: DashboardInput<'_>, today: NaiveDate, settings: DashboardSettings) -> Dashboard {
    Dashboard {
        today,
        work_items: work_item_summary(input.work_items, today, settings.rag.amber_days),
        risks: risk_summary(input.risks),
        suppliers: supplier_summary(input.suppliers, today, settings.rag.contract_window_days),
        governance: governance_summary(input.governance, today, settings.review_window_days),
        upcoming: upcoming(input, today, settings.rag),
        teams: team_workload(input.teams, input.work_items, today),
    }
}

pub fn work_item_summary(items: &[WorkItem], today: NaiveDate, amber_days: u32) -> WorkItemSummary {
    let mut by_status = zeroed(WorkStatus::ALL.iter().map(|s| s.as_str()));
    let mut by_rag = zeroed(Rag::ALL.iter().map(|r| r.as_str()));
    let completed_since = today - Duration::days(COMPLETED_LOOKBACK_DAYS);
    let mut overdue = 0;
    let mut due_this_week = 0;
    let mut completed = 0;

    for item in items {
        bump(&mut by_status, item.status.as_str());
        bump(&mut by_rag, item.rag(today, amber_days).as_str());
        if item.is_overdue(today) {
            overdue += 1;
        }
        if item.is_open() && item.due_date.is_some_and(|d| within(d, today, DUE_SOON_DAYS)) {
            due_this_week += 1;
        }
        if item
            .completed_at
            .is_some_and(|at| at.date_naive() >= completed_since && at.date_naive() <= today)
        {
            completed += 1;
        }
    }

    WorkItemSummary {
        total: items.len(),
        by_status,
        by_rag,
        overdue,
        due_this_week,
        completed_last_30_days: completed,
    }
}

pub fn risk_summary(risks: &[Risk]) -> RiskSummary {
    let size = (SCALE_MAX - SCALE_MIN + 1) as usize;
    let mut heat_map = vec![vec![0usize; size]; size];
    let mut by_rag = zeroed(Rag::ALL.iter().map(|r| r.as_str()));

    for risk in risks {
        bump(&mut by_rag, risk.rag().as_str());
        if !risk.is_open() {
            continue;
        }
        let row = usize::try_from(risk.likelihood - SCALE_MIN).ok();
        let col = usize::try_from(risk.impact - SCALE_MIN).ok();
        if let (Some(row), Some(col)) = (row, col) {
            if row < size && col < size {
                heat_map[row][col] += 1;
            }
        }
    }

    let mut open: Vec<&Risk> = risks.iter().filter(|r| r.is_open()).collect();
    open.sort_by(|a, b| b.score().cmp(&a.score()).then(b.created_at.cmp(&a.created_at)));
    let top = open.iter().take(TOP_RISKS).map(|r| RiskView::from((*r).clone())).collect();

    RiskSummary {
        total: risks.len(),
        open: open.len(),
        by_rag,
        heat_map,
        top,
    }
}

pub fn supplier_summary(suppliers: &[Supplier], today: NaiveDate, window_days: u32) -> SupplierSummary {
    let mut by_criticality = zeroed(Criticality::ALL.iter().map(|c| c.as_str()));
    let mut expiring = Vec::new();
    let mut active = 0;

    for supplier in suppliers {
        bump(&mut by_criticality, supplier.criticality.as_str());
        if supplier.is_active() {
            active += 1;
        }
        let expires_soon = supplier
            .contract_end
            .is_some_and(|end| within(end, today, i64::from(window_days)));
        if supplier.is_current() && expires_soon {
            expiring.push(SupplierView::new(supplier.clone(), today, window_days));
        }
    }
    expiring.sort_by_key(|v| v.supplier.contract_end);

    SupplierSummary {
        total: suppliers.len(),
        active,
        by_criticality,
        expiring,
    }
}

pub fn governance_summary(items: &[GovernanceItem], today: NaiveDate, window_days: u32) -> GovernanceSummary {
    let mut by_status = zeroed(GovernanceStatus::ALL.iter().map(|s| s.as_str()));
    let mut reviews_due = 0;
    let mut overdue_reviews = 0;

    for item in items {
        bump(&mut by_status, item.status.as_str());
        if item.is_retired() {
            continue;
        }
        match item.next_review_date {
            Some(date) if date < today => overdue_reviews += 1,
            Some(date) if within(date, today, i64::from(window_days)) => reviews_due += 1,
            _ => {}
        }
    }

    GovernanceSummary {
        total: items.len(),
        by_status,
        reviews_due,
        overdue_reviews,
    }
}

/// Open deadlines in the next fortnight across every record type.
pub fn upcoming(input: DashboardInput<'_>, today: NaiveDate, settings: RagSettings) -> Vec<CalendarEvent> {
    let query = CalendarQuery {
        from: today,
        to: today + Duration::days(UPCOMING_DAYS),
        sources: None,
        team_id: None,
        assignee_id: None,
    };
    let calendar_input = CalendarInput {
        work_items: input.work_items,
        risks: input.risks,
        suppliers: input.suppliers,
        governance: input.governance,
    };
    let mut events: Vec<CalendarEvent> = calendar::events(calendar_input, &query, today, settings)
        .unwrap_or_default()
        .into_iter()
        .filter(|e| e.kind != EventKind::Start && e.rag != Rag::Blue)
        .collect();
    events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));
    events.truncate(UPCOMING_LIMIT);
    events
}

pub fn team_workload(teams: &[Team], items: &[WorkItem], today: NaiveDate) -> Vec<TeamWorkload> {
    let mut rows: Vec<TeamWorkload> = teams
        .iter()
        .map(|team| {
            let open: Vec<&WorkItem> = items
                .iter()
                .filter(|w| w.team_id == Some(team.id) && w.is_open())
                .collect();
            TeamWorkload {
                team_id: team.id,
                team_name: team.name.clone(),
                open: open.len(),
                overdue: open.iter().filter(|w| w.is_overdue(today)).count(),
                blocked: open.iter().filter(|w| w.status == WorkStatus::Blocked).count(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.team_name.to_lowercase().cmp(&b.team_name.to_lowercase()));
    rows
}
