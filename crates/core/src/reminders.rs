//! Selection of records that scheduled jobs should remind people about.
//!
//! Everything here is pure: callers pass in the records and `today`, and
//! get back what to notify. Persisting and sending happen in the server.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::calendar::EventSource;
use crate::models::{GovernanceItem, NotificationKind, Risk, Supplier, User, WorkItem};

/// One notification-worthy fact about one record, for one person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub subject_id: Uuid,
    pub title: String,
    pub due: NaiveDate,
    /// Negative when the date has passed.
    pub days_until: i64,
    pub link: String,
    pub dedupe_key: String,
}

impl Reminder {
    fn new(
        recipient_id: Uuid,
        kind: NotificationKind,
        source: EventSource,
        subject_id: Uuid,
        title: &str,
        due: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        Self {
            recipient_id,
            kind,
            subject_id,
            title: title.to_string(),
            due,
            days_until: (due - today).num_days(),
            link: source.link(subject_id),
            dedupe_key: dedupe_key(kind, subject_id, today),
        }
    }
}

/// At most one stored notification per kind, record and day.
pub fn dedupe_key(kind: NotificationKind, subject_id: Uuid, date: NaiveDate) -> String {
    format!("{}:{}:{}", kind.as_str(), subject_id, date.format("%Y-%m-%d"))
}

fn horizon(today: NaiveDate, window_days: u32) -> NaiveDate {
    today + Duration::days(i64::from(window_days))
}

pub fn deadline_reminders(items: &[WorkItem], today: NaiveDate, window_days: u32) -> Vec<Reminder> {
    let until = horizon(today, window_days);
    items
        .iter()
        .filter(|w| w.is_open())
        .filter_map(|w| {
            let due = w.due_date.filter(|d| *d >= today && *d <= until)?;
            let recipient = w.responsible_id()?;
            Some(Reminder::new(
                recipient,
                NotificationKind::DeadlineApproaching,
                EventSource::WorkItem,
                w.id,
                &w.title,
                due,
                today,
            ))
        })
        .collect()
}

pub fn overdue_items(items: &[WorkItem], today: NaiveDate) -> Vec<Reminder> {
    items
        .iter()
        .filter(|w| w.is_overdue(today))
        .filter_map(|w| {
            let recipient = w.responsible_id()?;
            let due = w.due_date?;
            Some(Reminder::new(
                recipient,
                NotificationKind::Overdue,
                EventSource::WorkItem,
                w.id,
                &w.title,
                due,
                today,
            ))
        })
        .collect()
}

/// Open risks whose review date is within the window or already past.
pub fn risk_reviews_due(risks: &[Risk], today: NaiveDate, window_days: u32) -> Vec<Reminder> {
    let until = horizon(today, window_days);
    risks
        .iter()
        .filter(|r| r.is_open())
        .filter_map(|r| {
            let due = r.review_date.filter(|d| *d <= until)?;
            let recipient = r.owner_id?;
            Some(Reminder::new(
                recipient,
                NotificationKind::RiskReview,
                EventSource::Risk,
                r.id,
                &r.title,
                due,
                today,
            ))
        })
        .collect()
}

pub fn expiring_contracts(suppliers: &[Supplier], today: NaiveDate, window_days: u32) -> Vec<Reminder> {
    let until = horizon(today, window_days);
    suppliers
        .iter()
        .filter(|s| s.is_current())
        .filter_map(|s| {
            let due = s.contract_end.filter(|d| *d >= today && *d <= until)?;
            let recipient = s.owner_id?;
            Some(Reminder::new(
                recipient,
                NotificationKind::ContractExpiring,
                EventSource::Supplier,
                s.id,
                &s.name,
                due,
                today,
            ))
        })
        .collect()
}

pub fn governance_reviews_due(items: &[GovernanceItem], today: NaiveDate, window_days: u32) -> Vec<Reminder> {
    let until = horizon(today, window_days);
    items
        .iter()
        .filter(|g| !g.is_retired())
        .filter_map(|g| {
            let due = g.next_review_date.filter(|d| *d <= until)?;
            let recipient = g.owner_id?;
            Some(Reminder::new(
                recipient,
                NotificationKind::GovernanceReview,
                EventSource::GovernanceItem,
                g.id,
                &g.title,
                due,
                today,
            ))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestLine {
    pub id: Uuid,
    pub title: String,
    pub due: Option<NaiveDate>,
    pub link: String,
}

/// Weekly summary of one user's open work.
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub open: usize,
    pub overdue: Vec<DigestLine>,
    pub due_this_week: Vec<DigestLine>,
    pub dedupe_key: String,
}

/// `None` when the user has no open work.
pub fn weekly_digest(user: &User, items: &[WorkItem], today: NaiveDate) -> Option<Digest> {
    let week_end = horizon(today, 7);
    let mine: Vec<&WorkItem> = items
        .iter()
        .filter(|w| w.is_open() && w.responsible_id() == Some(user.id))
        .collect();
    if mine.is_empty() {
        return None;
    }

    let line = |w: &WorkItem| DigestLine {
        id: w.id,
        title: w.title.clone(),
        due: w.due_date,
        link: EventSource::WorkItem.link(w.id),
    };
    let mut overdue: Vec<DigestLine> = mine.iter().filter(|w| w.is_overdue(today)).map(|w| line(w)).collect();
    let mut due_this_week: Vec<DigestLine> = mine
        .iter()
        .filter(|w| w.due_date.is_some_and(|d| d >= today && d <= week_end))
        .map(|w| line(w))
        .collect();
    overdue.sort_by_key(|l| l.due);
    due_this_week.sort_by_key(|l| l.due);

    Some(Digest {
        recipient_id: user.id,
        recipient_name: user.name.clone(),
        open: mine.len(),
        overdue,
        due_this_week,
        dedupe_key: dedupe_key(NotificationKind::WeeklyDigest, user.id, today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateGovernanceItem, CreateRisk, CreateSupplier, CreateWorkItem, GovernanceKind, GovernanceStatus, Role,
        RiskStatus, SupplierStatus, WorkStatus,
    };
    use chrono::Utc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(owner: Uuid, assignee: Option<Uuid>, status: WorkStatus, due: Option<NaiveDate>) -> WorkItem {
        WorkItem::new(
            CreateWorkItem {
                title: "Quarterly filing".into(),
                status,
                assignee_id: assignee,
                due_date: due,
                ..Default::default()
            },
            owner,
            None,
            0,
            Utc::now(),
        )
    }

    #[test]
    fn deadline_window_and_recipient() {
        let owner = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let today = d(2025, 4, 1);
        let items = vec![
            item(owner, Some(assignee), WorkStatus::Todo, Some(d(2025, 4, 8))),
            item(owner, None, WorkStatus::Todo, Some(d(2025, 4, 1))),
            item(owner, None, WorkStatus::Todo, Some(d(2025, 4, 9))),
            item(owner, None, WorkStatus::Done, Some(d(2025, 4, 2))),
            item(owner, None, WorkStatus::Todo, Some(d(2025, 3, 31))),
        ];
        let reminders = deadline_reminders(&items, today, 7);
        assert_eq!(reminders.len(), 2);
        assert_eq!(reminders[0].recipient_id, assignee);
        assert_eq!(reminders[0].days_until, 7);
        assert_eq!(reminders[1].recipient_id, owner);
        assert_eq!(
            reminders[0].dedupe_key,
            format!("deadline_approaching:{}:2025-04-01", items[0].id)
        );

        let overdue = overdue_items(&items, today);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].days_until, -1);
        assert_eq!(overdue[0].kind, NotificationKind::Overdue);
    }

    #[test]
    fn digest_covers_open_work_only() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Grace".into(),
            email: "grace@example.com".into(),
            role: Role::Member,
            department_id: None,
            team_id: None,
            is_active: true,
            email_notifications: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let today = d(2025, 4, 7);
        let other = Uuid::new_v4();
        let items = vec![
            item(other, Some(user.id), WorkStatus::InProgress, Some(d(2025, 4, 1))),
            item(user.id, None, WorkStatus::Todo, Some(d(2025, 4, 10))),
            item(user.id, None, WorkStatus::Backlog, None),
            item(user.id, Some(other), WorkStatus::Todo, Some(d(2025, 4, 8))),
        ];
        let digest = weekly_digest(&user, &items, today).unwrap();
        assert_eq!(digest.open, 3);
        assert_eq!(digest.overdue.len(), 1);
        assert_eq!(digest.due_this_week.len(), 1);

        assert!(weekly_digest(&user, &items[3..], today).is_none());
    }

    fn risk(owner: Uuid, status: RiskStatus, review: Option<NaiveDate>) -> Risk {
        Risk::new(
            CreateRisk {
                title: "Key supplier insolvency".into(),
                description: None,
                category: None,
                likelihood: 3,
                impact: 4,
                status,
                owner_id: None,
                department_id: None,
                mitigation: None,
                review_date: review,
            },
            owner,
            None,
            Utc::now(),
        )
    }

    fn supplier(owner: Uuid, status: SupplierStatus, end: Option<NaiveDate>) -> Supplier {
        Supplier::new(
            CreateSupplier {
                name: "Acme Cleaning".into(),
                contact_name: None,
                contact_email: None,
                phone: None,
                category: None,
                criticality: Default::default(),
                status,
                contract_start: None,
                contract_end: end,
                annual_value_cents: None,
                owner_id: None,
                department_id: None,
                notes: None,
            },
            owner,
            None,
            Utc::now(),
        )
    }

    fn procedure(owner: Uuid, status: GovernanceStatus, next_review: Option<NaiveDate>) -> GovernanceItem {
        GovernanceItem::new(
            CreateGovernanceItem {
                title: "Incident response procedure".into(),
                description: None,
                kind: GovernanceKind::Procedure,
                status,
                review_frequency: Default::default(),
                last_reviewed: None,
                next_review_date: next_review,
                owner_id: None,
                department_id: None,
            },
            owner,
            None,
            Utc::now(),
        )
    }

    fn due_dates(reminders: &[Reminder]) -> Vec<NaiveDate> {
        reminders.iter().map(|r| r.due).collect()
    }

    #[test]
    fn overdue_skips_done_undated_and_due_today() {
        let owner = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let today = d(2025, 4, 1);
        let mut orphan = item(owner, None, WorkStatus::Todo, Some(d(2025, 3, 1)));
        orphan.owner_id = None;
        let items = vec![
            item(owner, Some(assignee), WorkStatus::Blocked, Some(d(2025, 3, 20))),
            item(owner, None, WorkStatus::Todo, Some(today)),
            item(owner, None, WorkStatus::Done, Some(d(2025, 3, 1))),
            item(owner, None, WorkStatus::Backlog, None),
            orphan,
        ];
        let overdue = overdue_items(&items, today);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].recipient_id, assignee);
        assert_eq!(overdue[0].days_until, -12);
        assert_eq!(overdue[0].link, format!("/work-items/{}", items[0].id));
    }

    #[test]
    fn risk_reviews_include_past_dates_but_not_closed_risks() {
        let owner = Uuid::new_v4();
        let today = d(2025, 4, 1);
        let risks = vec![
            risk(owner, RiskStatus::Open, Some(d(2025, 2, 1))),
            risk(owner, RiskStatus::Mitigating, Some(today)),
            risk(owner, RiskStatus::Accepted, Some(d(2025, 4, 8))),
            risk(owner, RiskStatus::Open, Some(d(2025, 4, 9))),
            risk(owner, RiskStatus::Closed, Some(d(2025, 3, 1))),
            risk(owner, RiskStatus::Open, None),
        ];
        let due = risk_reviews_due(&risks, today, 7);
        assert_eq!(due_dates(&due), vec![d(2025, 2, 1), today, d(2025, 4, 8)]);
        assert!(due.iter().all(|r| r.recipient_id == owner && r.kind == NotificationKind::RiskReview));
        assert_eq!(due[0].days_until, -59);
    }

    #[test]
    fn expiring_contracts_stay_inside_the_window() {
        let owner = Uuid::new_v4();
        let today = d(2025, 4, 1);
        let suppliers = vec![
            supplier(owner, SupplierStatus::Active, Some(d(2025, 3, 31))),
            supplier(owner, SupplierStatus::Active, Some(today)),
            supplier(owner, SupplierStatus::Onboarding, Some(d(2025, 6, 30))),
            supplier(owner, SupplierStatus::UnderReview, Some(d(2025, 7, 1))),
            supplier(owner, SupplierStatus::Inactive, Some(d(2025, 4, 10))),
            supplier(owner, SupplierStatus::Active, None),
        ];
        let expiring = expiring_contracts(&suppliers, today, 90);
        assert_eq!(due_dates(&expiring), vec![today, d(2025, 6, 30)]);
        assert_eq!(expiring[0].kind, NotificationKind::ContractExpiring);
        assert_eq!(expiring[0].title, "Acme Cleaning");
    }

    #[test]
    fn governance_reviews_skip_retired_items() {
        let owner = Uuid::new_v4();
        let today = d(2025, 4, 1);
        let items = vec![
            procedure(owner, GovernanceStatus::Active, Some(d(2025, 3, 1))),
            procedure(owner, GovernanceStatus::Draft, Some(d(2025, 4, 15))),
            procedure(owner, GovernanceStatus::UnderReview, Some(d(2025, 4, 16))),
            procedure(owner, GovernanceStatus::Retired, Some(d(2025, 3, 1))),
            procedure(owner, GovernanceStatus::Active, None),
        ];
        let due = governance_reviews_due(&items, today, 14);
        assert_eq!(due_dates(&due), vec![d(2025, 3, 1), d(2025, 4, 15)]);
        assert_eq!(
            due[1].dedupe_key,
            format!("governance_review:{}:2025-04-01", items[1].id)
        );
    }
}
