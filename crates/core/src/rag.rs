//! Red/Amber/Green/Blue status flags.
//!
//! Blue means "finished, no longer tracked". Everything else is driven by a
//! deadline or, for risks, by the likelihood × impact score.

use chrono::NaiveDate;

use crate::config::ScheduleConfig;
use crate::models::{GovernanceItem, Rag, RiskStatus, Supplier, WorkItem};

/// Score at or above which an open risk is red.
pub const RISK_RED_SCORE: i32 = 15;
/// Score at or above which an open risk is amber.
pub const RISK_AMBER_SCORE: i32 = 6;

/// Amber horizons, in days before the relevant date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RagSettings {
    pub amber_days: u32,
    pub contract_window_days: u32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            amber_days: 14,
            contract_window_days: 90,
        }
    }
}

impl From<&ScheduleConfig> for RagSettings {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            amber_days: config.rag_amber_days,
            contract_window_days: config.contract_expiry_window_days,
        }
    }
}

pub fn deadline_rag(due: Option<NaiveDate>, done: bool, today: NaiveDate, amber_days: u32) -> Rag {
    if done {
        return Rag::Blue;
    }
    let Some(due) = due else {
        return Rag::Green;
    };
    if due < today {
        Rag::Red
    } else if (due - today).num_days() <= i64::from(amber_days) {
        Rag::Amber
    } else {
        Rag::Green
    }
}

pub fn risk_rag(score: i32, status: RiskStatus) -> Rag {
    if status == RiskStatus::Closed {
        Rag::Blue
    } else if score >= RISK_RED_SCORE {
        Rag::Red
    } else if score >= RISK_AMBER_SCORE {
        Rag::Amber
    } else {
        Rag::Green
    }
}

/// A manual override set on the item always wins.
pub fn work_item_rag(item: &WorkItem, today: NaiveDate, amber_days: u32) -> Rag {
    item.rag_override
        .unwrap_or_else(|| deadline_rag(item.due_date, item.status.is_done(), today, amber_days))
}

pub fn supplier_rag(supplier: &Supplier, today: NaiveDate, window_days: u32) -> Rag {
    deadline_rag(supplier.contract_end, !supplier.is_current(), today, window_days)
}

pub fn governance_rag(item: &GovernanceItem, today: NaiveDate, amber_days: u32) -> Rag {
    deadline_rag(item.next_review_date, item.is_retired(), today, amber_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateWorkItem, WorkStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn deadline_boundaries() {
        let today = d(2025, 3, 1);
        assert_eq!(deadline_rag(None, false, today, 14), Rag::Green);
        assert_eq!(deadline_rag(Some(d(2025, 2, 28)), false, today, 14), Rag::Red);
        assert_eq!(deadline_rag(Some(today), false, today, 14), Rag::Amber);
        assert_eq!(deadline_rag(Some(d(2025, 3, 15)), false, today, 14), Rag::Amber);
        assert_eq!(deadline_rag(Some(d(2025, 3, 16)), false, today, 14), Rag::Green);
        assert_eq!(deadline_rag(Some(d(2025, 2, 1)), true, today, 14), Rag::Blue);
    }

    #[test]
    fn risk_thresholds() {
        assert_eq!(risk_rag(25, RiskStatus::Closed), Rag::Blue);
        assert_eq!(risk_rag(15, RiskStatus::Open), Rag::Red);
        assert_eq!(risk_rag(14, RiskStatus::Mitigating), Rag::Amber);
        assert_eq!(risk_rag(6, RiskStatus::Accepted), Rag::Amber);
        assert_eq!(risk_rag(5, RiskStatus::Open), Rag::Green);
    }

    #[test]
    fn override_beats_deadline() {
        let mut item = WorkItem::new(
            CreateWorkItem { title: "Audit prep".into(), ..Default::default() },
            Uuid::new_v4(),
            None,
            0,
            Utc::now(),
        );
        let today = d(2025, 3, 1);
        item.due_date = Some(d(2025, 1, 1));
        assert_eq!(work_item_rag(&item, today, 14), Rag::Red);
        item.rag_override = Some(Rag::Green);
        assert_eq!(work_item_rag(&item, today, 14), Rag::Green);
        item.rag_override = None;
        item.set_status(WorkStatus::Done, Utc::now());
        assert_eq!(work_item_rag(&item, today, 14), Rag::Blue);
    }
}
