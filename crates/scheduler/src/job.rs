//! The fixed table of background jobs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DeadlineReminders,
    OverdueAlerts,
    RiskReviewReminders,
    ContractExpiryAlerts,
    GovernanceReviewReminders,
    WeeklyDigest,
    PruneNotifications,
    Backup,
}

impl JobKind {
    pub const ALL: [JobKind; 8] = [
        JobKind::DeadlineReminders,
        JobKind::OverdueAlerts,
        JobKind::RiskReviewReminders,
        JobKind::ContractExpiryAlerts,
        JobKind::GovernanceReviewReminders,
        JobKind::WeeklyDigest,
        JobKind::PruneNotifications,
        JobKind::Backup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DeadlineReminders => "deadline_reminders",
            JobKind::OverdueAlerts => "overdue_alerts",
            JobKind::RiskReviewReminders => "risk_review_reminders",
            JobKind::ContractExpiryAlerts => "contract_expiry_alerts",
            JobKind::GovernanceReviewReminders => "governance_review_reminders",
            JobKind::WeeklyDigest => "weekly_digest",
            JobKind::PruneNotifications => "prune_notifications",
            JobKind::Backup => "backup",
        }
    }

    /// Default 5-field cron expression (UTC).
    pub fn default_cron(&self) -> &'static str {
        match self {
            JobKind::DeadlineReminders => "0 8 * * *",
            JobKind::OverdueAlerts => "30 8 * * *",
            JobKind::RiskReviewReminders => "0 9 * * Mon",
            JobKind::ContractExpiryAlerts => "15 9 * * Mon",
            JobKind::GovernanceReviewReminders => "30 9 * * Mon",
            JobKind::WeeklyDigest => "0 7 * * Mon",
            JobKind::PruneNotifications => "0 3 * * *",
            JobKind::Backup => "0 2 * * *",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            JobKind::DeadlineReminders => "Remind assignees of work items due soon",
            JobKind::OverdueAlerts => "Alert assignees of overdue work items",
            JobKind::RiskReviewReminders => "Remind risk owners of due reviews",
            JobKind::ContractExpiryAlerts => "Warn supplier owners of expiring contracts",
            JobKind::GovernanceReviewReminders => "Remind governance owners of due reviews",
            JobKind::WeeklyDigest => "Send each user a summary of their open work",
            JobKind::PruneNotifications => "Delete old read notifications",
            JobKind::Backup => "Snapshot the database and prune old backups",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = SchedulerError;

    /// Accepts `deadline_reminders`, `deadline-reminders` and any casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        JobKind::ALL
            .into_iter()
            .find(|j| j.as_str() == normalized)
            .ok_or_else(|| SchedulerError::UnknownJob(s.trim().to_string()))
    }
}
