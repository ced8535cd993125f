//! Closed value sets stored as snake_case text columns.

use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use utoipa::ToSchema;

use crate::error::BowError;

/// Lower-case and fold spaces/dashes to underscores so that "In Progress",
/// "in-progress" and "IN_PROGRESS" all parse as `in_progress`.
pub fn normalize_variant(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = BowError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = normalize_variant(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| BowError::UnknownVariant {
                        field: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&str as Decode<Postgres>>::decode(value)?;
                Ok(raw.parse::<$name>()?)
            }
        }

        impl<'q> Encode<'q, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Access level of a user account.
    pub enum Role {
        Admin => "admin",
        Manager => "manager",
        Member => "member",
        Viewer => "viewer",
    }
}

text_enum! {
    /// Kanban column of a work item.
    pub enum WorkStatus {
        Backlog => "backlog",
        Todo => "todo",
        InProgress => "in_progress",
        Review => "review",
        Blocked => "blocked",
        Done => "done",
    }
}

text_enum! {
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

text_enum! {
    pub enum RiskStatus {
        Open => "open",
        Mitigating => "mitigating",
        Accepted => "accepted",
        Closed => "closed",
    }
}

text_enum! {
    pub enum Criticality {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

text_enum! {
    pub enum SupplierStatus {
        Onboarding => "onboarding",
        Active => "active",
        UnderReview => "under_review",
        Inactive => "inactive",
    }
}

text_enum! {
    pub enum GovernanceKind {
        Policy => "policy",
        Procedure => "procedure",
        Standard => "standard",
        Audit => "audit",
        Committee => "committee",
        Regulatory => "regulatory",
    }
}

text_enum! {
    pub enum GovernanceStatus {
        Draft => "draft",
        Active => "active",
        UnderReview => "under_review",
        Retired => "retired",
    }
}

text_enum! {
    pub enum ReviewFrequency {
        Monthly => "monthly",
        Quarterly => "quarterly",
        SemiAnnual => "semi_annual",
        Annual => "annual",
    }
}

text_enum! {
    pub enum NotificationKind {
        Assigned => "assigned",
        DeadlineApproaching => "deadline_approaching",
        Overdue => "overdue",
        RiskReview => "risk_review",
        ContractExpiring => "contract_expiring",
        GovernanceReview => "governance_review",
        WeeklyDigest => "weekly_digest",
        ImportCompleted => "import_completed",
    }
}

text_enum! {
    /// Red/Amber/Green/Blue flag used across the dashboard.
    pub enum Rag {
        Red => "red",
        Amber => "amber",
        Green => "green",
        Blue => "blue",
    }
}

impl Default for WorkStatus {
    fn default() -> Self {
        WorkStatus::Backlog
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Default for RiskStatus {
    fn default() -> Self {
        RiskStatus::Open
    }
}

impl Default for Criticality {
    fn default() -> Self {
        Criticality::Medium
    }
}

impl Default for SupplierStatus {
    fn default() -> Self {
        SupplierStatus::Onboarding
    }
}

impl Default for GovernanceStatus {
    fn default() -> Self {
        GovernanceStatus::Draft
    }
}

impl Default for ReviewFrequency {
    fn default() -> Self {
        ReviewFrequency::Annual
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Member
    }
}

impl ReviewFrequency {
    pub fn months(&self) -> u32 {
        match self {
            ReviewFrequency::Monthly => 1,
            ReviewFrequency::Quarterly => 3,
            ReviewFrequency::SemiAnnual => 6,
            ReviewFrequency::Annual => 12,
        }
    }
}

impl WorkStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, WorkStatus::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_and_separator_insensitive() {
        assert_eq!("In Progress".parse::<WorkStatus>().unwrap(), WorkStatus::InProgress);
        assert_eq!("in-progress".parse::<WorkStatus>().unwrap(), WorkStatus::InProgress);
        assert_eq!(" SEMI_ANNUAL ".parse::<ReviewFrequency>().unwrap(), ReviewFrequency::SemiAnnual);
        assert!("someday".parse::<WorkStatus>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        for status in WorkStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_string()));
        }
        for kind in NotificationKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str(), Some(kind.as_str()));
        }
    }

    #[test]
    fn unknown_variant_names_the_type() {
        let err = "purple".parse::<Rag>().unwrap_err();
        assert_eq!(err.to_string(), "unknown value 'purple' for Rag");
    }
}
