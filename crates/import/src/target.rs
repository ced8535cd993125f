//! Importable entities and their column tables.

use std::fmt;
use std::str::FromStr;

use bow_core::models::enums::normalize_variant;
use bow_core::models::{
    Criticality, GovernanceKind, GovernanceStatus, Priority, ReviewFrequency, RiskStatus,
    SupplierStatus, WorkStatus,
};
use bow_core::Resource;
use serde::{Deserialize, Serialize};

/// Canonical text of an enum value, or `None` when it is not recognised.
pub type ChoiceParser = fn(&str) -> Option<String>;

fn choice<E: FromStr + fmt::Display>(raw: &str) -> Option<String> {
    raw.parse::<E>().ok().map(|v| v.to_string())
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    LongText,
    Date,
    Integer { min: i64, max: i64 },
    /// Decimal amount stored as integer cents.
    Money,
    Email,
    Choice(ChoiceParser),
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::LongText => "text",
            FieldKind::Date => "date",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Money => "money",
            FieldKind::Email => "email",
            FieldKind::Choice(_) => "choice",
        }
    }
}

/// One importable column of a target.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Key in the normalised record.
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
    /// Extra header spellings recognised by [`crate::suggest_mapping`].
    pub aliases: &'static [&'static str],
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    aliases: &'static [&'static str],
) -> FieldSpec {
    FieldSpec { name, label, required: false, kind, aliases }
}

const fn required(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    aliases: &'static [&'static str],
) -> FieldSpec {
    FieldSpec { name, label, required: true, kind, aliases }
}

const SCORE: FieldKind = FieldKind::Integer { min: 1, max: 5 };

static WORK_ITEM_FIELDS: &[FieldSpec] = &[
    required("title", "Title", FieldKind::Text, &["name", "task", "work item", "summary"]),
    field("description", "Description", FieldKind::LongText, &["details", "notes"]),
    field("status", "Status", FieldKind::Choice(choice::<WorkStatus>), &["state", "column"]),
    field("priority", "Priority", FieldKind::Choice(choice::<Priority>), &[]),
    field("start_date", "Start date", FieldKind::Date, &["start", "starts"]),
    field("due_date", "Due date", FieldKind::Date, &["due", "deadline", "end date"]),
    field("assignee_email", "Assignee email", FieldKind::Email, &["assignee", "assigned to"]),
];

static RISK_FIELDS: &[FieldSpec] = &[
    required("title", "Title", FieldKind::Text, &["risk", "name", "risk title"]),
    field("description", "Description", FieldKind::LongText, &["details"]),
    field("category", "Category", FieldKind::Text, &["type"]),
    required("likelihood", "Likelihood", SCORE, &["probability"]),
    required("impact", "Impact", SCORE, &["severity", "consequence"]),
    field("status", "Status", FieldKind::Choice(choice::<RiskStatus>), &[]),
    field("mitigation", "Mitigation", FieldKind::LongText, &["mitigations", "controls", "treatment"]),
    field("review_date", "Review date", FieldKind::Date, &["review", "next review"]),
    field("owner_email", "Owner email", FieldKind::Email, &["owner", "risk owner"]),
];

static SUPPLIER_FIELDS: &[FieldSpec] = &[
    required("name", "Name", FieldKind::Text, &["supplier", "supplier name", "vendor", "company"]),
    field("contact_name", "Contact name", FieldKind::Text, &["contact"]),
    field("contact_email", "Contact email", FieldKind::Email, &["email"]),
    field("phone", "Phone", FieldKind::Text, &["telephone", "phone number"]),
    field("category", "Category", FieldKind::Text, &["type", "service"]),
    field("criticality", "Criticality", FieldKind::Choice(choice::<Criticality>), &["tier"]),
    field("status", "Status", FieldKind::Choice(choice::<SupplierStatus>), &[]),
    field("contract_start", "Contract start", FieldKind::Date, &["start date"]),
    field("contract_end", "Contract end", FieldKind::Date, &["end date", "expiry", "renewal date"]),
    field("annual_value_cents", "Annual value", FieldKind::Money, &["value", "contract value", "annual spend"]),
    field("owner_email", "Owner email", FieldKind::Email, &["owner"]),
    field("notes", "Notes", FieldKind::LongText, &["comments"]),
];

static GOVERNANCE_FIELDS: &[FieldSpec] = &[
    required("title", "Title", FieldKind::Text, &["name", "document"]),
    field("description", "Description", FieldKind::LongText, &["summary"]),
    required("kind", "Type", FieldKind::Choice(choice::<GovernanceKind>), &["kind", "category"]),
    field("status", "Status", FieldKind::Choice(choice::<GovernanceStatus>), &[]),
    field("review_frequency", "Review frequency", FieldKind::Choice(choice::<ReviewFrequency>), &["frequency", "review cycle"]),
    field("last_reviewed", "Last reviewed", FieldKind::Date, &["last review", "reviewed"]),
    field("next_review_date", "Next review date", FieldKind::Date, &["next review", "review date"]),
    field("owner_email", "Owner email", FieldKind::Email, &["owner"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportTarget {
    WorkItems,
    Risks,
    Suppliers,
    GovernanceItems,
}

impl ImportTarget {
    pub const ALL: [ImportTarget; 4] = [
        ImportTarget::WorkItems,
        ImportTarget::Risks,
        ImportTarget::Suppliers,
        ImportTarget::GovernanceItems,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportTarget::WorkItems => "work_items",
            ImportTarget::Risks => "risks",
            ImportTarget::Suppliers => "suppliers",
            ImportTarget::GovernanceItems => "governance_items",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ImportTarget::WorkItems => WORK_ITEM_FIELDS,
            ImportTarget::Risks => RISK_FIELDS,
            ImportTarget::Suppliers => SUPPLIER_FIELDS,
            ImportTarget::GovernanceItems => GOVERNANCE_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Permission resource the imported records belong to.
    pub fn resource(&self) -> Resource {
        match self {
            ImportTarget::WorkItems => Resource::WorkItem,
            ImportTarget::Risks => Resource::Risk,
            ImportTarget::Suppliers => Resource::Supplier,
            ImportTarget::GovernanceItems => Resource::GovernanceItem,
        }
    }

    /// Date pairs where the second must not precede the first.
    pub(crate) fn date_pairs(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ImportTarget::WorkItems => &[("start_date", "due_date")],
            ImportTarget::Suppliers => &[("contract_start", "contract_end")],
            ImportTarget::GovernanceItems => &[("last_reviewed", "next_review_date")],
            ImportTarget::Risks => &[],
        }
    }
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportTarget {
    type Err = String;

    /// Accepts `work_items`, `work-items` and any casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_variant(s);
        ImportTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown import target: {}", s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_and_snake_spellings() {
        assert_eq!("work-items".parse::<ImportTarget>(), Ok(ImportTarget::WorkItems));
        assert_eq!("Governance_Items".parse::<ImportTarget>(), Ok(ImportTarget::GovernanceItems));
        assert!("teams".parse::<ImportTarget>().is_err());
    }

    #[test]
    fn every_target_has_a_required_title_like_field() {
        for target in ImportTarget::ALL {
            let first = &target.fields()[0];
            assert!(first.required, "{target}");
            assert!(first.name == "title" || first.name == "name");
        }
    }

    #[test]
    fn field_names_are_unique_per_target() {
        for target in ImportTarget::ALL {
            let mut names: Vec<_> = target.fields().iter().map(|f| f.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), target.fields().len(), "{target}");
        }
    }

    #[test]
    fn choice_fields_normalise_spelling() {
        let status = ImportTarget::WorkItems.field("status").unwrap();
        let FieldKind::Choice(parse) = status.kind else {
            panic!("status should be a choice");
        };
        assert_eq!(parse("In Progress").as_deref(), Some("in_progress"));
        assert_eq!(parse("nope"), None);
    }
}
