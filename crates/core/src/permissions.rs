//! Role and department based access control.
//!
//! A decision needs the acting user, what they want to do, the kind of
//! record and the record's [`RecordScope`]. For collection-level checks
//! (listing, creating) the scope describes the prospective record, usually
//! just the target department.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Role, Team, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    Import,
    Export,
    Manage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    WorkItem,
    Risk,
    Supplier,
    GovernanceItem,
    Team,
    User,
    Department,
    Backup,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::WorkItem => "work_item",
            Resource::Risk => "risk",
            Resource::Supplier => "supplier",
            Resource::GovernanceItem => "governance_item",
            Resource::Team => "team",
            Resource::User => "user",
            Resource::Department => "department",
            Resource::Backup => "backup",
        }
    }

    fn is_business_record(&self) -> bool {
        matches!(
            self,
            Resource::WorkItem | Resource::Risk | Resource::Supplier | Resource::GovernanceItem
        )
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Import => "import",
            Action::Export => "export",
            Action::Manage => "manage",
        }
    }
}

/// Ownership facts a permission decision depends on.
///
/// For [`Resource::User`] `owner_id` is the target user's id; for
/// [`Resource::Team`] `team_id` is the team's id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordScope {
    pub department_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

impl RecordScope {
    pub fn department(department_id: Option<Uuid>) -> Self {
        Self { department_id, ..Default::default() }
    }
}

pub trait Scoped {
    fn scope(&self) -> RecordScope;
}

impl Scoped for User {
    fn scope(&self) -> RecordScope {
        RecordScope {
            department_id: self.department_id,
            owner_id: Some(self.id),
            assignee_id: None,
            team_id: self.team_id,
        }
    }
}

impl Scoped for Team {
    fn scope(&self) -> RecordScope {
        RecordScope {
            department_id: Some(self.department_id),
            owner_id: self.lead_id,
            assignee_id: None,
            team_id: Some(self.id),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("not allowed to {action} {resource}: {reason}")]
pub struct Denied {
    pub action: &'static str,
    pub resource: &'static str,
    pub reason: &'static str,
}

impl Denied {
    /// Whether the denial should look like the record does not exist.
    pub fn hides_record(&self) -> bool {
        self.reason == OTHER_DEPARTMENT
    }
}

const INACTIVE: &str = "account is inactive";
const ADMIN_ONLY: &str = "administrators only";
const OTHER_DEPARTMENT: &str = "record belongs to another department";
const ROLE: &str = "role does not permit this";
const NOT_RESPONSIBLE: &str = "not the owner, assignee or team of this record";

pub fn authorize(user: &User, action: Action, resource: Resource, scope: &RecordScope) -> Result<(), Denied> {
    let deny = |reason: &'static str| Denied {
        action: action.as_str(),
        resource: resource.as_str(),
        reason,
    };

    if !user.is_active {
        return Err(deny(INACTIVE));
    }
    if user.role == Role::Admin {
        return Ok(());
    }
    if action == Action::Manage {
        return Err(deny(ADMIN_ONLY));
    }

    let same_department = user.department_id.is_some() && scope.department_id == user.department_id;

    match resource {
        Resource::Backup => Err(deny(ADMIN_ONLY)),
        Resource::Department => {
            if action == Action::View && same_department {
                Ok(())
            } else {
                Err(deny(ADMIN_ONLY))
            }
        }
        Resource::User => {
            if action != Action::View {
                return Err(deny(ADMIN_ONLY));
            }
            if scope.owner_id == Some(user.id) {
                return Ok(());
            }
            if !same_department {
                return Err(deny(OTHER_DEPARTMENT));
            }
            if user.role == Role::Manager {
                Ok(())
            } else {
                Err(deny(ROLE))
            }
        }
        Resource::Team => {
            if !same_department {
                return Err(deny(OTHER_DEPARTMENT));
            }
            match action {
                Action::View => Ok(()),
                Action::Create | Action::Update | Action::Delete if user.role == Role::Manager => Ok(()),
                _ => Err(deny(ROLE)),
            }
        }
        r if r.is_business_record() => authorize_record(user, action, scope, same_department).map_err(deny),
        _ => Err(deny(ADMIN_ONLY)),
    }
}

fn authorize_record(
    user: &User,
    action: Action,
    scope: &RecordScope,
    same_department: bool,
) -> Result<(), &'static str> {
    let read_only = matches!(action, Action::View | Action::Export);

    if scope.department_id.is_none() {
        // Organisation-wide record.
        return if read_only { Ok(()) } else { Err(ADMIN_ONLY) };
    }
    if !same_department {
        return Err(OTHER_DEPARTMENT);
    }

    match user.role {
        Role::Admin | Role::Manager => Ok(()),
        Role::Viewer if read_only => Ok(()),
        Role::Viewer => Err(ROLE),
        Role::Member => match action {
            Action::View | Action::Export | Action::Create => Ok(()),
            Action::Update => {
                let responsible = scope.owner_id == Some(user.id)
                    || scope.assignee_id == Some(user.id)
                    || (scope.team_id.is_some() && scope.team_id == user.team_id);
                if responsible {
                    Ok(())
                } else {
                    Err(NOT_RESPONSIBLE)
                }
            }
            _ => Err(ROLE),
        },
    }
}

pub fn can(user: &User, action: Action, resource: Resource, scope: &RecordScope) -> bool {
    authorize(user, action, resource, scope).is_ok()
}

/// Department filter for list queries: `None` means no filter (admins).
///
/// Non-admins see their own department plus organisation-wide records. A
/// non-admin without a department gets the nil UUID, which matches no
/// department, so only organisation-wide records remain visible.
pub fn department_filter(user: &User) -> Option<Uuid> {
    if user.role == Role::Admin {
        None
    } else {
        Some(user.department_id.unwrap_or(Uuid::nil()))
    }
}

/// Whether a record filed under `department_id` passes a `department_filter`.
pub fn passes_filter(department_id: Option<Uuid>, filter: Option<Uuid>) -> bool {
    match (filter, department_id) {
        (None, _) | (_, None) => true,
        (Some(wanted), Some(department)) => wanted == department,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role, department_id: Option<Uuid>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            role,
            department_id,
            team_id: None,
            is_active: true,
            email_notifications: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn inactive_users_get_nothing() {
        let mut admin = user(Role::Admin, None);
        admin.is_active = false;
        let err = authorize(&admin, Action::View, Resource::WorkItem, &RecordScope::default()).unwrap_err();
        assert_eq!(err.reason, INACTIVE);
    }

    #[test]
    fn admins_get_everything() {
        let admin = user(Role::Admin, None);
        assert!(can(&admin, Action::Manage, Resource::Backup, &RecordScope::default()));
        assert!(can(&admin, Action::Delete, Resource::Risk, &RecordScope::department(Some(Uuid::new_v4()))));
    }

    #[test]
    fn other_departments_are_hidden() {
        let manager = user(Role::Manager, Some(Uuid::new_v4()));
        let scope = RecordScope::department(Some(Uuid::new_v4()));
        let err = authorize(&manager, Action::View, Resource::Supplier, &scope).unwrap_err();
        assert!(err.hides_record());
    }

    #[test]
    fn organisation_wide_records_are_read_only_for_non_admins() {
        let manager = user(Role::Manager, Some(Uuid::new_v4()));
        let scope = RecordScope::default();
        assert!(can(&manager, Action::View, Resource::GovernanceItem, &scope));
        assert!(can(&manager, Action::Export, Resource::GovernanceItem, &scope));
        assert!(!can(&manager, Action::Update, Resource::GovernanceItem, &scope));
    }

    #[test]
    fn filter_keeps_own_and_organisation_wide_records() {
        let dept = Uuid::new_v4();
        assert!(passes_filter(Some(dept), Some(dept)));
        assert!(passes_filter(None, Some(dept)));
        assert!(!passes_filter(Some(Uuid::new_v4()), Some(dept)));
        assert!(passes_filter(Some(Uuid::new_v4()), None));
    }

    #[test]
    fn viewer_is_read_only() {
        let dept = Uuid::new_v4();
        let viewer = user(Role::Viewer, Some(dept));
        let scope = RecordScope::department(Some(dept));
        assert!(can(&viewer, Action::View, Resource::Risk, &scope));
        assert!(can(&viewer, Action::Export, Resource::Risk, &scope));
        assert!(!can(&viewer, Action::Create, Resource::Risk, &scope));
        assert!(!can(&viewer, Action::Update, Resource::Risk, &scope));
    }

    #[test]
    fn member_updates_only_what_they_are_responsible_for() {
        let dept = Uuid::new_v4();
        let team = Uuid::new_v4();
        let mut member = user(Role::Member, Some(dept));
        member.team_id = Some(team);

        let foreign = RecordScope {
            department_id: Some(dept),
            owner_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(can(&member, Action::Create, Resource::WorkItem, &foreign));
        assert!(!can(&member, Action::Update, Resource::WorkItem, &foreign));
        assert!(!can(&member, Action::Delete, Resource::WorkItem, &foreign));
        assert!(!can(&member, Action::Import, Resource::WorkItem, &foreign));

        let assigned = RecordScope { assignee_id: Some(member.id), ..foreign };
        assert!(can(&member, Action::Update, Resource::WorkItem, &assigned));

        let team_record = RecordScope { team_id: Some(team), ..foreign };
        assert!(can(&member, Action::Update, Resource::WorkItem, &team_record));
    }

    #[test]
    fn manager_runs_their_department() {
        let dept = Uuid::new_v4();
        let manager = user(Role::Manager, Some(dept));
        let scope = RecordScope::department(Some(dept));
        assert!(can(&manager, Action::Delete, Resource::WorkItem, &scope));
        assert!(can(&manager, Action::Import, Resource::Supplier, &scope));
        assert!(can(&manager, Action::Create, Resource::Team, &scope));
        assert!(can(&manager, Action::View, Resource::User, &scope));
        assert!(!can(&manager, Action::Create, Resource::User, &scope));
        assert!(!can(&manager, Action::Manage, Resource::WorkItem, &scope));
        assert!(!can(&manager, Action::View, Resource::Backup, &scope));
    }

    #[test]
    fn users_and_departments() {
        let dept = Uuid::new_v4();
        let member = user(Role::Member, Some(dept));
        assert!(can(&member, Action::View, Resource::User, &member.scope()));
        let colleague = user(Role::Member, Some(dept));
        assert!(!can(&member, Action::View, Resource::User, &colleague.scope()));
        assert!(can(&member, Action::View, Resource::Department, &RecordScope::department(Some(dept))));
        assert!(!can(&member, Action::Update, Resource::Department, &RecordScope::department(Some(dept))));
        assert!(can(&member, Action::View, Resource::Team, &RecordScope::department(Some(dept))));
        assert!(!can(&member, Action::Create, Resource::Team, &RecordScope::department(Some(dept))));
    }

    #[test]
    fn department_filter_by_role() {
        let dept = Uuid::new_v4();
        assert_eq!(department_filter(&user(Role::Admin, Some(dept))), None);
        assert_eq!(department_filter(&user(Role::Viewer, Some(dept))), Some(dept));
        assert_eq!(department_filter(&user(Role::Member, None)), Some(Uuid::nil()));
    }
}
