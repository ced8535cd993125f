//! Domain records and their create/update inputs.

pub mod enums;
pub mod governance;
pub mod notification;
pub mod org;
pub mod patch;
pub mod risk;
pub mod supplier;
pub mod work_item;

pub use enums::{
    Criticality, GovernanceKind, GovernanceStatus, NotificationKind, Priority, Rag, ReviewFrequency,
    RiskStatus, Role, SupplierStatus, WorkStatus,
};
pub use governance::{CreateGovernanceItem, GovernanceItem, GovernanceItemView, UpdateGovernanceItem};
pub use notification::{NewNotification, Notification};
pub use org::{
    normalize_email, CreateDepartment, CreateTeam, CreateUser, Department, Team, UpdateDepartment,
    UpdateTeam, UpdateUser, User,
};
pub use risk::{CreateRisk, Risk, RiskView, UpdateRisk};
pub use supplier::{CreateSupplier, Supplier, SupplierView, UpdateSupplier};
pub use work_item::{CreateWorkItem, UpdateWorkItem, WorkItem, WorkItemView};
