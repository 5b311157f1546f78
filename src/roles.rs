//! Tenant roles and the default templates seeded for new tenants

use serde::{Deserialize, Serialize};

use crate::permissions::{Action, PermissionSet, Resource};

/// A named permission set owned by one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub tenant_id: u64,
    pub name: String,
    pub permissions: PermissionSet,
}

const VIEW_ONLY: &[Action] = &[Action::View];
const VIEW_CREATE: &[Action] = &[Action::View, Action::Create];
const WRITE: &[Action] = &[Action::View, Action::Create, Action::Edit];
const WRITE_DELETE: &[Action] = &[Action::View, Action::Create, Action::Edit, Action::Delete];
const FULL: &[Action] = &[Action::View, Action::Create, Action::Edit, Action::Delete, Action::Manage];

const PROPERTY_MANAGER: &[(Resource, &[Action])] = &[
    (Resource::Properties, WRITE),
    (Resource::Leases, WRITE),
    (Resource::Tenants, WRITE),
    (Resource::Maintenance, WRITE_DELETE),
    (Resource::Payments, VIEW_CREATE),
    (Resource::Users, VIEW_ONLY),
    (Resource::Offices, VIEW_ONLY),
    (Resource::Reports, VIEW_ONLY),
];

const MAINTENANCE_COORDINATOR: &[(Resource, &[Action])] = &[
    (Resource::Properties, VIEW_ONLY),
    (Resource::Maintenance, FULL),
    (Resource::Reports, VIEW_ONLY),
];

const LEASING_AGENT: &[(Resource, &[Action])] = &[
    (Resource::Properties, VIEW_ONLY),
    (Resource::Leases, WRITE),
    (Resource::Tenants, WRITE),
    (Resource::Reports, VIEW_ONLY),
];

const VIEWER: &[(Resource, &[Action])] = &[
    (Resource::Properties, VIEW_ONLY),
    (Resource::Leases, VIEW_ONLY),
    (Resource::Tenants, VIEW_ONLY),
    (Resource::Maintenance, VIEW_ONLY),
    (Resource::Payments, VIEW_ONLY),
    (Resource::Reports, VIEW_ONLY),
];

/// Role templates every tenant can be seeded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultRole {
    AccountOwner,
    PropertyManager,
    MaintenanceCoordinator,
    LeasingAgent,
    Viewer,
}

impl DefaultRole {
    pub const ALL: [DefaultRole; 5] = [
        DefaultRole::AccountOwner,
        DefaultRole::PropertyManager,
        DefaultRole::MaintenanceCoordinator,
        DefaultRole::LeasingAgent,
        DefaultRole::Viewer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DefaultRole::AccountOwner => "Account Owner",
            DefaultRole::PropertyManager => "Property Manager",
            DefaultRole::MaintenanceCoordinator => "Maintenance Coordinator",
            DefaultRole::LeasingAgent => "Leasing Agent",
            DefaultRole::Viewer => "Viewer",
        }
    }

    pub fn from_name(name: &str) -> Option<DefaultRole> {
        DefaultRole::ALL.into_iter().find(|r| r.name() == name)
    }

    /// The template's permission set
    pub fn permissions(self) -> PermissionSet {
        match self {
            DefaultRole::AccountOwner => {
                let mut set = PermissionSet::new();
                for resource in Resource::ALL {
                    set.grant(resource, FULL);
                }
                set
            }
            DefaultRole::PropertyManager => PermissionSet::from_entries(PROPERTY_MANAGER),
            DefaultRole::MaintenanceCoordinator => PermissionSet::from_entries(MAINTENANCE_COORDINATOR),
            DefaultRole::LeasingAgent => PermissionSet::from_entries(LEASING_AGENT),
            DefaultRole::Viewer => PermissionSet::from_entries(VIEWER),
        }
    }
}
