//! Permission evaluation over per-resource action masks
//!
//! A [`PermissionSet`] maps each [`Resource`] to a non-empty bitmask of
//! [`Action`]s. A missing resource means no access. `manage` on a resource
//! satisfies every action on that resource and nothing else.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::constants::{CREATE, DELETE, EDIT, MANAGE, VIEW};
use crate::error::{invalid, GateError};

/// Everything a role can be granted actions on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Properties,
    Leases,
    Tenants,
    Maintenance,
    Payments,
    Users,
    Roles,
    Settings,
    Billing,
    Offices,
    Reports,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Properties,
        Resource::Leases,
        Resource::Tenants,
        Resource::Maintenance,
        Resource::Payments,
        Resource::Users,
        Resource::Roles,
        Resource::Settings,
        Resource::Billing,
        Resource::Offices,
        Resource::Reports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Properties => "properties",
            Resource::Leases => "leases",
            Resource::Tenants => "tenants",
            Resource::Maintenance => "maintenance",
            Resource::Payments => "payments",
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::Settings => "settings",
            Resource::Billing => "billing",
            Resource::Offices => "offices",
            Resource::Reports => "reports",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| invalid(format!("unknown resource '{}'", s)))
    }
}

/// Something an actor can do to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Manage,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Manage,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Action::View => VIEW,
            Action::Create => CREATE,
            Action::Edit => EDIT,
            Action::Delete => DELETE,
            Action::Manage => MANAGE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }

    /// Expand a mask into its actions, in declaration order
    pub fn from_mask(mask: u8) -> Vec<Action> {
        Action::ALL.into_iter().filter(|a| mask & a.bit() != 0).collect()
    }

    pub fn mask_of(actions: &[Action]) -> u8 {
        actions.iter().fold(0, |m, a| m | a.bit())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| invalid(format!("unknown action '{}'", s)))
    }
}

/// Per-resource action masks held by a role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeMap<Resource, u8>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(resource, actions)` pairs
    pub fn from_entries(entries: &[(Resource, &[Action])]) -> Self {
        let mut set = Self::new();
        for (resource, actions) in entries {
            set.grant(*resource, actions);
        }
        set
    }

    /// Add actions to a resource (OR with the existing mask)
    pub fn grant(&mut self, resource: Resource, actions: &[Action]) {
        let mask = self.mask(resource) | Action::mask_of(actions);
        self.put(resource, mask);
    }

    /// Replace a resource's actions exactly; an empty list removes the resource
    pub fn set(&mut self, resource: Resource, actions: &[Action]) {
        self.put(resource, Action::mask_of(actions));
    }

    /// Remove all access to a resource
    pub fn revoke(&mut self, resource: Resource) -> bool {
        self.0.remove(&resource).is_some()
    }

    fn put(&mut self, resource: Resource, mask: u8) {
        if mask == 0 {
            self.0.remove(&resource);
        } else {
            self.0.insert(resource, mask);
        }
    }

    /// Raw action mask for a resource, 0 when absent
    #[inline]
    pub fn mask(&self, resource: Resource) -> u8 {
        self.0.get(&resource).copied().unwrap_or(0)
    }

    /// Actions literally listed for a resource (no `manage` expansion)
    pub fn actions(&self, resource: Resource) -> Vec<Action> {
        Action::from_mask(self.mask(resource))
    }

    pub fn resources(&self) -> impl Iterator<Item = Resource> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        match self.0.get(&resource) {
            None => false,
            Some(mask) if mask & MANAGE != 0 => true,
            Some(mask) => mask & action.bit() != 0,
        }
    }

    /// First `(resource, action)` granted by `other` that this set does not allow
    pub fn first_uncovered(&self, other: &PermissionSet) -> Option<(Resource, Action)> {
        other.0.iter().find_map(|(&resource, &mask)| {
            Action::from_mask(mask)
                .into_iter()
                .find(|&action| !self.allows(resource, action))
                .map(|action| (resource, action))
        })
    }

    /// Whether everything `other` grants is allowed here
    pub fn covers(&self, other: &PermissionSet) -> bool {
        self.first_uncovered(other).is_none()
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (resource, mask) in &self.0 {
            map.serialize_entry(resource, &Action::from_mask(*mask))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<Resource, Vec<Action>>::deserialize(d)?;
        let mut set = PermissionSet::new();
        for (resource, actions) in raw {
            set.grant(resource, &actions);
        }
        Ok(set)
    }
}

/// Whether `set` permits `action` on `resource`
#[inline]
pub fn allows(set: &PermissionSet, resource: Resource, action: Action) -> bool {
    set.allows(resource, action)
}

#[inline]
pub fn can_view(set: &PermissionSet, resource: Resource) -> bool {
    allows(set, resource, Action::View)
}

#[inline]
pub fn can_create(set: &PermissionSet, resource: Resource) -> bool {
    allows(set, resource, Action::Create)
}

#[inline]
pub fn can_edit(set: &PermissionSet, resource: Resource) -> bool {
    allows(set, resource, Action::Edit)
}

#[inline]
pub fn can_delete(set: &PermissionSet, resource: Resource) -> bool {
    allows(set, resource, Action::Delete)
}

#[inline]
pub fn can_manage(set: &PermissionSet, resource: Resource) -> bool {
    allows(set, resource, Action::Manage)
}
