//! Public write API - all operations require an actor with permission

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{invalid, GateError, Result};
use crate::guard::{authorize, Denial};
use crate::permissions::{Action, PermissionSet, Resource};
use crate::plans::Tier;
use crate::read;
use crate::roles::{DefaultRole, Role};
use crate::subscription::{LimitOverrides, Subscription, SubscriptionStatus, SubscriptionWithPlan};
use crate::tenant::Actor;
use crate::tx::{transact, Tx};

/// Check the actor's own role inside the write transaction; returns that role's set
fn require(tx: &mut Tx, actor: Actor, resource: Resource, action: Action) -> Result<PermissionSet> {
    let d = tx.dbs();
    let perms = read::permissions_in(d, tx.tx(), actor)?;
    authorize(&perms, resource, action).map_err(|denial| refused(actor, denial))?;
    Ok(perms)
}

/// An actor may only hand out what they hold themselves
fn require_within(actor: Actor, held: &PermissionSet, granted: &PermissionSet) -> Result<()> {
    match held.first_uncovered(granted) {
        None => Ok(()),
        Some((resource, action)) => Err(refused(actor, Denial::Permission { resource, action })),
    }
}

fn refused(actor: Actor, denial: Denial) -> GateError {
    warn!(tenant = actor.tenant_id, user = actor.user_id, %denial, "refused");
    GateError::from(denial)
}

fn role_of(tx: &mut Tx, tenant_id: u64, role_id: u64) -> Result<Role> {
    tx.get_role(tenant_id, role_id)?
        .ok_or_else(|| GateError::NotFound(format!("role {}", role_id)))
}

fn subscription_of(tx: &mut Tx, tenant_id: u64) -> Result<Subscription> {
    tx.get_subscription(tenant_id)?
        .ok_or_else(|| GateError::NotFound(format!("subscription for tenant {}", tenant_id)))
}

fn role_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("role name is empty"));
    }
    Ok(name.to_string())
}

pub(crate) fn insert_role(tx: &mut Tx, tenant_id: u64, name: String, permissions: PermissionSet) -> Result<Role> {
    let role = Role { id: tx.next_id()?, tenant_id, name, permissions };
    tx.put_role(&role)?;
    Ok(role)
}

// Roles

/// Create a role in the actor's tenant (requires roles:create, and no
/// grant beyond the actor's own)
pub fn create_role(actor: Actor, name: &str, permissions: PermissionSet) -> Result<Role> {
    let name = role_name(name)?;
    let role = transact(|tx| {
        let held = require(tx, actor, Resource::Roles, Action::Create)?;
        require_within(actor, &held, &permissions)?;
        insert_role(tx, actor.tenant_id, name, permissions)
    })?;
    info!(tenant = role.tenant_id, role = role.id, name = %role.name, "role created");
    Ok(role)
}

/// Rename a role and/or replace its permission set in one transaction
/// (requires roles:edit; new permissions must lie within the actor's own)
pub fn update_role(actor: Actor, role_id: u64, name: Option<&str>, permissions: Option<PermissionSet>) -> Result<Role> {
    if name.is_none() && permissions.is_none() {
        return Err(invalid("nothing to update"));
    }
    let name = name.map(role_name).transpose()?;
    let role = transact(|tx| {
        let held = require(tx, actor, Resource::Roles, Action::Edit)?;
        let mut role = role_of(tx, actor.tenant_id, role_id)?;
        if let Some(permissions) = permissions {
            require_within(actor, &held, &permissions)?;
            role.permissions = permissions;
        }
        if let Some(name) = name {
            role.name = name;
        }
        tx.put_role(&role)?;
        Ok(role)
    })?;
    info!(tenant = role.tenant_id, role = role.id, name = %role.name, "role updated");
    Ok(role)
}

/// Replace a role's permission set
pub fn update_role_permissions(actor: Actor, role_id: u64, permissions: PermissionSet) -> Result<Role> {
    update_role(actor, role_id, None, Some(permissions))
}

pub fn rename_role(actor: Actor, role_id: u64, name: &str) -> Result<Role> {
    update_role(actor, role_id, Some(name), None)
}

/// Delete a role; its holders fall back to no permissions (requires roles:delete).
/// The actor's own role cannot be deleted.
pub fn delete_role(actor: Actor, role_id: u64) -> Result<bool> {
    let deleted = transact(|tx| {
        require(tx, actor, Resource::Roles, Action::Delete)?;
        if tx.get_member_role(actor.tenant_id, actor.user_id)? == Some(role_id) {
            return Err(invalid("cannot delete the role you hold"));
        }
        tx.delete_role(actor.tenant_id, role_id)
    })?;
    if deleted {
        info!(tenant = actor.tenant_id, role = role_id, "role deleted");
    }
    Ok(deleted)
}

/// Add any default template the tenant lacks, matched by name (requires roles:create)
pub fn seed_default_roles(actor: Actor) -> Result<Vec<Role>> {
    transact(|tx| {
        let held = require(tx, actor, Resource::Roles, Action::Create)?;
        let existing: Vec<String> = tx.list_roles(actor.tenant_id)?.into_iter().map(|r| r.name).collect();
        let mut created = Vec::new();
        for template in DefaultRole::ALL {
            if existing.iter().any(|n| n == template.name()) {
                continue;
            }
            let permissions = template.permissions();
            require_within(actor, &held, &permissions)?;
            created.push(insert_role(tx, actor.tenant_id, template.name().into(), permissions)?);
        }
        Ok(created)
    })
}

// Members

/// Give a user of the actor's tenant a role (requires users:edit, and the
/// role may not grant more than the actor holds)
pub fn assign_role(actor: Actor, user_id: u64, role_id: u64) -> Result<()> {
    transact(|tx| {
        let held = require(tx, actor, Resource::Users, Action::Edit)?;
        let role = role_of(tx, actor.tenant_id, role_id)?;
        require_within(actor, &held, &role.permissions)?;
        tx.set_member_role(actor.tenant_id, user_id, role_id)
    })?;
    info!(tenant = actor.tenant_id, user = user_id, role = role_id, "role assigned");
    Ok(())
}

/// Remove another user's role, leaving them with no permissions (requires users:edit)
pub fn unassign_role(actor: Actor, user_id: u64) -> Result<bool> {
    if user_id == actor.user_id {
        return Err(invalid("cannot remove your own role"));
    }
    transact(|tx| {
        require(tx, actor, Resource::Users, Action::Edit)?;
        tx.clear_member_role(actor.tenant_id, user_id)
    })
}

// Subscription

/// Set or clear per-tenant ceilings (requires billing:manage)
pub fn set_limit_overrides(actor: Actor, overrides: LimitOverrides) -> Result<Subscription> {
    let sub = transact(|tx| {
        require(tx, actor, Resource::Billing, Action::Manage)?;
        let mut sub = subscription_of(tx, actor.tenant_id)?;
        sub.overrides = overrides;
        tx.put_subscription(&sub)?;
        Ok(sub)
    })?;
    info!(tenant = actor.tenant_id, ?overrides, "limit overrides set");
    Ok(sub)
}

/// Set the lifecycle status by hand (requires billing:manage)
pub fn set_subscription_status(actor: Actor, status: SubscriptionStatus) -> Result<Subscription> {
    transact(|tx| {
        require(tx, actor, Resource::Billing, Action::Manage)?;
        let mut sub = subscription_of(tx, actor.tenant_id)?;
        info!(tenant = actor.tenant_id, from = %sub.status, to = %status, "status changed");
        sub.status = status;
        tx.put_subscription(&sub)?;
        Ok(sub)
    })
}

/// Move the tenant to another seeded plan (requires billing:manage)
pub fn change_plan(actor: Actor, tier: Tier) -> Result<SubscriptionWithPlan> {
    transact(|tx| {
        require(tx, actor, Resource::Billing, Action::Manage)?;
        let plan = tx
            .get_plan(tier)?
            .ok_or_else(|| GateError::NotFound(format!("plan '{}'", tier)))?;
        let mut subscription = subscription_of(tx, actor.tenant_id)?;
        info!(tenant = actor.tenant_id, from = %subscription.tier, to = %tier, "plan changed");
        subscription.tier = tier;
        tx.put_subscription(&subscription)?;
        Ok(SubscriptionWithPlan { subscription, plan })
    })
}

/// Record a status / renewal pushed by the billing provider. Trusted caller, no actor.
pub fn apply_billing_event(
    tenant_id: u64,
    status: SubscriptionStatus,
    period_end: Option<DateTime<Utc>>,
) -> Result<Subscription> {
    transact(|tx| {
        let mut sub = subscription_of(tx, tenant_id)?;
        if let Some(end) = period_end {
            if end > sub.current_period_end {
                sub.current_period_start = sub.current_period_end;
            }
            sub.current_period_end = end;
        }
        info!(tenant = tenant_id, status = %status, end = %sub.current_period_end, "billing event");
        sub.status = status;
        tx.put_subscription(&sub)?;
        Ok(sub)
    })
}
