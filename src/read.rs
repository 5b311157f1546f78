//! Read operations (no permission checks, direct LMDB access)

use heed::RoTxn;

use crate::db::{decode, key, read, Dbs};
use crate::error::{GateError, Result};
use crate::permissions::PermissionSet;
use crate::plans::{SubscriptionPlan, Tier};
use crate::roles::Role;
use crate::subscription::{Subscription, SubscriptionWithPlan};
use crate::tenant::{Actor, Tenant};

pub(crate) fn tenant_in(d: &Dbs, tx: &RoTxn, id: u64) -> Result<Option<Tenant>> {
    d.tenants.get(tx, &id)?.map(decode).transpose()
}

pub(crate) fn role_in(d: &Dbs, tx: &RoTxn, tenant_id: u64, role_id: u64) -> Result<Option<Role>> {
    d.roles.get(tx, &key(tenant_id, role_id))?.map(decode).transpose()
}

pub(crate) fn roles_in(d: &Dbs, tx: &RoTxn, tenant_id: u64) -> Result<Vec<Role>> {
    let mut r = Vec::new();
    for item in d.roles.prefix_iter(tx, &tenant_id.to_be_bytes())? {
        let (_, json) = item?;
        r.push(decode(json)?);
    }
    Ok(r)
}

pub(crate) fn subscription_in(d: &Dbs, tx: &RoTxn, tenant_id: u64) -> Result<Option<Subscription>> {
    d.subs.get(tx, &tenant_id)?.map(decode).transpose()
}

pub(crate) fn plan_in(d: &Dbs, tx: &RoTxn, tier: Tier) -> Result<Option<SubscriptionPlan>> {
    d.plans.get(tx, tier.as_str())?.map(decode).transpose()
}

/// Permission set of the actor's role; empty when unassigned or the role is gone
pub(crate) fn permissions_in(d: &Dbs, tx: &RoTxn, actor: Actor) -> Result<PermissionSet> {
    let Some(role_id) = d.members.get(tx, &key(actor.tenant_id, actor.user_id))? else {
        return Ok(PermissionSet::new());
    };
    Ok(role_in(d, tx, actor.tenant_id, role_id)?
        .map(|r| r.permissions)
        .unwrap_or_default())
}

pub(crate) fn with_plan_in(d: &Dbs, tx: &RoTxn, tenant_id: u64) -> Result<Option<SubscriptionWithPlan>> {
    let Some(subscription) = subscription_in(d, tx, tenant_id)? else {
        return Ok(None);
    };
    let plan = plan_in(d, tx, subscription.tier)?
        .ok_or_else(|| GateError::NotFound(format!("plan '{}'", subscription.tier)))?;
    Ok(Some(SubscriptionWithPlan { subscription, plan }))
}

pub fn get_tenant(id: u64) -> Result<Option<Tenant>> {
    read(|d, tx| tenant_in(d, tx, id))
}

pub fn get_tenant_by_slug(slug: &str) -> Result<Option<Tenant>> {
    read(|d, tx| match d.slugs.get(tx, slug)? {
        Some(id) => tenant_in(d, tx, id),
        None => Ok(None),
    })
}

pub fn get_role(tenant_id: u64, role_id: u64) -> Result<Option<Role>> {
    read(|d, tx| role_in(d, tx, tenant_id, role_id))
}

/// Roles of a tenant, oldest first
pub fn list_roles(tenant_id: u64) -> Result<Vec<Role>> {
    read(|d, tx| roles_in(d, tx, tenant_id))
}

/// Role id assigned to a user, if any
pub fn get_member_role(tenant_id: u64, user_id: u64) -> Result<Option<u64>> {
    read(|d, tx| Ok(d.members.get(tx, &key(tenant_id, user_id))?))
}

/// Resolve what an actor may do
pub fn actor_permissions(actor: Actor) -> Result<PermissionSet> {
    read(|d, tx| permissions_in(d, tx, actor))
}

pub fn get_subscription(tenant_id: u64) -> Result<Option<Subscription>> {
    read(|d, tx| subscription_in(d, tx, tenant_id))
}

/// The tenant's subscription joined with its plan. Errors if the plan is missing.
pub fn get_subscription_with_plan(tenant_id: u64) -> Result<Option<SubscriptionWithPlan>> {
    read(|d, tx| with_plan_in(d, tx, tenant_id))
}

pub fn get_plan(tier: Tier) -> Result<Option<SubscriptionPlan>> {
    read(|d, tx| plan_in(d, tx, tier))
}

/// Seeded plans by display order
pub fn list_plans() -> Result<Vec<SubscriptionPlan>> {
    read(|d, tx| {
        let mut r: Vec<SubscriptionPlan> = Vec::new();
        for item in d.plans.iter(tx)? {
            let (_, json) = item?;
            r.push(decode(json)?);
        }
        r.sort_by_key(|p| p.display_order);
        Ok(r)
    })
}
