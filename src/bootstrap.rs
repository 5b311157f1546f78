//! Plan seeding and tenant provisioning

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::constants::MAX_SLUG_SUFFIX;
use crate::error::{invalid, GateError, Result};
use crate::plans::{catalog, Tier};
use crate::roles::{DefaultRole, Role};
use crate::subscription::Subscription;
use crate::tenant::{slugify, Tenant};
use crate::tx::{transact, Tx};
use crate::write::insert_role;

/// What a new tenant starts with
#[derive(Debug, Clone, Serialize)]
pub struct Provisioned {
    pub tenant: Tenant,
    pub subscription: Subscription,
    pub owner_role: Role,
}

/// Upsert the catalog plans (idempotent)
pub fn seed_plans() -> Result<usize> {
    let plans = catalog();
    transact(|tx| {
        for plan in &plans {
            tx.put_plan(plan)?;
        }
        Ok(())
    })?;
    info!(count = plans.len(), "plans seeded");
    Ok(plans.len())
}

fn unique_slug(tx: &mut Tx, name: &str) -> Result<String> {
    let base = match slugify(name) {
        s if s.is_empty() => "tenant".to_string(),
        s => s,
    };
    if !tx.slug_taken(&base)? {
        return Ok(base);
    }
    for n in 1..=MAX_SLUG_SUFFIX {
        let candidate = format!("{}-{}", base, n);
        if !tx.slug_taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(invalid(format!("no free slug for '{}'", base)))
}

/// Create a tenant on a starter trial with an Account Owner role held by `owner_user_id`
pub fn provision_tenant(name: &str, owner_user_id: u64) -> Result<Provisioned> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("tenant name is empty"));
    }
    let p = transact(|tx| {
        if tx.get_plan(Tier::Starter)?.is_none() {
            return Err(GateError::NotFound("plan 'starter'".into()));
        }
        let slug = unique_slug(tx, name)?;
        let tenant = Tenant { id: tx.next_id()?, name: name.to_string(), slug };
        tx.put_tenant(&tenant)?;

        let subscription = Subscription::trial(tenant.id, Tier::Starter, Utc::now());
        tx.put_subscription(&subscription)?;

        let owner_role = insert_role(
            tx,
            tenant.id,
            DefaultRole::AccountOwner.name().into(),
            DefaultRole::AccountOwner.permissions(),
        )?;
        tx.set_member_role(tenant.id, owner_user_id, owner_role.id)?;
        Ok(Provisioned { tenant, subscription, owner_role })
    })?;
    info!(tenant = p.tenant.id, slug = %p.tenant.slug, owner = owner_user_id, "tenant provisioned");
    Ok(p)
}
