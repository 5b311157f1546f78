//! Transaction wrapper for batched writes

use heed::RwTxn;
use serde::Serialize;

use crate::db::{dbs, env, key, key_tail, Dbs};
use crate::error::Result;
use crate::plans::{SubscriptionPlan, Tier};
use crate::read;
use crate::roles::Role;
use crate::subscription::Subscription;
use crate::tenant::Tenant;

/// Transaction wrapper for batched writes
pub struct Tx {
    txn: Option<RwTxn<'static>>,
    dbs: &'static Dbs,
}

fn encode<T: Serialize>(v: &T) -> Result<String> {
    Ok(serde_json::to_string(v)?)
}

impl Tx {
    #[inline]
    pub(crate) fn new() -> Result<Self> {
        Ok(Tx {
            txn: Some(env()?.write_txn()?),
            dbs: dbs()?,
        })
    }

    #[inline]
    pub(crate) fn tx(&mut self) -> &mut RwTxn<'static> {
        // Only `commit` takes the txn, and it consumes self.
        self.txn.as_mut().unwrap()
    }

    #[inline]
    pub(crate) fn dbs(&self) -> &'static Dbs {
        self.dbs
    }

    #[inline]
    pub(crate) fn commit(mut self) -> Result<()> {
        if let Some(txn) = self.txn.take() {
            txn.commit()?;
        }
        Ok(())
    }

    // Ids

    pub(crate) fn next_id(&mut self) -> Result<u64> {
        let d = self.dbs;
        let id = d
            .meta
            .get(self.tx(), "next_id")?
            .and_then(|s| s.parse().ok())
            .unwrap_or(1u64);
        d.meta.put(self.tx(), "next_id", &(id + 1).to_string())?;
        Ok(id)
    }

    // Tenants

    pub fn put_tenant(&mut self, tenant: &Tenant) -> Result<()> {
        let d = self.dbs;
        let json = encode(tenant)?;
        d.tenants.put(self.tx(), &tenant.id, &json)?;
        d.slugs.put(self.tx(), &tenant.slug, &tenant.id)?;
        Ok(())
    }

    pub fn slug_taken(&mut self, slug: &str) -> Result<bool> {
        let d = self.dbs;
        Ok(d.slugs.get(self.tx(), slug)?.is_some())
    }

    // Roles

    pub fn put_role(&mut self, role: &Role) -> Result<()> {
        let d = self.dbs;
        let json = encode(role)?;
        d.roles.put(self.tx(), &key(role.tenant_id, role.id), &json)?;
        Ok(())
    }

    pub fn get_role(&mut self, tenant_id: u64, role_id: u64) -> Result<Option<Role>> {
        let d = self.dbs;
        read::role_in(d, self.tx(), tenant_id, role_id)
    }

    pub fn list_roles(&mut self, tenant_id: u64) -> Result<Vec<Role>> {
        let d = self.dbs;
        read::roles_in(d, self.tx(), tenant_id)
    }

    /// Delete a role and every assignment pointing at it
    pub fn delete_role(&mut self, tenant_id: u64, role_id: u64) -> Result<bool> {
        let d = self.dbs;
        let existed = d.roles.delete(self.tx(), &key(tenant_id, role_id))?;
        let holders: Vec<u64> = {
            let mut v = Vec::new();
            for item in d.members.prefix_iter(self.tx(), &tenant_id.to_be_bytes())? {
                let (k, r) = item?;
                if r == role_id {
                    v.extend(key_tail(k));
                }
            }
            v
        };
        for user in holders {
            d.members.delete(self.tx(), &key(tenant_id, user))?;
        }
        Ok(existed)
    }

    // Members

    pub fn set_member_role(&mut self, tenant_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        let d = self.dbs;
        d.members.put(self.tx(), &key(tenant_id, user_id), &role_id)?;
        Ok(())
    }

    pub fn get_member_role(&mut self, tenant_id: u64, user_id: u64) -> Result<Option<u64>> {
        let d = self.dbs;
        Ok(d.members.get(self.tx(), &key(tenant_id, user_id))?)
    }

    pub fn clear_member_role(&mut self, tenant_id: u64, user_id: u64) -> Result<bool> {
        let d = self.dbs;
        Ok(d.members.delete(self.tx(), &key(tenant_id, user_id))?)
    }

    // Subscriptions & plans

    pub fn put_subscription(&mut self, sub: &Subscription) -> Result<()> {
        let d = self.dbs;
        let json = encode(sub)?;
        d.subs.put(self.tx(), &sub.tenant_id, &json)?;
        Ok(())
    }

    pub fn get_subscription(&mut self, tenant_id: u64) -> Result<Option<Subscription>> {
        let d = self.dbs;
        read::subscription_in(d, self.tx(), tenant_id)
    }

    pub fn put_plan(&mut self, plan: &SubscriptionPlan) -> Result<()> {
        let d = self.dbs;
        let json = encode(plan)?;
        d.plans.put(self.tx(), plan.tier.as_str(), &json)?;
        Ok(())
    }

    pub fn get_plan(&mut self, tier: Tier) -> Result<Option<SubscriptionPlan>> {
        let d = self.dbs;
        read::plan_in(d, self.tx(), tier)
    }
}

/// Run multiple operations in a single transaction
#[inline]
pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(f: F) -> Result<T> {
    let mut tx = Tx::new()?;
    let r = f(&mut tx)?;
    tx.commit()?;
    Ok(r)
}
