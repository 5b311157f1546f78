//! Request-side composition of the permission check and the plan gate
//!
//! Order matters: a request is first checked against the actor's permission
//! set, and only a permitted `create` on a metered resource goes on to the
//! capacity check. Both must pass before the caller mutates anything.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::features::{has_feature, FeatureKey};
use crate::limits::{get_limits, Dimension, UsageCounts};
use crate::permissions::{Action, PermissionSet, Resource};
use crate::plans::Limit;
use crate::subscription::{
    is_subscription_active, is_subscription_expired_at, Subscription, SubscriptionStatus,
    SubscriptionWithPlan,
};

/// Why a request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("not allowed to {action} {resource}")]
    Permission { resource: Resource, action: Action },
    #[error("plan does not include {0}")]
    Feature(FeatureKey),
    #[error("{resource} limit reached ({used} of {limit})")]
    Capacity { resource: Resource, used: u64, limit: Limit },
    #[error("subscription is {0}")]
    Inactive(SubscriptionStatus),
    #[error("subscription period has ended")]
    Expired,
}

/// Capacity dimension a resource's creates count against, if any
pub fn metered(resource: Resource) -> Option<Dimension> {
    match resource {
        Resource::Properties => Some(Dimension::Properties),
        Resource::Users => Some(Dimension::Users),
        Resource::Offices => Some(Dimension::Offices),
        _ => None,
    }
}

pub fn authorize(perms: &PermissionSet, resource: Resource, action: Action) -> Result<(), Denial> {
    if perms.allows(resource, action) {
        return Ok(());
    }
    debug!(%resource, %action, "permission denied");
    Err(Denial::Permission { resource, action })
}

/// Permission to create, then room for one more if the resource is metered
pub fn authorize_create(
    perms: &PermissionSet,
    sub: &SubscriptionWithPlan,
    resource: Resource,
    usage: &UsageCounts,
) -> Result<(), Denial> {
    authorize(perms, resource, Action::Create)?;
    let Some(dim) = metered(resource) else { return Ok(()) };
    let limit = get_limits(sub).get(dim);
    let used = usage.get(dim);
    if limit.has_room(used) {
        return Ok(());
    }
    debug!(%resource, used, %limit, "capacity reached");
    Err(Denial::Capacity { resource, used, limit })
}

pub fn require_feature(sub: &SubscriptionWithPlan, feature: FeatureKey) -> Result<(), Denial> {
    if has_feature(sub, feature) {
        return Ok(());
    }
    debug!(%feature, tier = %sub.plan.tier, "feature locked");
    Err(Denial::Feature(feature))
}

/// Status first, then the billing period
pub fn require_usable(sub: &Subscription, now: DateTime<Utc>) -> Result<(), Denial> {
    if !is_subscription_active(sub) {
        debug!(status = %sub.status, "subscription inactive");
        return Err(Denial::Inactive(sub.status.clone()));
    }
    if is_subscription_expired_at(sub, now) {
        debug!(end = %sub.current_period_end, "subscription expired");
        return Err(Denial::Expired);
    }
    Ok(())
}
