//! Tenant subscriptions: lifecycle status, billing period and limit overrides

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MS_PER_DAY, TRIAL_DAYS};
use crate::plans::{Limit, SubscriptionPlan, Tier};

/// Lifecycle status reported by the billing collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Suspended,
    Cancelled,
    Expired,
    /// A status string outside the known set; never active
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Other(s) => s,
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "trialing" => SubscriptionStatus::Trialing,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "suspended" => SubscriptionStatus::Suspended,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Other(s),
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        SubscriptionStatus::from(s.to_string())
    }
}

impl From<SubscriptionStatus> for String {
    fn from(s: SubscriptionStatus) -> String {
        match s {
            SubscriptionStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tenant ceilings that replace the plan's when set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOverrides {
    #[serde(default)]
    pub max_properties: Option<Limit>,
    #[serde(default)]
    pub max_users: Option<Limit>,
    #[serde(default)]
    pub max_offices: Option<Limit>,
}

/// A tenant's one subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub tenant_id: u64,
    #[serde(default)]
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overrides: LimitOverrides,
}

impl Subscription {
    /// A fresh trial starting at `now`
    pub fn trial(tenant_id: u64, tier: Tier, now: DateTime<Utc>) -> Self {
        let end = now + Duration::days(TRIAL_DAYS);
        Subscription {
            tenant_id,
            tier,
            status: SubscriptionStatus::Trialing,
            current_period_start: now,
            current_period_end: end,
            trial_ends_at: Some(end),
            overrides: LimitOverrides::default(),
        }
    }
}

/// A subscription joined with the plan its tier points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionWithPlan {
    pub subscription: Subscription,
    pub plan: SubscriptionPlan,
}

/// `active` or `trialing`. Says nothing about the billing period.
pub fn is_subscription_active(sub: &Subscription) -> bool {
    matches!(sub.status, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
}

/// Whether the current period has ended, regardless of status
pub fn is_subscription_expired(sub: &Subscription) -> bool {
    is_subscription_expired_at(sub, Utc::now())
}

pub fn is_subscription_expired_at(sub: &Subscription, now: DateTime<Utc>) -> bool {
    now > sub.current_period_end
}

/// Whole days left in the period, rounded up; negative once expired
pub fn get_days_until_expiry(sub: &Subscription) -> i64 {
    get_days_until_expiry_at(sub, Utc::now())
}

pub fn get_days_until_expiry_at(sub: &Subscription, now: DateTime<Utc>) -> i64 {
    let ms = (sub.current_period_end - now).num_milliseconds();
    (ms as f64 / MS_PER_DAY as f64).ceil() as i64
}

/// Active and not past its period end.
///
/// Status and period are written by different collaborators, so a
/// subscription can read `active` after its period has ended until renewal
/// runs. Callers gating access should use this rather than either check alone.
pub fn is_subscription_usable(sub: &Subscription) -> bool {
    is_subscription_usable_at(sub, Utc::now())
}

pub fn is_subscription_usable_at(sub: &Subscription, now: DateTime<Utc>) -> bool {
    is_subscription_active(sub) && !is_subscription_expired_at(sub, now)
}
