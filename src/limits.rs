//! Capacity resolution and usage reporting for metered resources

use serde::{Deserialize, Serialize};

use crate::plans::Limit;
use crate::subscription::SubscriptionWithPlan;

/// A metered dimension of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Properties,
    Users,
    Offices,
}

/// Effective ceilings after overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_properties: Limit,
    pub max_users: Limit,
    pub max_offices: Limit,
}

impl Limits {
    pub fn get(&self, dim: Dimension) -> Limit {
        match dim {
            Dimension::Properties => self.max_properties,
            Dimension::Users => self.max_users,
            Dimension::Offices => self.max_offices,
        }
    }
}

/// Current counts, supplied by the data layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounts {
    pub properties: u64,
    pub users: u64,
    pub offices: u64,
}

impl UsageCounts {
    pub fn get(&self, dim: Dimension) -> u64 {
        match dim {
            Dimension::Properties => self.properties,
            Dimension::Users => self.users,
            Dimension::Offices => self.offices,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionStatus {
    pub used: u64,
    pub limit: Limit,
    /// May exceed 100 when usage overshoots a lowered ceiling
    pub percentage: f64,
    pub can_add: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub properties: DimensionStatus,
    pub users: DimensionStatus,
    pub offices: DimensionStatus,
}

/// Override if set, else the plan ceiling, per dimension
pub fn get_limits(sub: &SubscriptionWithPlan) -> Limits {
    let o = &sub.subscription.overrides;
    let p = &sub.plan;
    Limits {
        max_properties: o.max_properties.unwrap_or(p.max_properties),
        max_users: o.max_users.unwrap_or(p.max_users),
        max_offices: o.max_offices.unwrap_or(p.max_offices),
    }
}

/// Whether one more unit of `dim` fits on top of `current`
pub fn can_add(sub: &SubscriptionWithPlan, dim: Dimension, current: u64) -> bool {
    get_limits(sub).get(dim).has_room(current)
}

pub fn can_add_property(sub: &SubscriptionWithPlan, current: u64) -> bool {
    can_add(sub, Dimension::Properties, current)
}

pub fn can_add_user(sub: &SubscriptionWithPlan, current: u64) -> bool {
    can_add(sub, Dimension::Users, current)
}

pub fn can_add_office(sub: &SubscriptionWithPlan, current: u64) -> bool {
    can_add(sub, Dimension::Offices, current)
}

fn dimension_status(used: u64, limit: Limit) -> DimensionStatus {
    let percentage = match limit {
        Limit::Unlimited => 0.0,
        Limit::Limited(0) => 100.0,
        Limit::Limited(n) => (used as f64 / n as f64) * 100.0,
    };
    DimensionStatus { used, limit, percentage, can_add: limit.has_room(used) }
}

pub fn get_usage_status(limits: &Limits, usage: &UsageCounts) -> UsageStatus {
    UsageStatus {
        properties: dimension_status(usage.properties, limits.max_properties),
        users: dimension_status(usage.users, limits.max_users),
        offices: dimension_status(usage.offices, limits.max_offices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_divides() {
        let s = dimension_status(1_000_000, Limit::Unlimited);
        assert_eq!(s.percentage, 0.0);
        assert!(s.can_add);
    }

    #[test]
    fn zero_ceiling_is_full() {
        let s = dimension_status(0, Limit::Limited(0));
        assert_eq!(s.percentage, 100.0);
        assert!(!s.can_add);
        assert!(s.percentage.is_finite());
    }

    #[test]
    fn overshoot_is_not_clamped() {
        let s = dimension_status(12, Limit::Limited(10));
        assert!((s.percentage - 120.0).abs() < 1e-9);
        assert!(!s.can_add);
    }
}
