//! Tier-gated product features

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{invalid, GateError};
use crate::plans::Tier;
use crate::subscription::SubscriptionWithPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    CustomDomain,
    AdvancedBranding,
    MaintenanceTracking,
    AdvancedReporting,
    MultiOffice,
    AuditLogs,
    WhiteLabel,
    ApiAccess,
    PrioritySupport,
    DedicatedAccount,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 10] = [
        FeatureKey::CustomDomain,
        FeatureKey::AdvancedBranding,
        FeatureKey::MaintenanceTracking,
        FeatureKey::AdvancedReporting,
        FeatureKey::MultiOffice,
        FeatureKey::AuditLogs,
        FeatureKey::WhiteLabel,
        FeatureKey::ApiAccess,
        FeatureKey::PrioritySupport,
        FeatureKey::DedicatedAccount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKey::CustomDomain => "customDomain",
            FeatureKey::AdvancedBranding => "advancedBranding",
            FeatureKey::MaintenanceTracking => "maintenanceTracking",
            FeatureKey::AdvancedReporting => "advancedReporting",
            FeatureKey::MultiOffice => "multiOffice",
            FeatureKey::AuditLogs => "auditLogs",
            FeatureKey::WhiteLabel => "whiteLabel",
            FeatureKey::ApiAccess => "apiAccess",
            FeatureKey::PrioritySupport => "prioritySupport",
            FeatureKey::DedicatedAccount => "dedicatedAccount",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| invalid(format!("unknown feature '{}'", s)))
    }
}

const GROWTH_FEATURES: &[FeatureKey] = &[
    FeatureKey::CustomDomain,
    FeatureKey::AdvancedBranding,
    FeatureKey::MaintenanceTracking,
    FeatureKey::AdvancedReporting,
    FeatureKey::MultiOffice,
    FeatureKey::PrioritySupport,
];

/// Features unlocked by a tier
pub fn tier_features(tier: Tier) -> &'static [FeatureKey] {
    match tier {
        Tier::Starter => &[],
        Tier::Growth => GROWTH_FEATURES,
        Tier::Enterprise => &FeatureKey::ALL,
    }
}

/// Whether the subscription's plan tier unlocks `feature`
pub fn has_feature(sub: &SubscriptionWithPlan, feature: FeatureKey) -> bool {
    tier_features(sub.plan.tier).contains(&feature)
}
