//! Subscription tiers, capacity limits and the plan catalog

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{invalid, GateError};

/// Subscription tier. Unknown or missing tiers read as [`Tier::Starter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Tier {
    #[default]
    Starter,
    Growth,
    Enterprise,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Starter, Tier::Growth, Tier::Enterprise];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Starter => "starter",
            Tier::Growth => "growth",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Lenient parse: anything unrecognised falls back to starter
    pub fn parse(s: &str) -> Tier {
        match s {
            "starter" => Tier::Starter,
            "growth" => Tier::Growth,
            "enterprise" => Tier::Enterprise,
            other => {
                tracing::warn!(tier = other, "unknown tier, treating as starter");
                Tier::Starter
            }
        }
    }
}

impl From<Option<String>> for Tier {
    fn from(s: Option<String>) -> Self {
        s.as_deref().map(Tier::parse).unwrap_or_default()
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Strict parse for requests: unknown tiers are an error, not starter
impl FromStr for Tier {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| invalid(format!("unknown tier '{}'", s)))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capacity ceiling for one metered dimension.
///
/// Stored and exchanged as an integer where `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    Limited(u64),
    Unlimited,
}

impl Limit {
    /// Whether one more unit fits on top of `used`
    #[inline]
    pub fn has_room(self, used: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Limited(n) => used < n,
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

impl TryFrom<i64> for Limit {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Limit::Unlimited),
            n if n >= 0 => Ok(Limit::Limited(n as u64)),
            n => Err(format!("limit must be -1 or non-negative, got {}", n)),
        }
    }
}

impl From<Limit> for i64 {
    fn from(l: Limit) -> i64 {
        match l {
            Limit::Unlimited => -1,
            Limit::Limited(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Limited(n) => write!(f, "{}", n),
        }
    }
}

/// Immutable reference data shared by every tenant on a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub name: String,
    #[serde(default)]
    pub tier: Tier,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub max_properties: Limit,
    pub max_users: Limit,
    pub max_offices: Limit,
    pub display_order: u32,
    /// Marketing bullet points, not used for gating
    #[serde(default)]
    pub features: Vec<String>,
}

fn plan(
    tier: Tier,
    name: &str,
    description: &str,
    price: Decimal,
    limits: [Limit; 3],
    display_order: u32,
    features: &[&str],
) -> SubscriptionPlan {
    let [max_properties, max_users, max_offices] = limits;
    SubscriptionPlan {
        name: name.into(),
        tier,
        description: description.into(),
        price,
        currency: "USD".into(),
        max_properties,
        max_users,
        max_offices,
        display_order,
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}

/// The plan for a tier as sold
pub fn catalog_plan(tier: Tier) -> SubscriptionPlan {
    use Limit::{Limited, Unlimited};
    match tier {
        Tier::Starter => plan(
            tier,
            "Starter",
            "Perfect for small property management companies",
            dec!(49.00),
            [Limited(10), Limited(3), Limited(1)],
            1,
            &[
                "Basic property management",
                "Tenant portal",
                "Payment tracking",
                "Email notifications",
                "Mobile responsive",
            ],
        ),
        Tier::Growth => plan(
            tier,
            "Growth",
            "For growing property management businesses",
            dec!(149.00),
            [Limited(50), Limited(10), Limited(5)],
            2,
            &[
                "All Starter features",
                "Custom branding",
                "Custom domain",
                "Maintenance tracking",
                "Advanced reporting",
                "Priority support",
                "Multi-office management",
            ],
        ),
        Tier::Enterprise => plan(
            tier,
            "Enterprise",
            "For large-scale property management operations",
            dec!(399.00),
            [Unlimited, Unlimited, Unlimited],
            3,
            &[
                "All Growth features",
                "White-label",
                "API access",
                "Audit logs",
                "Dedicated account manager",
                "Unlimited properties",
                "Unlimited users",
                "Unlimited offices",
                "Custom integrations",
            ],
        ),
    }
}

/// All catalog plans in display order
pub fn catalog() -> Vec<SubscriptionPlan> {
    Tier::ALL.into_iter().map(catalog_plan).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_or_missing_tier_is_starter() {
        assert_eq!(serde_json::from_str::<Tier>(r#""platinum""#).unwrap(), Tier::Starter);
        assert_eq!(serde_json::from_str::<Tier>("null").unwrap(), Tier::Starter);
        assert_eq!(serde_json::from_str::<Tier>(r#""growth""#).unwrap(), Tier::Growth);
        assert_eq!(serde_json::to_string(&Tier::Enterprise).unwrap(), r#""enterprise""#);
    }

    #[test]
    fn requested_tiers_parse_strictly() {
        assert_eq!("growth".parse::<Tier>().unwrap(), Tier::Growth);
        assert!("platinum".parse::<Tier>().is_err());
    }

    #[test]
    fn limit_sentinel_only_at_the_boundary() {
        assert_eq!(serde_json::from_str::<Limit>("-1").unwrap(), Limit::Unlimited);
        assert_eq!(serde_json::from_str::<Limit>("10").unwrap(), Limit::Limited(10));
        assert!(serde_json::from_str::<Limit>("-5").is_err());
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "-1");
    }

    #[test]
    fn has_room_is_strict() {
        assert!(Limit::Limited(10).has_room(9));
        assert!(!Limit::Limited(10).has_room(10));
        assert!(!Limit::Limited(0).has_room(0));
        assert!(Limit::Unlimited.has_room(u64::MAX));
    }

    #[test]
    fn catalog_is_ordered() {
        let plans = catalog();
        assert_eq!(plans.len(), 3);
        assert!(plans.windows(2).all(|w| w[0].display_order < w[1].display_order));
        assert_eq!(plans[0].max_users, Limit::Limited(3));
        assert!(plans[2].max_offices.is_unlimited());
        assert_eq!(plans[1].price, dec!(149));
    }

    #[test]
    fn plan_without_tier_reads_as_starter() {
        let mut v = serde_json::to_value(catalog_plan(Tier::Enterprise)).unwrap();
        v.as_object_mut().unwrap().remove("tier");
        let p: SubscriptionPlan = serde_json::from_value(v).unwrap();
        assert_eq!(p.tier, Tier::Starter);
    }
}
