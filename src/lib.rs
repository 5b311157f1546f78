//! tenantgate - role permissions and plan gating for multi-tenant property management
//!
//! Two pure deciders sit at the core:
//!
//! - [`permissions`]: may an actor perform an [`Action`] on a [`Resource`]?
//! - the subscription gate ([`features`], [`limits`], [`subscription`]): does
//!   the tenant's tier unlock a feature, and is there room for one more
//!   property, user or office?
//!
//! [`guard`] composes them in request order. The LMDB-backed store
//! ([`db`], [`read`], [`write`], [`bootstrap`]) keeps tenants, roles,
//! assignments, plans and subscriptions so callers can resolve the inputs.
//!
//! ```
//! use tenantgate::{allows, Action, DefaultRole, Resource};
//!
//! let viewer = DefaultRole::Viewer.permissions();
//! assert!(allows(&viewer, Resource::Leases, Action::View));
//! assert!(!allows(&viewer, Resource::Leases, Action::Edit));
//! ```

pub mod bootstrap;
pub mod constants;
pub mod db;
pub mod error;
pub mod features;
pub mod guard;
pub mod limits;
pub mod permissions;
pub mod plans;
pub mod read;
pub mod roles;
pub mod subscription;
pub mod tenant;
pub mod tx;
pub mod write;

pub use bootstrap::{provision_tenant, seed_plans, Provisioned};
pub use db::{clear_all, init, test_lock};
pub use error::{GateError, Result};
pub use features::{has_feature, tier_features, FeatureKey};
pub use guard::{authorize, authorize_create, metered, require_feature, require_usable, Denial};
pub use limits::{
    can_add, can_add_office, can_add_property, can_add_user, get_limits, get_usage_status, Dimension,
    DimensionStatus, Limits, UsageCounts, UsageStatus,
};
pub use permissions::{
    allows, can_create, can_delete, can_edit, can_manage, can_view, Action, PermissionSet, Resource,
};
pub use plans::{catalog, catalog_plan, Limit, SubscriptionPlan, Tier};
pub use read::{
    actor_permissions, get_member_role, get_plan, get_role, get_subscription, get_subscription_with_plan,
    get_tenant, get_tenant_by_slug, list_plans, list_roles,
};
pub use roles::{DefaultRole, Role};
pub use subscription::{
    get_days_until_expiry, get_days_until_expiry_at, is_subscription_active, is_subscription_expired,
    is_subscription_expired_at, is_subscription_usable, is_subscription_usable_at, LimitOverrides,
    Subscription, SubscriptionStatus, SubscriptionWithPlan,
};
pub use tenant::{slugify, Actor, Tenant};
pub use tx::transact;
pub use write::{
    apply_billing_event, assign_role, change_plan, create_role, delete_role, rename_role,
    seed_default_roles, set_limit_overrides, set_subscription_status, unassign_role, update_role,
    update_role_permissions,
};
