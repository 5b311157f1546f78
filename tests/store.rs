//! Store tests: provisioning, roles, members and subscription writes

use std::sync::{MutexGuard, Once, OnceLock};

use chrono::{Duration, Utc};
use tempfile::TempDir;
use tenantgate::{
    actor_permissions, apply_billing_event, assign_role, change_plan, clear_all, create_role, delete_role,
    get_member_role, get_plan, get_role, get_subscription, get_subscription_with_plan, get_tenant,
    get_tenant_by_slug, has_feature, init, list_plans, list_roles, provision_tenant, rename_role,
    seed_default_roles, seed_plans, set_limit_overrides, set_subscription_status, test_lock, unassign_role,
    update_role, update_role_permissions, Action, Actor, DefaultRole, Denial, FeatureKey, GateError, Limit,
    LimitOverrides, PermissionSet, Resource, SubscriptionStatus, Tier,
};

static INIT: Once = Once::new();
static TEST_DIR: OnceLock<TempDir> = OnceLock::new();

const OWNER: u64 = 1_000;
const STAFF: u64 = 2_000;

fn setup() {
    INIT.call_once(|| {
        let dir = TempDir::new().unwrap();
        init(dir.path().to_str().unwrap()).unwrap();
        let _ = TEST_DIR.set(dir);
    });
}

fn setup_clean() -> MutexGuard<'static, ()> {
    let lock = test_lock();
    setup();
    clear_all().unwrap();
    lock
}

fn setup_seeded() -> MutexGuard<'static, ()> {
    let lock = setup_clean();
    seed_plans().unwrap();
    lock
}

/// Provision a tenant and return its owner actor
fn tenant(name: &str) -> Actor {
    let p = provision_tenant(name, OWNER).unwrap();
    Actor::new(p.tenant.id, OWNER)
}

fn is_denied(r: tenantgate::Result<impl std::fmt::Debug>) -> bool {
    matches!(r, Err(GateError::Denied(Denial::Permission { .. })))
}

// ============================================================================
// Init & plans
// ============================================================================

#[test]
fn test_init_is_idempotent_for_same_path() {
    let _lock = setup_clean();
    let path = TEST_DIR.get().unwrap().path().to_str().unwrap();
    assert!(init(path).is_ok());
    assert!(matches!(init("/tmp/some-other-tenantgate-dir"), Err(GateError::AlreadyInitialized(_))));
}

#[test]
fn test_seed_plans_is_idempotent() {
    let _lock = setup_seeded();
    assert_eq!(seed_plans().unwrap(), 3);
    let plans = list_plans().unwrap();
    let tiers: Vec<Tier> = plans.iter().map(|p| p.tier).collect();
    assert_eq!(tiers, vec![Tier::Starter, Tier::Growth, Tier::Enterprise]);
    assert_eq!(get_plan(Tier::Starter).unwrap().unwrap().max_properties, Limit::Limited(10));
}

// ============================================================================
// Provisioning
// ============================================================================

#[test]
fn test_provision_requires_seeded_plans() {
    let _lock = setup_clean();
    assert!(matches!(provision_tenant("Acme", OWNER), Err(GateError::NotFound(_))));
    assert!(get_tenant_by_slug("acme").unwrap().is_none());
}

#[test]
fn test_provision_rejects_empty_name() {
    let _lock = setup_seeded();
    assert!(matches!(provision_tenant("   ", OWNER), Err(GateError::Invalid(_))));
}

#[test]
fn test_provision_starts_a_starter_trial() {
    let _lock = setup_seeded();
    let before = Utc::now();
    let p = provision_tenant("Acme Property Group", OWNER).unwrap();

    assert_eq!(p.tenant.slug, "acme-property-group");
    assert_eq!(get_tenant(p.tenant.id).unwrap(), Some(p.tenant.clone()));

    let sub = get_subscription(p.tenant.id).unwrap().unwrap();
    assert_eq!(sub.tier, Tier::Starter);
    assert_eq!(sub.status, SubscriptionStatus::Trialing);
    assert!(sub.current_period_end >= before + Duration::days(14));
    assert_eq!(sub.trial_ends_at, Some(sub.current_period_end));

    assert_eq!(p.owner_role.name, DefaultRole::AccountOwner.name());
    assert_eq!(get_member_role(p.tenant.id, OWNER).unwrap(), Some(p.owner_role.id));
}

#[test]
fn test_slugs_stay_unique() {
    let _lock = setup_seeded();
    let a = provision_tenant("Acme", OWNER).unwrap();
    let b = provision_tenant("ACME", OWNER).unwrap();
    let c = provision_tenant("acme!", OWNER).unwrap();
    assert_eq!(a.tenant.slug, "acme");
    assert_eq!(b.tenant.slug, "acme-1");
    assert_eq!(c.tenant.slug, "acme-2");
    assert_eq!(get_tenant_by_slug("acme-1").unwrap().unwrap().id, b.tenant.id);

    let d = provision_tenant("???", OWNER).unwrap();
    assert_eq!(d.tenant.slug, "tenant");
}

// ============================================================================
// Roles & members
// ============================================================================

#[test]
fn test_owner_holds_every_permission() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let perms = actor_permissions(owner).unwrap();
    assert!(perms.allows(Resource::Billing, Action::Manage));
    assert!(perms.allows(Resource::Roles, Action::Delete));
}

#[test]
fn test_unassigned_user_has_no_permissions() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let stranger = Actor::new(owner.tenant_id, STAFF);
    assert!(actor_permissions(stranger).unwrap().is_empty());
    assert!(is_denied(create_role(stranger, "Sneaky", PermissionSet::new())));
}

#[test]
fn test_viewer_cannot_create_roles() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let viewer = create_role(owner, "Viewer", DefaultRole::Viewer.permissions()).unwrap();
    assign_role(owner, STAFF, viewer.id).unwrap();

    let staff = Actor::new(owner.tenant_id, STAFF);
    assert!(is_denied(create_role(staff, "Escalate", DefaultRole::AccountOwner.permissions())));
    assert!(is_denied(assign_role(staff, STAFF, viewer.id)));
    assert!(is_denied(set_limit_overrides(staff, LimitOverrides::default())));
    assert_eq!(list_roles(owner.tenant_id).unwrap().len(), 2);
}

#[test]
fn test_role_edits() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let role = create_role(owner, "  Front Desk ", PermissionSet::new()).unwrap();
    assert_eq!(role.name, "Front Desk");
    assert!(matches!(create_role(owner, " ", PermissionSet::new()), Err(GateError::Invalid(_))));

    let perms = PermissionSet::from_entries(&[(Resource::Leases, &[Action::View, Action::Create])]);
    update_role_permissions(owner, role.id, perms.clone()).unwrap();
    let renamed = rename_role(owner, role.id, "Leasing Desk").unwrap();
    assert_eq!(renamed.name, "Leasing Desk");
    assert_eq!(renamed.permissions, perms);

    assign_role(owner, STAFF, role.id).unwrap();
    let staff = Actor::new(owner.tenant_id, STAFF);
    assert!(actor_permissions(staff).unwrap().allows(Resource::Leases, Action::Create));
    assert!(!actor_permissions(staff).unwrap().allows(Resource::Leases, Action::Edit));
}

#[test]
fn test_deleting_a_role_strips_its_holders() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let role = create_role(owner, "Temp", DefaultRole::PropertyManager.permissions()).unwrap();
    assign_role(owner, STAFF, role.id).unwrap();

    assert!(delete_role(owner, role.id).unwrap());
    assert!(!delete_role(owner, role.id).unwrap());
    assert_eq!(get_member_role(owner.tenant_id, STAFF).unwrap(), None);
    assert!(actor_permissions(Actor::new(owner.tenant_id, STAFF)).unwrap().is_empty());
    // owner untouched
    assert!(actor_permissions(owner).unwrap().allows(Resource::Roles, Action::Manage));
}

#[test]
fn test_unassign_role() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let role = create_role(owner, "Viewer", DefaultRole::Viewer.permissions()).unwrap();
    assign_role(owner, STAFF, role.id).unwrap();
    assert!(unassign_role(owner, STAFF).unwrap());
    assert!(!unassign_role(owner, STAFF).unwrap());
    assert!(actor_permissions(Actor::new(owner.tenant_id, STAFF)).unwrap().is_empty());
}

#[test]
fn test_roles_do_not_cross_tenants() {
    let _lock = setup_seeded();
    let acme = tenant("Acme");
    let globex = tenant("Globex");
    let role = create_role(acme, "Viewer", DefaultRole::Viewer.permissions()).unwrap();

    assert!(matches!(assign_role(globex, STAFF, role.id), Err(GateError::NotFound(_))));
    assert!(matches!(rename_role(globex, role.id, "Mine"), Err(GateError::NotFound(_))));
    assert_eq!(list_roles(globex.tenant_id).unwrap().len(), 1);
}

#[test]
fn test_seed_default_roles_fills_gaps() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let created = seed_default_roles(owner).unwrap();
    let names: Vec<&str> = created.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Property Manager", "Maintenance Coordinator", "Leasing Agent", "Viewer"]);
    assert!(seed_default_roles(owner).unwrap().is_empty());
    assert_eq!(list_roles(owner.tenant_id).unwrap().len(), 5);
}

#[test]
fn test_cannot_assign_a_role_above_your_own() {
    let _lock = setup_seeded();
    let p = provision_tenant("Acme", OWNER).unwrap();
    let owner = Actor::new(p.tenant.id, OWNER);
    let hr = PermissionSet::from_entries(&[(Resource::Users, &[Action::Edit])]);
    let hr = create_role(owner, "HR", hr).unwrap();
    assign_role(owner, STAFF, hr.id).unwrap();

    let staff = Actor::new(owner.tenant_id, STAFF);
    assert!(is_denied(assign_role(staff, STAFF, p.owner_role.id)));
    assert!(is_denied(assign_role(staff, 3_000, p.owner_role.id)));
    assert_eq!(get_member_role(owner.tenant_id, STAFF).unwrap(), Some(hr.id));
    assert!(!actor_permissions(staff).unwrap().allows(Resource::Billing, Action::Manage));

    // a role within the assigner's own set is fine
    assign_role(staff, 3_000, hr.id).unwrap();
}

#[test]
fn test_role_writes_stay_within_the_writer() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let admin = PermissionSet::from_entries(&[
        (Resource::Roles, &[Action::Create, Action::Edit]),
        (Resource::Maintenance, &[Action::Manage]),
    ]);
    let admin = create_role(owner, "Role admin", admin).unwrap();
    assign_role(owner, STAFF, admin.id).unwrap();
    let staff = Actor::new(owner.tenant_id, STAFF);

    let billing = PermissionSet::from_entries(&[(Resource::Billing, &[Action::View])]);
    assert!(is_denied(create_role(staff, "Billing", billing.clone())));

    // manage on maintenance covers any maintenance action
    let crew = PermissionSet::from_entries(&[(Resource::Maintenance, &[Action::View, Action::Delete])]);
    let crew = create_role(staff, "Crew", crew).unwrap();
    assert!(is_denied(update_role_permissions(staff, crew.id, billing)));
    assert!(is_denied(seed_default_roles(staff)));
    assert_eq!(list_roles(owner.tenant_id).unwrap().len(), 3);
}

#[test]
fn test_failed_update_changes_nothing() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let editor = PermissionSet::from_entries(&[(Resource::Roles, &[Action::Edit])]);
    let editor = create_role(owner, "Editor", editor).unwrap();
    assign_role(owner, STAFF, editor.id).unwrap();
    let staff = Actor::new(owner.tenant_id, STAFF);

    let wider = PermissionSet::from_entries(&[(Resource::Billing, &[Action::Manage])]);
    assert!(is_denied(update_role(staff, editor.id, Some("Renamed"), Some(wider))));
    assert_eq!(get_role(owner.tenant_id, editor.id).unwrap().unwrap().name, "Editor");

    assert!(matches!(update_role(owner, editor.id, None, None), Err(GateError::Invalid(_))));
    let both = update_role(owner, editor.id, Some("Role editor"), Some(PermissionSet::new())).unwrap();
    assert_eq!(both.name, "Role editor");
    assert!(both.permissions.is_empty());
}

#[test]
fn test_cannot_lock_yourself_out() {
    let _lock = setup_seeded();
    let p = provision_tenant("Acme", OWNER).unwrap();
    let owner = Actor::new(p.tenant.id, OWNER);

    assert!(matches!(delete_role(owner, p.owner_role.id), Err(GateError::Invalid(_))));
    assert!(matches!(unassign_role(owner, OWNER), Err(GateError::Invalid(_))));
    assert_eq!(get_member_role(owner.tenant_id, OWNER).unwrap(), Some(p.owner_role.id));
    assert!(actor_permissions(owner).unwrap().allows(Resource::Roles, Action::Manage));
}

// ============================================================================
// Subscription writes
// ============================================================================

#[test]
fn test_overrides_persist() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let overrides = LimitOverrides { max_properties: Some(Limit::Limited(40)), ..Default::default() };
    set_limit_overrides(owner, overrides).unwrap();

    let sub = get_subscription_with_plan(owner.tenant_id).unwrap().unwrap();
    let limits = tenantgate::get_limits(&sub);
    assert_eq!(limits.max_properties, Limit::Limited(40));
    assert_eq!(limits.max_users, Limit::Limited(3));
}

#[test]
fn test_change_plan_unlocks_features() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let before = get_subscription_with_plan(owner.tenant_id).unwrap().unwrap();
    assert!(!has_feature(&before, FeatureKey::MultiOffice));

    let after = change_plan(owner, Tier::Growth).unwrap();
    assert_eq!(after.plan.tier, Tier::Growth);
    assert!(has_feature(&after, FeatureKey::MultiOffice));
    assert_eq!(get_subscription(owner.tenant_id).unwrap().unwrap().tier, Tier::Growth);
}

#[test]
fn test_status_changes() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let sub = set_subscription_status(owner, SubscriptionStatus::Suspended).unwrap();
    assert!(!tenantgate::is_subscription_active(&sub));
    let sub = set_subscription_status(owner, "incomplete".into()).unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Other("incomplete".into()));
}

#[test]
fn test_billing_event_renews_period() {
    let _lock = setup_seeded();
    let owner = tenant("Acme");
    let old = get_subscription(owner.tenant_id).unwrap().unwrap();
    let new_end = old.current_period_end + Duration::days(30);

    let sub = apply_billing_event(owner.tenant_id, SubscriptionStatus::Active, Some(new_end)).unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.current_period_start, old.current_period_end);
    assert_eq!(sub.current_period_end, new_end);

    let sub = apply_billing_event(owner.tenant_id, SubscriptionStatus::PastDue, None).unwrap();
    assert_eq!(sub.current_period_end, new_end);
    assert_eq!(sub.status, SubscriptionStatus::PastDue);

    assert!(matches!(
        apply_billing_event(999_999, SubscriptionStatus::Active, None),
        Err(GateError::NotFound(_))
    ));
}
