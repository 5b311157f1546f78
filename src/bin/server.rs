//! tenantgate REST API Server
//!
//! Run with: cargo run --features server --bin tenantgate-server
//!
//! The caller is identified by `x-tenant-id` and `x-user-id` headers, set by
//! whatever authenticates requests in front of this service.
//!
//! Endpoints:
//!   GET    /health                   - Liveness
//!   GET    /plans                    - Seeded plans
//!   POST   /tenants                  - Provision a tenant (starter trial)
//!   GET    /permissions              - Caller's permission set
//!   POST   /check                    - Permission (and capacity) check
//!   GET    /subscription             - Subscription, plan, limits, expiry
//!   GET    /features/:feature        - Is a feature unlocked
//!   POST   /usage                    - Usage status for given counts
//!   GET    /roles                    - List roles
//!   POST   /roles                    - Create role
//!   PUT    /roles/:id                - Rename / replace permissions
//!   DELETE /roles/:id                - Delete role
//!   PUT    /members/:user_id         - Assign role
//!   DELETE /members/:user_id         - Remove role
//!   PUT    /subscription/overrides   - Per-tenant limit overrides
//!   PUT    /subscription/status      - Set lifecycle status
//!   PUT    /subscription/plan        - Change plan

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenantgate::{
    actor_permissions, assign_role, authorize, authorize_create, change_plan, create_role, delete_role,
    get_days_until_expiry, get_limits, get_subscription_with_plan, get_usage_status, has_feature,
    is_subscription_active, is_subscription_expired, list_plans, list_roles, provision_tenant,
    set_limit_overrides, set_subscription_status, unassign_role, update_role,
    Action, Actor, Denial, FeatureKey, GateError, LimitOverrides, Limits, PermissionSet, Provisioned,
    Resource, Role, Subscription, SubscriptionPlan, SubscriptionStatus, SubscriptionWithPlan, Tier,
    UsageCounts, UsageStatus,
};

// ============================================================================
// Config
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tenantgate-server", about = "Permission and plan gating API")]
struct Config {
    /// LMDB directory
    #[arg(short = 'd', long, env = "TENANTGATE_DB", default_value = "./data/tenantgate.mdb")]
    db_path: String,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Upsert the plan catalog on startup
    #[arg(long, env = "TENANTGATE_SEED_PLANS", default_value_t = true, action = clap::ArgAction::Set)]
    seed_plans: bool,
}

// ============================================================================
// Responses & errors
// ============================================================================

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data: Some(data), error: None })
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

enum ApiError {
    Unauthenticated,
    Gate(GateError),
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        ApiError::Gate(e)
    }
}

impl From<Denial> for ApiError {
    fn from(d: Denial) -> Self {
        ApiError::Gate(GateError::Denied(d))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "missing x-tenant-id / x-user-id".to_string()),
            ApiError::Gate(e) => {
                let status = match &e {
                    GateError::Denied(_) => StatusCode::FORBIDDEN,
                    GateError::NotFound(_) => StatusCode::NOT_FOUND,
                    GateError::Invalid(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %e, "request failed");
                }
                (status, e.to_string())
            }
        };
        let body = ApiResponse::<()> { success: false, data: None, error: Some(msg) };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Caller
// ============================================================================

struct Caller(Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };
        match (header("x-tenant-id"), header("x-user-id")) {
            (Some(tenant), Some(user)) => Ok(Caller(Actor::new(tenant, user))),
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

/// Check the caller's own permission before a read
fn require(actor: Actor, resource: Resource, action: Action) -> Result<(), ApiError> {
    authorize(&actor_permissions(actor)?, resource, action)?;
    Ok(())
}

fn subscription_for(actor: Actor) -> Result<SubscriptionWithPlan, ApiError> {
    get_subscription_with_plan(actor.tenant_id)?
        .ok_or_else(|| GateError::NotFound(format!("subscription for tenant {}", actor.tenant_id)).into())
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct ProvisionReq {
    name: String,
    owner_user_id: u64,
}

#[derive(Deserialize)]
struct CheckReq {
    resource: Resource,
    action: Action,
    /// Current counts; when present a `create` also checks capacity
    usage: Option<UsageCounts>,
}

#[derive(Serialize)]
struct CheckRes {
    allowed: bool,
    reason: Option<String>,
}

#[derive(Serialize)]
struct SubscriptionRes {
    subscription: Subscription,
    plan: SubscriptionPlan,
    limits: Limits,
    active: bool,
    expired: bool,
    days_until_expiry: i64,
}

#[derive(Serialize)]
struct FeatureRes {
    feature: FeatureKey,
    enabled: bool,
}

#[derive(Deserialize)]
struct CreateRoleReq {
    name: String,
    #[serde(default)]
    permissions: PermissionSet,
}

#[derive(Deserialize)]
struct UpdateRoleReq {
    name: Option<String>,
    permissions: Option<PermissionSet>,
}

#[derive(Deserialize)]
struct AssignReq {
    role_id: u64,
}

#[derive(Deserialize)]
struct StatusReq {
    status: SubscriptionStatus,
}

#[derive(Deserialize)]
struct PlanReq {
    tier: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<ApiResponse<&'static str>> {
    ApiResponse::ok("ok")
}

async fn get_plans() -> ApiResult<Vec<SubscriptionPlan>> {
    Ok(ApiResponse::ok(list_plans()?))
}

async fn post_tenant(Json(req): Json<ProvisionReq>) -> Result<(StatusCode, Json<ApiResponse<Provisioned>>), ApiError> {
    let p = provision_tenant(&req.name, req.owner_user_id)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(p)))
}

async fn get_permissions(Caller(actor): Caller) -> ApiResult<PermissionSet> {
    Ok(ApiResponse::ok(actor_permissions(actor)?))
}

async fn post_check(Caller(actor): Caller, Json(req): Json<CheckReq>) -> ApiResult<CheckRes> {
    let perms = actor_permissions(actor)?;
    let outcome = match (req.action, req.usage) {
        (Action::Create, Some(usage)) => {
            let sub = subscription_for(actor)?;
            authorize_create(&perms, &sub, req.resource, &usage)
        }
        _ => authorize(&perms, req.resource, req.action),
    };
    Ok(ApiResponse::ok(CheckRes {
        allowed: outcome.is_ok(),
        reason: outcome.err().map(|d| d.to_string()),
    }))
}

async fn get_subscription(Caller(actor): Caller) -> ApiResult<SubscriptionRes> {
    require(actor, Resource::Billing, Action::View)?;
    let sub = subscription_for(actor)?;
    let limits = get_limits(&sub);
    let SubscriptionWithPlan { subscription, plan } = sub;
    Ok(ApiResponse::ok(SubscriptionRes {
        active: is_subscription_active(&subscription),
        expired: is_subscription_expired(&subscription),
        days_until_expiry: get_days_until_expiry(&subscription),
        subscription,
        plan,
        limits,
    }))
}

async fn get_feature(Caller(actor): Caller, Path(feature): Path<String>) -> ApiResult<FeatureRes> {
    let feature: FeatureKey = feature.parse()?;
    let sub = subscription_for(actor)?;
    Ok(ApiResponse::ok(FeatureRes { feature, enabled: has_feature(&sub, feature) }))
}

async fn post_usage(Caller(actor): Caller, Json(usage): Json<UsageCounts>) -> ApiResult<UsageStatus> {
    let sub = subscription_for(actor)?;
    Ok(ApiResponse::ok(get_usage_status(&get_limits(&sub), &usage)))
}

async fn get_roles(Caller(actor): Caller) -> ApiResult<Vec<Role>> {
    require(actor, Resource::Roles, Action::View)?;
    Ok(ApiResponse::ok(list_roles(actor.tenant_id)?))
}

async fn post_role(Caller(actor): Caller, Json(req): Json<CreateRoleReq>) -> Result<(StatusCode, Json<ApiResponse<Role>>), ApiError> {
    let role = create_role(actor, &req.name, req.permissions)?;
    Ok((StatusCode::CREATED, ApiResponse::ok(role)))
}

async fn put_role(Caller(actor): Caller, Path(id): Path<u64>, Json(req): Json<UpdateRoleReq>) -> ApiResult<Role> {
    Ok(ApiResponse::ok(update_role(actor, id, req.name.as_deref(), req.permissions)?))
}

async fn delete_role_handler(Caller(actor): Caller, Path(id): Path<u64>) -> ApiResult<bool> {
    if !delete_role(actor, id)? {
        return Err(GateError::NotFound(format!("role {}", id)).into());
    }
    Ok(ApiResponse::ok(true))
}

async fn put_member(Caller(actor): Caller, Path(user_id): Path<u64>, Json(req): Json<AssignReq>) -> ApiResult<u64> {
    assign_role(actor, user_id, req.role_id)?;
    Ok(ApiResponse::ok(req.role_id))
}

async fn delete_member(Caller(actor): Caller, Path(user_id): Path<u64>) -> ApiResult<bool> {
    Ok(ApiResponse::ok(unassign_role(actor, user_id)?))
}

async fn put_overrides(Caller(actor): Caller, Json(overrides): Json<LimitOverrides>) -> ApiResult<Subscription> {
    Ok(ApiResponse::ok(set_limit_overrides(actor, overrides)?))
}

async fn put_status(Caller(actor): Caller, Json(req): Json<StatusReq>) -> ApiResult<Subscription> {
    Ok(ApiResponse::ok(set_subscription_status(actor, req.status)?))
}

async fn put_plan(Caller(actor): Caller, Json(req): Json<PlanReq>) -> ApiResult<SubscriptionWithPlan> {
    let tier: Tier = req.tier.parse()?;
    Ok(ApiResponse::ok(change_plan(actor, tier)?))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    tracing::info!(db = %config.db_path, "initializing store");
    tenantgate::init(&config.db_path)?;
    if config.seed_plans {
        tenantgate::seed_plans()?;
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/plans", get(get_plans))
        .route("/tenants", post(post_tenant))
        .route("/permissions", get(get_permissions))
        .route("/check", post(post_check))
        .route("/subscription", get(get_subscription))
        .route("/subscription/overrides", put(put_overrides))
        .route("/subscription/status", put(put_status))
        .route("/subscription/plan", put(put_plan))
        .route("/features/:feature", get(get_feature))
        .route("/usage", post(post_usage))
        .route("/roles", get(get_roles).post(post_role))
        .route("/roles/:id", put(put_role).delete(delete_role_handler))
        .route("/members/:user_id", put(put_member).delete(delete_member))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, started = %Utc::now(), "tenantgate server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
