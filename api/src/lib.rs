//! Forge Control Plane API
//!
//! HTTP surface over the tenant, entitlement and billing core.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           FORGE CONTROL PLANE API                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                          REST API                                │   │
//! │  │   /api/v1/teams │ /api/v1/resources │ /api/v1/flow-blueprints    │   │
//! │  │   /api/v1/settings/features │ /health                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      BILLING CALLBACK                            │   │
//! │  │   <prefix>/billing/callback  -> always 200, reconciled async     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │ Team Registry│  │ Entitlements │  │ Lifecycle    │  │ Reconciler  │ │
//! │  │              │  │              │  │ Gate         │  │             │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use anyhow::{anyhow, Context};
use axum::{routing::get, Router};
use forge_billing::{
    BillingProvider, LifecycleGate, ResourceDriver, SubscriptionReconciler, SubscriptionStore,
};
use forge_common::{AuditLog, FeatureRegistry, InMemoryAuditLog};
use forge_tenant::{
    EntitlementEvaluator, FlowBlueprintStore, InstanceTypeCatalog, PolicyStore, TeamRegistry,
    TeamTypeProperties, TenantStore, TrialPolicy,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ForgeConfig;
pub use error::{ApiError, ApiResult};

/// Features this build ships, registered before configured overrides
const BUILTIN_FEATURES: &[(&str, bool, bool)] = &[
    ("flowBlueprints", true, true),
    ("shared-library", true, true),
    ("devops-pipelines", true, true),
    ("customCatalogs", true, true),
];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ForgeConfig>,
    /// Instance type catalog
    pub catalog: Arc<InstanceTypeCatalog>,
    /// Team types
    pub policies: Arc<PolicyStore>,
    /// Teams, members, devices and resources
    pub tenants: Arc<TenantStore>,
    /// Limit checks over the tenant store
    pub evaluator: Arc<EntitlementEvaluator>,
    /// Team lifecycle
    pub teams: Arc<TeamRegistry>,
    /// Team subscriptions
    pub subscriptions: Arc<SubscriptionStore>,
    /// Lifecycle gate for resource actions
    pub gate: Arc<LifecycleGate>,
    /// Billing webhook handler
    pub reconciler: Arc<SubscriptionReconciler>,
    /// Flow blueprints
    pub blueprints: Arc<FlowBlueprintStore>,
    /// Feature flags served to clients
    pub features: Arc<FeatureRegistry>,
    /// Team type change records
    pub audit: Arc<InMemoryAuditLog>,
}

impl AppState {
    /// Seed the catalog from `config` and wire every component together
    pub fn new(
        config: ForgeConfig,
        provider: Arc<dyn BillingProvider>,
        driver: Arc<dyn ResourceDriver>,
    ) -> anyhow::Result<Self> {
        let catalog = Arc::new(InstanceTypeCatalog::new(&config.catalog.salt));
        let policies = Arc::new(PolicyStore::new());
        let tenants = Arc::new(TenantStore::new());
        let subscriptions = Arc::new(SubscriptionStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let audit_log: Arc<dyn AuditLog> = audit.clone();

        seed_catalog(&config, &catalog, &policies)?;

        let evaluator = Arc::new(EntitlementEvaluator::new(
            catalog.clone(),
            policies.clone(),
            tenants.clone(),
        ));
        let teams = Arc::new(TeamRegistry::new(
            tenants.clone(),
            policies.clone(),
            evaluator.clone(),
            audit_log.clone(),
            config.license.clone(),
        ));
        let gate = Arc::new(LifecycleGate::new(
            evaluator.clone(),
            subscriptions.clone(),
            provider.clone(),
            driver,
            config.billing.clone(),
        ));
        let reconciler = Arc::new(SubscriptionReconciler::new(
            subscriptions.clone(),
            tenants.clone(),
            gate.clone(),
            provider,
            audit_log,
            config.billing.clone(),
        ));

        let features = Arc::new(FeatureRegistry::new());
        for (name, enabled, public) in BUILTIN_FEATURES {
            features.register(name, *enabled, *public);
        }
        for (name, enabled) in &config.features {
            features.set_enabled(name, *enabled);
        }

        Ok(Self {
            config: Arc::new(config),
            catalog,
            policies,
            tenants,
            evaluator,
            teams,
            subscriptions,
            gate,
            reconciler,
            blueprints: Arc::new(FlowBlueprintStore::new()),
            features,
            audit,
        })
    }
}

/// Publish configured instance types and team types
fn seed_catalog(config: &ForgeConfig, catalog: &InstanceTypeCatalog, policies: &PolicyStore) -> anyhow::Result<()> {
    let mut by_name = std::collections::HashMap::new();
    for seed in &config.catalog.instance_types {
        let instance_type = catalog.create(&seed.name, seed.active, seed.order);
        by_name.insert(seed.name.clone(), instance_type.id);
    }

    for seed in &config.catalog.team_types {
        let lookup = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("team type '{}' references unknown instance type '{}'", seed.name, name))
        };

        let mut properties = TeamTypeProperties::default()
            .with_users(seed.users)
            .with_devices(seed.devices);
        for (name, limit) in &seed.instances {
            properties = properties.with_instance(lookup(name)?, limit.active, limit.limit);
        }
        if let Some(trial) = &seed.trial {
            let instance_type = trial.instance_type.as_deref().map(|name| lookup(name)).transpose()?;
            properties = properties.with_trial(TrialPolicy {
                active: true,
                instance_type,
                duration: trial.duration,
            });
        }
        policies.create(&seed.name, seed.order, properties);
    }
    Ok(())
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    let billing_prefix = state.config.billing.route_prefix.trim_end_matches('/').to_string();

    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes());
    let router = if billing_prefix.is_empty() {
        router.merge(routes::billing::router())
    } else {
        router.nest(&billing_prefix, routes::billing::router())
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/teams", routes::teams::router())
        .nest("/resources", routes::resources::router())
        .nest("/flow-blueprints", routes::blueprints::router())
        .nest("/settings", routes::features::router())
}

/// Resolve the bind address, preferring an explicit override
pub fn bind_address(config: &ForgeConfig, override_bind: Option<&str>) -> anyhow::Result<std::net::SocketAddr> {
    let bind = override_bind.unwrap_or(&config.server.bind);
    bind.parse().with_context(|| format!("invalid bind address '{}'", bind))
}
