//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestResponse, TestServer};
use forge_api::{build_router, AppState, ForgeConfig};
use forge_billing::{BillingItem, LedgerBillingProvider, LocalDriver};
use forge_tenant::{InstanceTypeCatalog, InstanceTypeId};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const STARTER: u64 = 1;
pub const LEGACY: u64 = 2;
pub const ENTERPRISE: u64 = 3;
pub const SOLO: u64 = 4;

pub const SMALL_PRICE: &str = "price_small";

const CONFIG: &str = r#"
[license]
licensed = false
teams = 3

[[catalog.instance_types]]
name = "small"
order = 1

[[catalog.instance_types]]
name = "large"
order = 2

[[catalog.team_types]]
name = "starter"
order = 1
users = 3
devices = 2
instances.small = { active = true, limit = 2 }
trial = { duration = 14 }

[[catalog.team_types]]
name = "legacy"
order = 2
instances.small = { active = true, limit = 1 }
trial = { instance_type = "small", duration = 7 }

[[catalog.team_types]]
name = "enterprise"
order = 3
instances.small = { active = true }
instances.large = { active = true }

[[catalog.team_types]]
name = "solo"
order = 0
users = 1
devices = 0
instances.small = { active = true, limit = 1 }
"#;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub provider: Arc<LedgerBillingProvider>,
}

/// External ids the catalog hands out, in seed order
pub fn small() -> String {
    InstanceTypeCatalog::new("forge").encode(InstanceTypeId(1))
}

pub fn large() -> String {
    InstanceTypeCatalog::new("forge").encode(InstanceTypeId(2))
}

pub fn app() -> TestApp {
    app_with(|_| {})
}

pub fn app_with(configure: impl FnOnce(&mut ForgeConfig)) -> TestApp {
    let mut config = ForgeConfig::from_toml(CONFIG).unwrap();
    config.billing.new_customer_free_credit = Some(1000);
    config.billing.items.insert(
        small(),
        BillingItem {
            product: "prod_small".into(),
            price: SMALL_PRICE.into(),
        },
    );
    configure(&mut config);

    let provider = Arc::new(LedgerBillingProvider::new());
    let driver = Arc::new(LocalDriver::new(Duration::from_millis(5)));
    let state = AppState::new(config, provider.clone(), driver).unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();

    TestApp { server, state, provider }
}

pub fn role(role: &'static str) -> (HeaderName, HeaderValue) {
    (HeaderName::from_static("x-forge-role"), HeaderValue::from_static(role))
}

impl TestApp {
    pub async fn create_team(&self, name: &str, team_type: u64) -> String {
        let response = self
            .server
            .post("/api/v1/teams")
            .json(&json!({ "name": name, "teamType": team_type }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"].as_str().unwrap().to_string()
    }

    pub async fn create_resource(&self, team: &str, name: &str, instance_type: &str) -> TestResponse {
        self.server
            .post(&format!("/api/v1/teams/{}/resources", team))
            .json(&json!({ "name": name, "instanceType": instance_type }))
            .await
    }

    /// Bind a team to a paid subscription through the billing callback
    pub async fn checkout(&self, team: &str, customer: &str, subscription: &str) {
        self.callback(json!({
            "id": format!("evt_checkout_{}", subscription),
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": format!("cs_{}", subscription),
                "customer": customer,
                "subscription": subscription,
                "client_reference_id": team,
            }}
        }))
        .await
        .assert_status_ok();
    }

    pub async fn callback(&self, event: Value) -> TestResponse {
        self.server.post("/ee/billing/callback").json(&event).await
    }
}
