mod common;

use axum::http::StatusCode;
use common::*;
use forge_billing::SubscriptionStatus;
use forge_tenant::ResourceState;
use serde_json::{json, Value};

fn subscription_event(kind: &str, customer: &str, subscription: &str, status: &str) -> Value {
    json!({
        "id": format!("evt_{}_{}", kind, status),
        "type": kind,
        "data": { "object": {
            "id": subscription,
            "customer": customer,
            "status": status,
        }}
    })
}

#[tokio::test]
async fn test_malformed_event_is_acknowledged() {
    let app = app();
    let response = app.server.post("/ee/billing/callback").text("not json").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "received": true }));
}

#[tokio::test]
async fn test_unknown_customer_is_acknowledged() {
    let app = app();
    app.callback(subscription_event(
        "customer.subscription.updated",
        "cus_nobody",
        "sub_nobody",
        "active",
    ))
    .await
    .assert_status_ok();
    assert!(app.state.subscriptions.is_empty());
}

#[tokio::test]
async fn test_checkout_binds_subscription() {
    let app = app();
    let team = app.create_team("buyers", STARTER).await;
    app.checkout(&team, "cus_buyers", "sub_buyers").await;

    let subscription = app.state.subscriptions.for_team(&team.parse().unwrap()).unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.subscription.as_deref(), Some("sub_buyers"));
}

#[tokio::test]
async fn test_large_event_is_processed() {
    let app = app();
    let team = app.create_team("verbose", STARTER).await;

    // past axum's 2 MiB default body limit
    let response = app
        .callback(json!({
            "id": "evt_checkout_large",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_large",
                "customer": "cus_large",
                "subscription": "sub_large",
                "client_reference_id": team,
                "metadata": { "notes": "x".repeat(3 * 1024 * 1024) },
            }}
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "received": true }));

    let subscription = app.state.subscriptions.for_team(&team.parse().unwrap()).unwrap();
    assert_eq!(subscription.subscription.as_deref(), Some("sub_large"));
}

#[tokio::test]
async fn test_free_trial_subscription_is_credited() {
    let app = app();
    let team = app.create_team("credited", ENTERPRISE).await;
    app.checkout(&team, "cus_credit", "sub_credit").await;

    app.callback(json!({
        "id": "evt_created",
        "type": "customer.subscription.created",
        "data": { "object": {
            "id": "sub_credit",
            "customer": "cus_credit",
            "metadata": { "free_trial": "true" },
        }}
    }))
    .await
    .assert_status_ok();

    let transactions = app.provider.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, -1000);
    assert_eq!(transactions[0].currency, "usd");
}

#[tokio::test]
async fn test_deleted_subscription_suspends_every_resource() {
    let app = app();
    let team = app.create_team("cancelling", ENTERPRISE).await;
    app.checkout(&team, "cus_cancel", "sub_cancel").await;

    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        let created = app.create_resource(&team, name, &small()).await;
        created.assert_status(StatusCode::CREATED);
        ids.push(created.json::<Value>()["id"].as_str().unwrap().to_string());
    }
    app.server
        .post(&format!("/api/v1/resources/{}/actions/suspend", ids[2]))
        .await
        .assert_status_ok();
    app.state.gate.settle().await;
    assert_eq!(app.provider.quantity("sub_cancel", SMALL_PRICE), 2);

    app.callback(subscription_event(
        "customer.subscription.deleted",
        "cus_cancel",
        "sub_cancel",
        "canceled",
    ))
    .await
    .assert_status_ok();
    app.state.gate.settle().await;

    let team_id = team.parse().unwrap();
    let resources = app.state.tenants.team_resources(&team_id);
    assert_eq!(resources.len(), 3);
    assert!(resources.iter().all(|r| r.state == ResourceState::Suspended));
    assert_eq!(
        app.state.subscriptions.for_team(&team_id).unwrap().status,
        SubscriptionStatus::Canceled
    );
    assert_eq!(app.state.audit.len(), 1);

    // the cascade makes no billing calls
    assert_eq!(app.provider.quantity("sub_cancel", SMALL_PRICE), 2);

    let blocked = app.create_resource(&team, "d", &small()).await;
    blocked.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(blocked.json::<Value>()["code"], "billing_required");
}

#[tokio::test]
async fn test_stale_update_after_delete_is_ignored() {
    let app = app();
    let team = app.create_team("stale", ENTERPRISE).await;
    app.checkout(&team, "cus_stale", "sub_stale").await;

    app.callback(subscription_event(
        "customer.subscription.deleted",
        "cus_stale",
        "sub_stale",
        "canceled",
    ))
    .await
    .assert_status_ok();
    app.callback(subscription_event(
        "customer.subscription.updated",
        "cus_stale",
        "sub_stale",
        "canceled",
    ))
    .await
    .assert_status_ok();

    let subscription = app.state.subscriptions.for_team(&team.parse().unwrap()).unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Canceled);
    assert_eq!(app.state.audit.len(), 1);
}

#[tokio::test]
async fn test_unhandled_status_leaves_subscription_alone() {
    let app = app();
    let team = app.create_team("paused", ENTERPRISE).await;
    app.checkout(&team, "cus_paused", "sub_paused").await;

    app.callback(subscription_event(
        "customer.subscription.updated",
        "cus_paused",
        "sub_paused",
        "paused",
    ))
    .await
    .assert_status_ok();

    let subscription = app.state.subscriptions.for_team(&team.parse().unwrap()).unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_custom_route_prefix() {
    let app = app_with(|config| config.billing.route_prefix = "/billing-ee/".into());
    app.server
        .post("/billing-ee/billing/callback")
        .text("{}")
        .await
        .assert_status_ok();
}
