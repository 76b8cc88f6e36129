mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{json, Value};

#[tokio::test]
async fn test_writes_require_admin() {
    let app = app();
    let (name, value) = role("member");
    app.server
        .post("/api/v1/flow-blueprints")
        .add_header(name, value)
        .json(&json!({ "name": "starter flows" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .get("/api/v1/flow-blueprints")
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "unauthorized");
}

#[tokio::test]
async fn test_blueprint_crud() {
    let app = app();

    let (name, value) = role("admin");
    let created = app
        .server
        .post("/api/v1/flow-blueprints")
        .add_header(name, value)
        .json(&json!({ "name": "Dashboard", "category": "ui", "active": true }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let blueprint = created.json::<Value>();
    assert_eq!(blueprint["flows"], json!({ "flows": [] }));
    assert_eq!(blueprint["modules"], json!({}));
    let id = blueprint["id"].as_str().unwrap().to_string();

    let (name, value) = role("viewer");
    let listed = app
        .server
        .get("/api/v1/flow-blueprints")
        .add_header(name, value)
        .await;
    listed.assert_status_ok();
    let page = listed.json::<Value>();
    assert_eq!(page["count"], 1);
    assert_eq!(page["blueprints"][0]["id"], id.as_str());
    assert!(page["blueprints"][0].get("flows").is_none());

    let (name, value) = role("admin");
    let updated = app
        .server
        .put(&format!("/api/v1/flow-blueprints/{}", id))
        .add_header(name, value)
        .json(&json!({ "active": false }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["active"], false);

    let (name, value) = role("member");
    let active_only = app
        .server
        .get("/api/v1/flow-blueprints")
        .add_header(name, value)
        .await;
    assert_eq!(active_only.json::<Value>()["count"], 0);

    let (name, value) = role("member");
    let all = app
        .server
        .get("/api/v1/flow-blueprints")
        .add_query_param("filter", "all")
        .add_header(name, value)
        .await;
    assert_eq!(all.json::<Value>()["count"], 1);

    let (name, value) = role("admin");
    let deleted = app
        .server
        .delete(&format!("/api/v1/flow-blueprints/{}", id))
        .add_header(name, value)
        .await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<Value>(), json!({ "status": "okay" }));

    let (name, value) = role("admin");
    app.server
        .get(&format!("/api/v1/flow-blueprints/{}", id))
        .add_header(name, value)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_unknown_filter_lists_active() {
    let app = app();
    for (blueprint, active) in [("Live", true), ("Retired", false)] {
        let (name, value) = role("admin");
        app.server
            .post("/api/v1/flow-blueprints")
            .add_header(name, value)
            .json(&json!({ "name": blueprint, "category": "ui", "active": active }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let (name, value) = role("viewer");
    let listed = app
        .server
        .get("/api/v1/flow-blueprints")
        .add_query_param("filter", "bogus")
        .add_header(name, value)
        .await;
    listed.assert_status_ok();
    let page = listed.json::<Value>();
    assert_eq!(page["count"], 1);
    assert_eq!(page["blueprints"][0]["name"], "Live");
}

#[tokio::test]
async fn test_invalid_blueprint_joins_messages() {
    let app = app();
    let (name, value) = role("admin");
    let response = app
        .server
        .post("/api/v1/flow-blueprints")
        .add_header(name, value)
        .json(&json!({ "name": "", "flows": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body = response.json::<Value>();
    assert_eq!(body["code"], "unexpected_error");
    assert_eq!(body["error"], "name must not be empty,flows must be an object");
}

#[tokio::test]
async fn test_public_feature_flags() {
    let app = app_with(|config| {
        config.features.insert("shared-library".into(), false);
    });
    let response = app.server.get("/api/v1/settings/features").await;
    response.assert_status_ok();

    let flags = response.json::<Value>();
    assert_eq!(flags["flowBlueprints"], true);
    assert_eq!(flags["shared-library"], false);
    assert_eq!(flags["customCatalogs"], true);
}
