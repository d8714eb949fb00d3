//! End-to-end exercise of the remote tool-call surface (spec §6) through
//! real HTTP requests against the router, backed by a temp-directory
//! database.

use std::sync::Arc;

use axum_test::TestServer;
use grizabella_core::config::GrizabellaConfig;
use grizabella_core::db_manager::GrizabellaDb;
use grizabella_core::types::{Property, PropertyDataType};
use grizabella_server::{router, AppState};
use serde_json::json;

async fn test_server() -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("kb");
    let db = GrizabellaDb::connect_with_config(db_path.to_str().unwrap(), true, &GrizabellaConfig::default())
        .await
        .unwrap();
    let state = AppState::new(Arc::new(db));
    let app = router(state);
    (TestServer::new(app).unwrap(), dir)
}

#[tokio::test]
async fn create_object_type_then_upsert_and_fetch_roundtrips() {
    let (server, _dir) = test_server().await;

    let otd = grizabella_core::types::ObjectTypeDefinition::new(
        "Book",
        vec![Property::new("title", PropertyDataType::Text)],
    );
    server.post("/object-types").json(&otd).await.assert_status_ok();

    let listed: Vec<grizabella_core::types::ObjectTypeDefinition> =
        server.get("/object-types").await.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Book");

    let created = server
        .post("/objects")
        .json(&json!({
            "object_type_name": "Book",
            "properties": {"title": {"type": "text", "value": "1984"}}
        }))
        .await;
    created.assert_status_ok();
    let created_obj: grizabella_core::types::ObjectInstance = created.json();

    let fetched = server
        .get(&format!("/objects/Book/{}", created_obj.id()))
        .await;
    fetched.assert_status_ok();
    let fetched_obj: Option<grizabella_core::types::ObjectInstance> = fetched.json();
    assert!(fetched_obj.is_some());
}

#[tokio::test]
async fn unknown_object_type_get_returns_schema_error_envelope() {
    let (server, _dir) = test_server().await;
    let response = server
        .get(&format!("/objects/Nonexistent/{}", uuid::Uuid::new_v4()))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["category"], "schema_error");
}

#[tokio::test]
async fn complex_query_with_relational_filter_returns_matching_objects() {
    let (server, _dir) = test_server().await;

    let otd = grizabella_core::types::ObjectTypeDefinition::new(
        "Paper",
        vec![Property::new("year", PropertyDataType::Integer)],
    );
    server.post("/object-types").json(&otd).await.assert_status_ok();

    server
        .post("/objects")
        .json(&json!({"object_type_name": "Paper", "properties": {"year": {"type": "integer", "value": 2023}}}))
        .await
        .assert_status_ok();
    server
        .post("/objects")
        .json(&json!({"object_type_name": "Paper", "properties": {"year": {"type": "integer", "value": 2020}}}))
        .await
        .assert_status_ok();

    let result = server
        .post("/query/complex")
        .json(&json!({
            "components": [{
                "object_type_name": "Paper",
                "relational_filters": [{"op": "eq", "property": "year", "value": {"type": "integer", "value": 2023}}]
            }]
        }))
        .await;
    result.assert_status_ok();
    let body: serde_json::Value = result.json();
    assert_eq!(body["objects"].as_array().unwrap().len(), 1);
}
