mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_app, json_body};
use jendo::db::{ItemInput, ValueInput};
use rust_decimal::Decimal;
use serde_json::json;

async fn create_item(app: &TestApp, name: &str) -> i64 {
    app.db
        .items()
        .create(&ItemInput {
            name: name.into(),
            description: None,
            icon: None,
            section_id: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_value() {
    let app = create_test_app().await;
    let (user_id, token) = app.login("alice@example.com").await;
    let item_id = create_item(&app, "Blood pressure").await;

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({
                "reportItemId": item_id,
                "valueNumber": 120.5,
                "valueText": "after lunch",
                "valueDate": "2024-01-15"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = json_body(response).await;
    assert_eq!(json["userId"], user_id);
    assert_eq!(json["reportItemId"], item_id);
    assert_eq!(json["reportItemName"], "Blood pressure");
    assert_eq!(json["valueNumber"], 120.5);
    assert_eq!(json["valueText"], "after lunch");
    assert_eq!(json["valueDate"], "2024-01-15");
    assert_eq!(json["attachments"], json!([]));
}

#[tokio::test]
async fn test_create_value_requires_existing_item() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;

    let response = app
        .post_json("/api/report-values", &token, json!({ "valueNumber": 1 }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({ "reportItemId": 999, "valueNumber": 1 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_values_require_authentication() {
    let app = create_test_app().await;

    let response = app.get("/api/report-values", "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_requires_owner() {
    let app = create_test_app().await;
    let (alice_id, alice) = app.login("alice@example.com").await;
    let (_, bob) = app.login("bob@example.com").await;
    let item_id = create_item(&app, "Glucose").await;

    let value_id = app
        .db
        .values()
        .create(
            alice_id,
            &ValueInput {
                report_item_id: item_id,
                value_number: Some(Decimal::new(54, 1)),
                value_text: None,
                value_date: None,
            },
        )
        .await
        .unwrap();

    let payload = json!({ "reportItemId": item_id, "valueNumber": 6.1 });
    let uri = format!("/api/report-values/{}", value_id);

    let response = app.put_json(&uri, &bob, payload.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get(&uri, &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete(&uri, &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.put_json(&uri, &alice, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["valueNumber"], 6.1);
    assert_eq!(json["userId"], alice_id);
}

#[tokio::test]
async fn test_update_can_move_to_other_item() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;
    let first = create_item(&app, "Weight").await;
    let second = create_item(&app, "Height").await;

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({ "reportItemId": first, "valueNumber": 70 }),
        )
        .await;
    let id = json_body(response).await["id"].as_i64().unwrap();
    let uri = format!("/api/report-values/{}", id);

    let response = app
        .put_json(&uri, &token, json!({ "reportItemId": 12345 }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .put_json(&uri, &token, json!({ "reportItemId": second, "valueNumber": 180 }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["reportItemName"], "Height");
}

#[tokio::test]
async fn test_listings_are_scoped_to_caller() {
    let app = create_test_app().await;
    let (alice_id, alice) = app.login("alice@example.com").await;
    let (bob_id, bob) = app.login("bob@example.com").await;
    let weight = create_item(&app, "Weight").await;
    let pulse = create_item(&app, "Pulse").await;

    for (token, item, number) in [
        (&alice, weight, 70.0),
        (&alice, pulse, 62.0),
        (&bob, weight, 85.0),
    ] {
        let response = app
            .post_json(
                "/api/report-values",
                token,
                json!({ "reportItemId": item, "valueNumber": number }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.get("/api/report-values", &alice).await;
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app
        .get(&format!("/api/report-values/user/{}", alice_id), &alice)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);

    let response = app
        .get(&format!("/api/report-values/user/{}", bob_id), &alice)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get(&format!("/api/report-values/item/{}", weight), &alice)
        .await;
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["valueNumber"], 70.0);

    let response = app
        .get(
            &format!("/api/report-values/user/{}/item/{}", bob_id, weight),
            &bob,
        )
        .await;
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["valueNumber"], 85.0);

    let response = app
        .get(
            &format!("/api/report-values/user/{}/item/{}", bob_id, weight),
            &alice,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_value() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;
    let item_id = create_item(&app, "Pulse").await;

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({ "reportItemId": item_id, "valueNumber": 60 }),
        )
        .await;
    let id = json_body(response).await["id"].as_i64().unwrap();
    let uri = format!("/api/report-values/{}", id);

    let response = app.delete(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.delete(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_without_item_keeps_current_item() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;
    let item_id = create_item(&app, "Glucose").await;

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({ "reportItemId": item_id, "valueNumber": 5, "valueText": "fasting" }),
        )
        .await;
    let id = json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .put_json(
            &format!("/api/report-values/{}", id),
            &token,
            json!({ "valueNumber": 6 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["reportItemId"], item_id);
    assert_eq!(json["reportItemName"], "Glucose");
    assert_eq!(json["valueNumber"], 6.0);
    assert!(json["valueText"].is_null());
}

#[tokio::test]
async fn test_value_number_is_exact() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;
    let item_id = create_item(&app, "Cholesterol").await;

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({ "reportItemId": item_id, "valueNumber": 0.1 }),
        )
        .await;
    let id = json_body(response).await["id"].as_i64().unwrap();

    let value = app.db.values().get(id).await.unwrap().unwrap();
    assert_eq!(value.value_number, Some(Decimal::new(1, 1)));
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;
    let item_id = create_item(&app, "Pulse").await;

    let response = app.get("/api/report-values/abc", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let response = app
        .post_json(
            "/api/report-values",
            &token,
            json!({ "reportItemId": item_id, "valueDate": "15/01/2024" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let response = app.get("/api/doctors?page=first", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}
