mod common;

use axum::http::{StatusCode, header};
use common::{TestApp, bytes_body, create_test_app, json_body};
use jendo::files::JENDO_REPORTS;

const PDF: &[u8] = b"%PDF-1.4 test report";

async fn upload_pdf(app: &TestApp, token: &str, name: &str, fields: &[(&str, &str)]) -> serde_json::Value {
    let response = app
        .upload(
            "/api/jendo-reports/upload",
            token,
            Some((name, "application/pdf", PDF)),
            fields,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn test_upload_report() {
    let app = create_test_app().await;
    let (user_id, token) = app.login("alice@example.com").await;

    let json = upload_pdf(&app, &token, "jendo.pdf", &[("description", "Annual test")]).await;
    assert_eq!(json["userId"], user_id);
    assert_eq!(json["originalFileName"], "jendo.pdf");
    assert_eq!(json["contentType"], "application/pdf");
    assert_eq!(json["fileSize"], PDF.len());
    assert_eq!(json["description"], "Annual test");
    assert_eq!(
        json["downloadUrl"],
        format!("/api/jendo-reports/{}/download", json["id"])
    );

    let stored = json["fileName"].as_str().unwrap();
    assert!(stored.ends_with("_jendo.pdf"));
    assert_eq!(app.stored_files(JENDO_REPORTS), 1);
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let app = create_test_app().await;
    let (_, token) = app.login("alice@example.com").await;

    let response = app
        .upload(
            "/api/jendo-reports/upload",
            &token,
            Some(("notes.txt", "text/plain", b"hello".as_slice())),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .upload(
            "/api/jendo-reports/upload",
            &token,
            Some(("empty.pdf", "application/pdf", b"".as_slice())),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(JENDO_REPORTS), 0);
}

#[tokio::test]
async fn test_upload_user_id_must_match_caller() {
    let app = create_test_app().await;
    let (alice_id, alice) = app.login("alice@example.com").await;
    let (bob_id, _) = app.login("bob@example.com").await;

    let response = app
        .upload(
            "/api/jendo-reports/upload",
            &alice,
            Some(("r.pdf", "application/pdf", PDF)),
            &[("userId", bob_id.to_string().as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.stored_files(JENDO_REPORTS), 0);

    let json = upload_pdf(&app, &alice, "r.pdf", &[("userId", alice_id.to_string().as_str())]).await;
    assert_eq!(json["userId"], alice_id);
}

#[tokio::test]
async fn test_list_newest_first_and_scoped() {
    let app = create_test_app().await;
    let (alice_id, alice) = app.login("alice@example.com").await;
    let (_, bob) = app.login("bob@example.com").await;

    let older = upload_pdf(&app, &alice, "first.pdf", &[]).await;
    let newer = upload_pdf(&app, &alice, "second.pdf", &[]).await;

    let response = app
        .get(&format!("/api/jendo-reports/user/{}", alice_id), &alice)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let reports = json.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["id"], newer["id"]);
    assert_eq!(reports[1]["id"], older["id"]);

    let response = app
        .get(&format!("/api/jendo-reports/user/{}", alice_id), &bob)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_requires_owner() {
    let app = create_test_app().await;
    let (_, alice) = app.login("alice@example.com").await;
    let (_, bob) = app.login("bob@example.com").await;
    let report = upload_pdf(&app, &alice, "mine.pdf", &[]).await;
    let url = report["downloadUrl"].as_str().unwrap();

    let response = app.get(url, &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get(&format!("/api/jendo-reports/{}", report["id"]), &bob)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get(url, &alice).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"mine.pdf\""
    );
    assert_eq!(bytes_body(response).await, PDF);
}

#[tokio::test]
async fn test_delete_report() {
    let app = create_test_app().await;
    let (_, alice) = app.login("alice@example.com").await;
    let (_, bob) = app.login("bob@example.com").await;
    let report = upload_pdf(&app, &alice, "gone.pdf", &[]).await;
    let uri = format!("/api/jendo-reports/{}", report["id"]);

    let response = app.delete(&uri, &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.stored_files(JENDO_REPORTS), 1);

    let response = app.delete(&uri, &alice).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.stored_files(JENDO_REPORTS), 0);

    let response = app.get(&uri, &alice).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .get(report["downloadUrl"].as_str().unwrap(), &alice)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
