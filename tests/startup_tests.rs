mod common;

use common::{TEST_SECRET, test_config};
use jendo::{StartupError, create_app, db::Database, start_server};

#[tokio::test]
async fn test_short_secret_rejected() {
    let db = Database::open(":memory:").await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(db, &dir);
    config.jwt_secret = b"too-short".to_vec();

    assert!(matches!(create_app(&config), Err(StartupError::Jwt(_))));
}

#[tokio::test]
async fn test_upload_root_must_be_a_directory() {
    let db = Database::open(":memory:").await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("uploads");
    std::fs::write(&not_a_dir, b"file").unwrap();

    let mut config = test_config(db, &dir);
    config.upload_root = not_a_dir;

    assert!(matches!(create_app(&config), Err(StartupError::Storage(_))));
}

#[tokio::test]
async fn test_server_serves_api_over_tcp() {
    let db = Database::open(":memory:").await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let user = db.users().get_or_create("alice@example.com").await.unwrap();
    let jwt = jendo::jwt::JwtConfig::new(TEST_SECRET).unwrap();
    let token = jwt.generate_access_token(&user.email, user.id).unwrap();

    let (handle, addr) = start_server(test_config(db, &dir), 0).await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/api/auth/me", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("http://{}/api/auth/me", addr))
        .bearer_auth(&token.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["email"], "alice@example.com");

    handle.abort();
}
