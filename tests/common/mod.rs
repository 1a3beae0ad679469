//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use jendo::{
    ServerConfig,
    chatbot::ChatbotConfig,
    create_app,
    db::Database,
    jwt::{JwtConfig, TokenLifetimes},
    rate_limit::RateLimits,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] =
    b"test-jwt-secret-that-is-long-enough-for-hs512-signing-0123456789abcdef";

pub const BOUNDARY: &str = "jendo-test-boundary";

/// A router plus handles to everything behind it.
pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub upload_dir: TempDir,
}

impl TestApp {
    /// Create a user and return its id with a valid access token.
    pub async fn login(&self, email: &str) -> (i64, String) {
        let user = self.db.users().get_or_create(email).await.unwrap();
        let token = self.jwt.generate_access_token(&user.email, user.id).unwrap();
        (user.id, token.token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(authed("GET", uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(authed("DELETE", uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send_json("POST", uri, token, body).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send_json("PUT", uri, token, body).await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(
            authed(method, uri, token)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST a multipart form with one file part and optional text fields.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        file: Option<(&str, &str, &[u8])>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        self.send(
            authed("POST", uri, token)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(file, fields)))
                .unwrap(),
        )
        .await
    }

    /// Number of files stored under an upload category.
    pub fn stored_files(&self, category: &str) -> usize {
        std::fs::read_dir(self.upload_dir.path().join(category))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    if token.is_empty() {
        builder
    } else {
        builder.header("authorization", format!("Bearer {}", token))
    }
}

/// Build a multipart/form-data body. `file` is (file name, content type, bytes).
pub fn multipart_body(file: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn bytes_body(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn test_config(db: Database, upload_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        lifetimes: TokenLifetimes::default(),
        upload_root: upload_dir.path().to_path_buf(),
        chatbot: ChatbotConfig::disabled(),
        rate_limits: RateLimits::default(),
    }
}

/// Create a test app with an in-memory database and a temporary upload root.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Like [`create_test_app`], with a hook to adjust the configuration.
pub async fn create_test_app_with(adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

    let mut config = test_config(db.clone(), &upload_dir);
    adjust(&mut config);

    let app = create_app(&config).expect("Failed to build app");
    let jwt = JwtConfig::with_lifetimes(&config.jwt_secret, config.lifetimes).unwrap();

    TestApp {
        app,
        db,
        jwt,
        upload_dir,
    }
}
