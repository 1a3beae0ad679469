pub mod api;
pub mod attachments;
pub mod auth;
pub mod chatbot;
pub mod cli;
pub mod db;
pub mod files;
pub mod jwt;
pub mod rate_limit;

use api::create_api_router;
use attachments::Attachments;
use axum::Router;
use chatbot::{Chatbot, ChatbotConfig};
use db::Database;
use files::{FileStore, StorageError};
use jwt::{JwtConfig, JwtError, TokenLifetimes};
use rate_limit::{RateLimitConfig, RateLimits};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens, at least 64 bytes
    pub jwt_secret: Vec<u8>,
    pub lifetimes: TokenLifetimes,
    /// Root directory for uploaded files
    pub upload_root: PathBuf,
    pub chatbot: ChatbotConfig,
    pub rate_limits: RateLimits,
}

/// Errors that prevent the application from being built.
#[derive(Debug)]
pub enum StartupError {
    Jwt(JwtError),
    HttpClient(reqwest::Error),
    Storage(StorageError),
    Io(std::io::Error),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Jwt(e) => write!(f, "Invalid JWT configuration: {}", e),
            StartupError::HttpClient(e) => write!(f, "Failed to build HTTP client: {}", e),
            StartupError::Storage(e) => write!(f, "Upload directory unusable: {}", e),
            StartupError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<JwtError> for StartupError {
    fn from(e: JwtError) -> Self {
        StartupError::Jwt(e)
    }
}

impl From<reqwest::Error> for StartupError {
    fn from(e: reqwest::Error) -> Self {
        StartupError::HttpClient(e)
    }
}

impl From<StorageError> for StartupError {
    fn from(e: StorageError) -> Self {
        StartupError::Storage(e)
    }
}

impl From<std::io::Error> for StartupError {
    fn from(e: std::io::Error) -> Self {
        StartupError::Io(e)
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, StartupError> {
    let jwt = Arc::new(JwtConfig::with_lifetimes(
        &config.jwt_secret,
        config.lifetimes,
    )?);

    let files = FileStore::new(config.upload_root.clone())?;
    let attachments = Attachments::new(config.db.clone(), files);
    let chatbot = Chatbot::new(config.chatbot.clone())?;
    let rate_limits = Arc::new(RateLimitConfig::new(config.rate_limits));

    let api_router = create_api_router(config.db.clone(), jwt, attachments, chatbot, rate_limits);

    Ok(Router::new().nest("/api", api_router))
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), StartupError> {
    let app = create_app(&config)?;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, make_service).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
