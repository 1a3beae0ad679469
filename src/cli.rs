//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::chatbot::{ChatbotConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::db::Database;
use crate::jwt::{JwtConfig, MIN_SECRET_LENGTH, TokenLifetimes};
use crate::rate_limit::RateLimits;
use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing::{error, info};
use url::Url;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Jendo",
    about = "Health report tracking backend with token authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "JENDO_PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "JENDO_DATABASE", default_value = "jendo.db")]
    pub database: String,

    /// Directory where uploaded files are stored
    #[arg(long, env = "JENDO_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "JENDO_ACCESS_TOKEN_SECS", default_value_t = TokenLifetimes::default().access_secs)]
    pub access_token_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "JENDO_REFRESH_TOKEN_SECS", default_value_t = TokenLifetimes::default().refresh_secs)]
    pub refresh_token_secs: u64,

    /// API key for the chatbot upstream. Without one the chatbot answers with a notice
    #[arg(long, env = "CHATBOT_API_KEY", hide_env_values = true)]
    pub chatbot_api_key: Option<String>,

    /// Chat-completions endpoint of the chatbot upstream
    #[arg(long, env = "CHATBOT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub chatbot_endpoint: String,

    /// Model requested from the chatbot upstream
    #[arg(long, env = "CHATBOT_MODEL", default_value = DEFAULT_MODEL)]
    pub chatbot_model: String,

    /// Token refresh requests allowed per minute per client IP
    #[arg(long, env = "JENDO_REFRESH_PER_MINUTE", default_value = "10")]
    pub refresh_per_minute: NonZeroU32,

    /// Chatbot messages allowed per minute per client IP
    #[arg(long, env = "JENDO_CHATBOT_PER_MINUTE", default_value = "20")]
    pub chatbot_per_minute: NonZeroU32,

    /// Print an access and refresh token for this email on startup, creating the user if needed
    #[arg(long, value_name = "EMAIL")]
    pub issue_token: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: single-threaded during startup, nothing else reads this variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    check_secret_length(&secret).then_some(secret)
}

fn check_secret_length(secret: &str) -> bool {
    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            length = secret.len(),
            "JWT secret is shorter than {} bytes. Use a longer secret", MIN_SECRET_LENGTH
        );
        return false;
    }
    true
}

/// Parse and validate the chatbot endpoint URL.
/// Returns None and logs an error if validation fails.
pub fn validate_chatbot_endpoint(endpoint: &str) -> Option<Url> {
    let url = match Url::parse(endpoint) {
        Ok(url) => url,
        Err(e) => {
            error!(endpoint = %endpoint, error = %e, "Invalid chatbot endpoint URL");
            return None;
        }
    };

    if url.scheme() != "https" && url.scheme() != "http" {
        error!(endpoint = %endpoint, "Chatbot endpoint must be an http(s) URL");
        return None;
    }

    Some(url)
}

/// Handle --issue-token: make sure the user exists and print a token pair.
pub async fn handle_issue_token(
    db: &Database,
    jwt_secret: &str,
    lifetimes: TokenLifetimes,
    email: &str,
) -> Option<()> {
    let email = email.trim();
    if email.is_empty() {
        error!("--issue-token needs a non-empty email");
        return None;
    }

    let jwt = match JwtConfig::with_lifetimes(jwt_secret.as_bytes(), lifetimes) {
        Ok(jwt) => jwt,
        Err(e) => {
            error!(error = %e, "Invalid JWT configuration");
            return None;
        }
    };

    let user = match db.users().get_or_create(email).await {
        Ok(user) => user,
        Err(e) => {
            error!(email = %email, error = %e, "Failed to create user");
            return None;
        }
    };

    let tokens = jwt
        .generate_access_token(&user.email, user.id)
        .and_then(|access| Ok((access, jwt.generate_refresh_token(&user.email, user.id)?)));
    match tokens {
        Ok((access, refresh)) => {
            println!();
            println!("User: {} (id {})", user.email, user.id);
            println!("Access token: {}", access.token);
            println!("Refresh token: {}", refresh.token);
            println!();
            Some(())
        }
        Err(e) => {
            error!(error = %e, "Failed to generate tokens");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    chatbot_endpoint: Url,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        lifetimes: lifetimes(args),
        upload_root: args.upload_dir.clone(),
        chatbot: ChatbotConfig::new(
            args.chatbot_api_key.clone(),
            chatbot_endpoint,
            args.chatbot_model.clone(),
        ),
        rate_limits: RateLimits {
            refresh_per_minute: args.refresh_per_minute,
            chatbot_per_minute: args.chatbot_per_minute,
        },
    }
}

pub fn lifetimes(args: &Args) -> TokenLifetimes {
    TokenLifetimes {
        access_secs: args.access_token_secs,
        refresh_secs: args.refresh_token_secs,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["jendo"]).unwrap();
        assert_eq!(args.database, "jendo.db");
        assert_eq!(args.access_token_secs, 24 * 60 * 60);
        assert_eq!(args.refresh_token_secs, 7 * 24 * 60 * 60);
        assert_eq!(args.chatbot_endpoint, DEFAULT_ENDPOINT);
        assert!(args.issue_token.is_none());
    }

    #[test]
    fn test_args_issue_token() {
        let args =
            Args::try_parse_from(["jendo", "--issue-token", "alice@example.com", "-p", "9000"])
                .unwrap();
        assert_eq!(args.issue_token.as_deref(), Some("alice@example.com"));
        assert_eq!(args.port, 9000);
    }

    #[test]
    fn test_secret_length_check() {
        assert!(!check_secret_length("short"));
        assert!(check_secret_length(&"x".repeat(MIN_SECRET_LENGTH)));
    }

    #[test]
    fn test_validate_chatbot_endpoint() {
        assert!(validate_chatbot_endpoint("https://example.com/v1/chat/completions").is_some());
        assert!(validate_chatbot_endpoint("ftp://example.com").is_none());
        assert!(validate_chatbot_endpoint("not a url").is_none());
    }
}
