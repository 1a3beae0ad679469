//! JWT token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Minimum length of the HMAC signing secret in bytes (HS512 block size).
pub const MIN_SECRET_LENGTH: usize = 64;

/// Default access token lifetime: 24 hours
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// Default refresh token lifetime: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token authorizing API calls
    Access,
    /// Long-lived token only accepted by the refresh endpoint
    Refresh,
}

/// JWT claims shared by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Database user ID
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Email, only present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Token type
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Identity carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub email: String,
    pub user_id: i64,
    pub token_type: TokenType,
}

/// Token lifetimes in seconds.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access_secs: u64,
    pub refresh_secs: u64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_secs: ACCESS_TOKEN_DURATION_SECS,
            refresh_secs: REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

/// Result of generating a token.
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetimes: TokenLifetimes,
}

impl JwtConfig {
    /// Create a JWT configuration with default lifetimes.
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        Self::with_lifetimes(secret, TokenLifetimes::default())
    }

    /// Create a JWT configuration. Secrets shorter than [`MIN_SECRET_LENGTH`] are rejected.
    pub fn with_lifetimes(secret: &[u8], lifetimes: TokenLifetimes) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::SecretTooShort(secret.len()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetimes,
        })
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, email: &str, user_id: i64) -> Result<TokenResult, JwtError> {
        self.generate(email, user_id, TokenType::Access, self.lifetimes.access_secs)
    }

    /// Generate a refresh token for a user.
    pub fn generate_refresh_token(
        &self,
        email: &str,
        user_id: i64,
    ) -> Result<TokenResult, JwtError> {
        self.generate(email, user_id, TokenType::Refresh, self.lifetimes.refresh_secs)
    }

    fn generate(
        &self,
        email: &str,
        user_id: i64,
        token_type: TokenType,
        duration: u64,
    ) -> Result<TokenResult, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let exp = now + duration;

        let claims = Claims {
            sub: email.to_string(),
            user_id,
            email: (token_type == TokenType::Access).then(|| email.to_string()),
            token_type,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(TokenResult {
            token,
            issued_at: now,
            expires_at: exp,
            duration,
        })
    }

    /// Decode and verify signature and expiry, without checking the token type.
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::Decoding)
    }

    /// Whether the token has a valid signature and is not expired.
    pub fn validate(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }

    /// Identity carried by the token, or `None` if the token is invalid.
    pub fn identity_of(&self, token: &str) -> Option<TokenIdentity> {
        let claims = self.decode(token).ok()?;
        Some(TokenIdentity {
            email: claims.sub,
            user_id: claims.user_id,
            token_type: claims.token_type,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Signing secret is shorter than the minimum (actual length attached)
    SecretTooShort(usize),
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::SecretTooShort(len) => write!(
                f,
                "JWT secret is {} bytes, at least {} required",
                len, MIN_SECRET_LENGTH
            ),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-for-testing-that-is-long-enough-for-hs512-signing!";

    fn config() -> JwtConfig {
        JwtConfig::new(SECRET).unwrap()
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn test_access_token_identity_round_trip() {
        let config = config();

        let result = config.generate_access_token("alice@example.com", 42).unwrap();
        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        assert!(config.validate(&result.token));
        let identity = config.identity_of(&result.token).unwrap();
        assert_eq!(
            identity,
            TokenIdentity {
                email: "alice@example.com".to_string(),
                user_id: 42,
                token_type: TokenType::Access,
            }
        );

        let claims = config.validate_access_token(&result.token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_refresh_token_has_refresh_type_and_longer_expiry() {
        let config = config();

        let result = config.generate_refresh_token("alice@example.com", 42).unwrap();
        assert_eq!(result.duration, REFRESH_TOKEN_DURATION_SECS);
        assert_eq!(result.expires_at - result.issued_at, REFRESH_TOKEN_DURATION_SECS);

        let claims = config.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let config = config();

        let access = config.generate_access_token("alice@example.com", 1).unwrap();
        let refresh = config.generate_refresh_token("alice@example.com", 1).unwrap();

        assert!(matches!(
            config.validate_refresh_token(&access.token),
            Err(JwtError::WrongTokenType)
        ));
        assert!(matches!(
            config.validate_access_token(&refresh.token),
            Err(JwtError::WrongTokenType)
        ));

        // Both are still well-formed tokens
        assert!(config.validate(&refresh.token));
    }

    #[test]
    fn test_custom_lifetimes() {
        let config = JwtConfig::with_lifetimes(
            SECRET,
            TokenLifetimes {
                access_secs: 60,
                refresh_secs: 120,
            },
        )
        .unwrap();

        let access = config.generate_access_token("a@b.c", 1).unwrap();
        assert_eq!(access.expires_at - access.issued_at, 60);
        let refresh = config.generate_refresh_token("a@b.c", 1).unwrap();
        assert_eq!(refresh.expires_at - refresh.issued_at, 120);
    }

    #[test]
    fn test_invalid_token() {
        let config = config();

        assert!(!config.validate("invalid-token"));
        assert!(config.identity_of("invalid-token").is_none());
        assert!(!config.validate(""));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = config();
        let config2 = JwtConfig::new(&[b'x'; 64]).unwrap();

        let result = config1.generate_access_token("alice@example.com", 1).unwrap();

        assert!(!config2.validate(&result.token));
        assert!(config2.identity_of(&result.token).is_none());
    }

    #[test]
    fn test_expired_token() {
        let encoding_key = EncodingKey::from_secret(SECRET);
        let now = now();

        let claims = Claims {
            sub: "alice@example.com".to_string(),
            user_id: 1,
            email: Some("alice@example.com".to_string()),
            token_type: TokenType::Access,
            iat: now - 100,
            exp: now - 50,
        };

        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &encoding_key).unwrap();

        let config = config();
        assert!(!config.validate(&token));
        assert!(config.identity_of(&token).is_none());
        assert!(config.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = JwtConfig::new(b"too-short");
        assert!(matches!(result, Err(JwtError::SecretTooShort(9))));

        assert!(JwtConfig::new(&[b'k'; MIN_SECRET_LENGTH]).is_ok());
        assert!(JwtConfig::new(&[b'k'; MIN_SECRET_LENGTH - 1]).is_err());
    }
}
