/// JWT token issuance and validation
///
/// Access and refresh tokens are both HS256-signed JWTs carrying the user id.
/// They differ only by lifetime and by the `token_type` claim, which keeps a
/// refresh token from authenticating API calls and an access token from
/// being used to rotate a session.
///
/// # Claims
///
/// - `uid`: User ID
/// - `iat`: Issued at (Unix timestamp)
/// - `exp`: Expiration (Unix timestamp)
/// - `jti`: Random token ID, so two tokens minted in the same second differ
/// - `token_type`: `access` or `refresh`
///
/// Validation runs with zero leeway: a token is rejected from its `exp`
/// second onwards.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claims are invalid
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is valid but of the wrong kind
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub uid: Uuid,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token ID
    pub jti: Uuid,

    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims expiring `ttl` from now
    pub fn new(user_id: Uuid, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            uid: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues an access token for `user_id`, valid for `ttl`
pub fn issue_access_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, JwtError> {
    sign(&Claims::new(user_id, TokenType::Access, ttl), secret)
}

/// Issues a refresh token for `user_id`, valid for `ttl`
///
/// The token is opaque to callers; it is persisted on the user and compared
/// byte-for-byte on refresh.
pub fn issue_refresh_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, JwtError> {
    sign(&Claims::new(user_id, TokenType::Refresh, ttl), secret)
}

/// Verifies signature and expiry, and decodes the claims
///
/// Fails on a bad signature, an expired token or malformed claims. Does not
/// look at `token_type`.
pub fn parse_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "iat"]);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}

fn expect_type(claims: Claims, expected: TokenType) -> Result<Claims, JwtError> {
    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }
    Ok(claims)
}

/// Parses a token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    expect_type(parse_token(token, secret)?, TokenType::Access)
}

/// Parses a token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    expect_type(parse_token(token, secret)?, TokenType::Refresh)
}

/// Freshly minted access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Signing secret plus token lifetimes, shared by the auth workflows and the
/// authentication middleware
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issues a new access token and refresh token for `user_id`
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, JwtError> {
        let access_token = issue_access_token(user_id, &self.secret, self.access_ttl)?;
        let refresh_claims = Claims::new(user_id, TokenType::Refresh, self.refresh_ttl);
        let refresh_expires_at = refresh_claims
            .expires_at()
            .ok_or_else(|| JwtError::CreateError("refresh expiry out of range".to_string()))?;
        let refresh_token = sign(&refresh_claims, &self.secret)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_expires_at,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        validate_access_token(token, &self.secret)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        validate_refresh_token(token, &self.secret)
    }
}
