//! Shared token request/response types

use serde::{Deserialize, Serialize};

/// Which of the pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub token_type: TokenKind,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

/// Body of `POST /api/token`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/token/refresh`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Access + refresh tokens issued together
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}
