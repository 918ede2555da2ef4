//! Password hashing and bearer-token primitives
//!
//! # Architecture
//!
//! - Passwords are stored as Argon2id PHC strings (salt and parameters inline)
//! - Access/refresh tokens are HS256 JWTs signed with one secret
//! - The secret comes from configuration, or is generated once and kept in
//!   the `settings` table so tokens survive restarts
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies. The axum middleware lives in the server.

use super::types::{Claims, TokenKind, TokenPair};
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Settings key holding the generated signing secret
const SIGNING_SECRET_KEY: &str = "jwt_signing_secret";

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAuthError {
    /// No bearer token in the request
    MissingToken,

    /// Token signature, format or claims are invalid
    InvalidToken(String),

    /// Token lifetime is over
    Expired,

    /// A refresh token was used where an access token is required, or vice versa
    WrongTokenKind { expected: TokenKind },

    /// Username/password combination rejected
    InvalidCredentials,

    /// Database error loading the signing secret
    DatabaseError(String),

    /// Token could not be signed
    SigningError(String),

    /// Password could not be hashed
    HashingError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::MissingToken => write!(f, "Authentication credentials were not provided"),
            ApiAuthError::InvalidToken(reason) => write!(f, "Token is invalid: {}", reason),
            ApiAuthError::Expired => write!(f, "Token is expired"),
            ApiAuthError::WrongTokenKind { expected } => {
                write!(f, "Token has wrong type (expected {:?})", expected)
            }
            ApiAuthError::InvalidCredentials => {
                write!(f, "No active account found with the given credentials")
            }
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
            ApiAuthError::SigningError(err) => write!(f, "Token signing failed: {}", err),
            ApiAuthError::HashingError(err) => write!(f, "Password hashing failed: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Signing Secret Management
// ========================================

/// Load the token signing secret from database settings
///
/// Generates and stores a new secret when none exists.
pub async fn load_signing_secret(db: &SqlitePool) -> Result<String, ApiAuthError> {
    let result: Option<(Option<String>,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(SIGNING_SECRET_KEY)
            .fetch_optional(db)
            .await
            .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match result {
        Some((Some(value),)) if !value.is_empty() => Ok(value),
        _ => initialize_signing_secret(db).await,
    }
}

/// Generate a random 64-character secret and store it
pub async fn initialize_signing_secret(db: &SqlitePool) -> Result<String, ApiAuthError> {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SIGNING_SECRET_KEY)
        .bind(&secret)
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Password Hashing
// ========================================

/// Hash a password into an Argon2id PHC string (salt embedded)
///
/// # Examples
///
/// ```
/// use mathmap_common::api::auth::{hash_password, verify_password};
///
/// let hash = hash_password("testpass123").unwrap();
/// assert!(verify_password("testpass123", &hash));
/// assert!(!verify_password("wrong", &hash));
/// ```
pub fn hash_password(password: &str) -> Result<String, ApiAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiAuthError::HashingError(e.to_string()))
}

/// Check a password against a stored PHC string
///
/// Unparsable stored hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ========================================
// Bearer Tokens
// ========================================

/// Issues and verifies access/refresh tokens
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue a fresh access + refresh pair for a user
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, ApiAuthError> {
        Ok(TokenPair {
            refresh: self.issue(user_id, TokenKind::Refresh)?,
            access: self.issue(user_id, TokenKind::Access)?,
        })
    }

    /// Issue a single token of the given kind
    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, ApiAuthError> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            token_type: kind,
            iat: now,
            exp: now + ttl,
            jti: Uuid::new_v4().simple().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiAuthError::SigningError(e.to_string()))
    }

    /// Verify signature, expiry and kind; returns the user id
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Uuid, ApiAuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ApiAuthError::Expired,
                _ => ApiAuthError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.token_type != expected {
            return Err(ApiAuthError::WrongTokenKind { expected });
        }

        Uuid::parse_str(&data.claims.sub)
            .map_err(|e| ApiAuthError::InvalidToken(format!("bad subject: {}", e)))
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> Result<String, ApiAuthError> {
        let user_id = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue(user_id, TokenKind::Access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", 300, 86400)
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
    }

    #[test]
    fn test_same_password_different_salt() {
        let hash_a = hash_password("same").unwrap();
        let hash_b = hash_password("same").unwrap();
        assert_ne!(hash_a, hash_b);
        assert!(verify_password("same", &hash_a));
        assert!(verify_password("same", &hash_b));
    }

    #[test]
    fn test_malformed_stored_hash_never_matches() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[test]
    fn test_access_token_verifies() {
        let signer = signer();
        let user = Uuid::new_v4();
        let pair = signer.issue_pair(user).unwrap();

        assert_eq!(signer.verify(&pair.access, TokenKind::Access).unwrap(), user);
        assert_eq!(signer.verify(&pair.refresh, TokenKind::Refresh).unwrap(), user);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let signer = signer();
        let pair = signer.issue_pair(Uuid::new_v4()).unwrap();

        assert_eq!(
            signer.verify(&pair.refresh, TokenKind::Access),
            Err(ApiAuthError::WrongTokenKind {
                expected: TokenKind::Access
            })
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = TokenSigner::new("test-secret", -10, -10);
        let token = signer.issue(Uuid::new_v4(), TokenKind::Access).unwrap();

        assert_eq!(signer.verify(&token, TokenKind::Access), Err(ApiAuthError::Expired));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenSigner::new("other-secret", 300, 300);
        let token = other.issue(Uuid::new_v4(), TokenKind::Access).unwrap();

        assert!(matches!(
            signer().verify(&token, TokenKind::Access),
            Err(ApiAuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_refresh_issues_access() {
        let signer = signer();
        let user = Uuid::new_v4();
        let pair = signer.issue_pair(user).unwrap();

        let access = signer.refresh(&pair.refresh).unwrap();
        assert_eq!(signer.verify(&access, TokenKind::Access).unwrap(), user);
        assert!(signer.refresh(&pair.access).is_err());
    }

    #[tokio::test]
    async fn test_signing_secret_persists() {
        let pool = crate::db::init_memory_database().await.unwrap();

        let first = load_signing_secret(&pool).await.unwrap();
        let second = load_signing_secret(&pool).await.unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }
}
