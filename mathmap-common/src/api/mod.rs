//! API module for shared HTTP API functionality
//!
//! Provides password hashing, bearer-token issuance/verification and the
//! request/response types of the token endpoints.
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! The server wraps these with axum middleware and handlers.

pub mod auth;
pub mod types;

pub use auth::{
    hash_password, initialize_signing_secret, load_signing_secret, verify_password, ApiAuthError,
    TokenSigner,
};
pub use types::{Claims, RefreshRequest, TokenKind, TokenPair, TokenRequest};
