//! Bearer-token authentication middleware
//!
//! Protected routes require `Authorization: Bearer <access token>`. The
//! authenticated user is placed in request extensions as [`CurrentUser`].

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use mathmap_common::api::{ApiAuthError, TokenKind};
use mathmap_common::db::User;
use tracing::debug;

use crate::db::users::get_user;
use crate::error::ApiError;
use crate::AppState;

/// User resolved from the access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract the token from an `Authorization: Bearer ...` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiAuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiAuthError::MissingToken)?
        .to_str()
        .map_err(|_| ApiAuthError::InvalidToken("header is not valid ASCII".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| ApiAuthError::InvalidToken("expected 'Bearer <token>'".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiAuthError::InvalidToken(
            "expected 'Bearer <token>'".to_string(),
        ));
    }

    Ok(token.trim())
}

/// Authentication middleware
///
/// Returns 401 when the token is missing, invalid, expired, a refresh token,
/// or names a user that no longer exists.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let user_id = state.tokens.verify(token, TokenKind::Access)?;

    let user = get_user(&state.db, user_id).await?.ok_or_else(|| {
        ApiAuthError::InvalidToken("user not found".to_string())
    })?;

    debug!(user = %user.username, "Request authenticated");
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
