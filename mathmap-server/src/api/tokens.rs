//! Token obtain / refresh endpoints

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use mathmap_common::api::{ApiAuthError, RefreshRequest, TokenPair, TokenRequest};
use serde::Serialize;
use tracing::info;

use crate::db::users::authenticate;
use crate::error::ApiResult;
use crate::AppState;

/// Response of the refresh endpoint
#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// POST /api/token
///
/// Exchanges username/password for an access + refresh pair.
pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(request) = payload?;

    let user = authenticate(&state.db, &request.username, &request.password)
        .await?
        .ok_or(ApiAuthError::InvalidCredentials)?;

    info!(user = %user.username, "Issued token pair");
    Ok(Json(state.tokens.issue_pair(user.id)?))
}

/// POST /api/token/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<AccessToken>> {
    let Json(request) = payload?;

    Ok(Json(AccessToken {
        access: state.tokens.refresh(&request.refresh)?,
    }))
}
