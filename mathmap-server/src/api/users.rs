//! User endpoints: CRUD, registration, current user

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use mathmap_common::db::User;
use serde::Serialize;
use tracing::info;

use super::auth::CurrentUser;
use super::parse_id;
use crate::db::users::{self, NewUser, UserChanges};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Response of the registration endpoint
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub refresh: String,
    pub access: String,
}

fn validate_username(username: &str) -> ApiResult<()> {
    if username.trim().is_empty() {
        return Err(ApiError::BadRequest("username: This field may not be blank.".to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> ApiResult<()> {
    if !email.contains('@') {
        return Err(ApiError::BadRequest("email: Enter a valid email address.".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.is_empty() {
        return Err(ApiError::BadRequest("password: This field may not be blank.".to_string()));
    }
    Ok(())
}

fn validate_new_user(user: &NewUser) -> ApiResult<()> {
    validate_username(&user.username)?;
    validate_email(&user.email)?;
    validate_password(&user.password)
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(users::list_users(&state.db).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(new_user) = payload?;
    validate_new_user(&new_user)?;

    let user = users::create_user(&state.db, &new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/users/register
///
/// Creates the account and returns it with a fresh token pair.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(new_user) = payload?;
    validate_new_user(&new_user)?;

    let user = users::create_user(&state.db, &new_user).await?;
    let tokens = state.tokens.issue_pair(user.id)?;
    info!(user = %user.username, "Registered new user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            refresh: tokens.refresh,
            access: tokens.access,
        }),
    ))
}

/// GET /api/users/me
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id, "User")?;
    users::get_user(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User".to_string()))
}

/// PUT/PATCH /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id, "User")?;
    let Json(changes) = payload?;

    if let Some(username) = &changes.username {
        validate_username(username)?;
    }
    if let Some(email) = &changes.email {
        validate_email(email)?;
    }
    if let Some(password) = &changes.password {
        validate_password(password)?;
    }

    users::update_user(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User".to_string()))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "User")?;
    if users::delete_user(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("User".to_string()))
    }
}
