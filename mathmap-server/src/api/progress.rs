//! User progress endpoints
//!
//! Every detail route resolves to the caller's own row, whatever id is in the
//! path; the row is created on first access.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use mathmap_common::db::UserProgressView;

use super::auth::CurrentUser;
use crate::db::progress::{self, ProgressChanges};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn validate_changes(changes: &ProgressChanges) -> ApiResult<()> {
    let fields = [
        ("total_practices", changes.total_practices),
        ("correct_practices", changes.correct_practices),
        ("total_time_spent", changes.total_time_spent),
    ];
    for (name, value) in fields {
        if matches!(value, Some(v) if v < 0) {
            return Err(ApiError::BadRequest(format!(
                "{}: Ensure this value is greater than or equal to 0.",
                name
            )));
        }
    }
    Ok(())
}

/// GET /api/user-progress
pub async fn list_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserProgressView>>> {
    let progress = progress::get_or_create_progress(&state.db, user.id).await?;
    Ok(Json(vec![progress.into()]))
}

/// GET /api/user-progress/:id
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(_id): Path<String>,
) -> ApiResult<Json<UserProgressView>> {
    let progress = progress::get_or_create_progress(&state.db, user.id).await?;
    Ok(Json(progress.into()))
}

/// PUT/PATCH /api/user-progress/:id
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(_id): Path<String>,
    payload: Result<Json<ProgressChanges>, JsonRejection>,
) -> ApiResult<Json<UserProgressView>> {
    let Json(changes) = payload?;
    validate_changes(&changes)?;

    let progress = progress::update_progress(&state.db, user.id, &changes).await?;
    Ok(Json(progress.into()))
}

/// DELETE /api/user-progress/:id
pub async fn delete_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(_id): Path<String>,
) -> ApiResult<StatusCode> {
    // A missing row counts as deleted; the next read recreates it
    progress::delete_progress(&state.db, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
