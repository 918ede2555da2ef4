//! Practice history endpoints (always scoped to the caller)

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use mathmap_common::db::PracticeRecord;
use tracing::info;

use super::auth::CurrentUser;
use super::parse_id;
use crate::db::practice::{self, NewPractice, PracticeChanges};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn validate_time_spent(time_spent: i64) -> ApiResult<()> {
    if time_spent < 0 {
        return Err(ApiError::BadRequest(
            "time_spent: Ensure this value is greater than or equal to 0.".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/practice-history
pub async fn list_practice(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<PracticeRecord>>> {
    Ok(Json(practice::list_practice(&state.db, user.id).await?))
}

/// POST /api/practice-history
///
/// Records the attempt and folds it into the caller's progress.
pub async fn record_practice(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<NewPractice>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PracticeRecord>)> {
    let Json(attempt) = payload?;
    validate_time_spent(attempt.time_spent)?;

    let record = practice::record_practice(&state.db, user.id, &attempt).await?;
    info!(
        user = %user.username,
        question = %record.question.id,
        correct = record.is_correct,
        "Practice recorded"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/practice-history/:id
pub async fn get_practice(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<PracticeRecord>> {
    let id = parse_id(&id, "Practice record")?;
    practice::get_practice(&state.db, user.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Practice record".to_string()))
}

/// PUT/PATCH /api/practice-history/:id
pub async fn update_practice(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<PracticeChanges>, JsonRejection>,
) -> ApiResult<Json<PracticeRecord>> {
    let id = parse_id(&id, "Practice record")?;
    let Json(changes) = payload?;
    if let Some(time_spent) = changes.time_spent {
        validate_time_spent(time_spent)?;
    }

    practice::update_practice(&state.db, user.id, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Practice record".to_string()))
}

/// DELETE /api/practice-history/:id
pub async fn delete_practice(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "Practice record")?;
    if practice::delete_practice(&state.db, user.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Practice record".to_string()))
    }
}
