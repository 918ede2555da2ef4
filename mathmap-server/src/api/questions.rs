//! Question endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use mathmap_common::db::Question;

use super::parse_id;
use crate::db::questions::{self, NewQuestion, QuestionChanges};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Size of the recommendation list
const RECOMMENDATION_COUNT: i64 = 5;

fn validate_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title: This field may not be blank.".to_string()));
    }
    Ok(())
}

fn validate_difficulty(difficulty: i64) -> ApiResult<()> {
    if !(1..=3).contains(&difficulty) {
        return Err(ApiError::BadRequest(format!(
            "difficulty: {} is not between 1 and 3.",
            difficulty
        )));
    }
    Ok(())
}

/// GET /api/questions
pub async fn list_questions(State(state): State<AppState>) -> ApiResult<Json<Vec<Question>>> {
    Ok(Json(questions::list_questions(&state.db).await?))
}

/// POST /api/questions
pub async fn create_question(
    State(state): State<AppState>,
    payload: Result<Json<NewQuestion>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    let Json(question) = payload?;
    validate_title(&question.title)?;
    validate_difficulty(question.difficulty)?;

    let created = questions::create_question(&state.db, &question).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/questions/recommendations
///
/// First questions in insertion order; no ranking is applied.
pub async fn recommendations(State(state): State<AppState>) -> ApiResult<Json<Vec<Question>>> {
    Ok(Json(
        questions::list_questions_limited(&state.db, Some(RECOMMENDATION_COUNT)).await?,
    ))
}

/// GET /api/questions/:id
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Question>> {
    let id = parse_id(&id, "Question")?;
    questions::get_question(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Question".to_string()))
}

/// PUT/PATCH /api/questions/:id
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<QuestionChanges>, JsonRejection>,
) -> ApiResult<Json<Question>> {
    let id = parse_id(&id, "Question")?;
    let Json(changes) = payload?;
    if let Some(title) = &changes.title {
        validate_title(title)?;
    }
    if let Some(difficulty) = changes.difficulty {
        validate_difficulty(difficulty)?;
    }

    questions::update_question(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Question".to_string()))
}

/// DELETE /api/questions/:id
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "Question")?;
    if questions::delete_question(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Question".to_string()))
    }
}
