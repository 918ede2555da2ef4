//! Knowledge link endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use mathmap_common::db::KnowledgeLinkDetail;

use super::parse_id;
use crate::db::links::{self, LinkChanges, NewLink};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn validate_relation(relation_type: &str) -> ApiResult<()> {
    if relation_type.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "relation_type: This field may not be blank.".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/knowledge-links
pub async fn list_links(State(state): State<AppState>) -> ApiResult<Json<Vec<KnowledgeLinkDetail>>> {
    Ok(Json(links::list_links(&state.db).await?))
}

/// POST /api/knowledge-links
pub async fn create_link(
    State(state): State<AppState>,
    payload: Result<Json<NewLink>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<KnowledgeLinkDetail>)> {
    let Json(link) = payload?;
    validate_relation(&link.relation_type)?;

    let created = links::create_link(&state.db, &link).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/knowledge-links/:id
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<KnowledgeLinkDetail>> {
    let id = parse_id(&id, "Knowledge link")?;
    links::get_link(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Knowledge link".to_string()))
}

/// PUT/PATCH /api/knowledge-links/:id
pub async fn update_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<LinkChanges>, JsonRejection>,
) -> ApiResult<Json<KnowledgeLinkDetail>> {
    let id = parse_id(&id, "Knowledge link")?;
    let Json(changes) = payload?;
    if let Some(relation_type) = &changes.relation_type {
        validate_relation(relation_type)?;
    }

    links::update_link(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Knowledge link".to_string()))
}

/// DELETE /api/knowledge-links/:id
pub async fn delete_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "Knowledge link")?;
    if links::delete_link(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Knowledge link".to_string()))
    }
}
