//! Knowledge node endpoints and graph export

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use mathmap_common::db::KnowledgeNode;

use super::parse_id;
use crate::db::links::list_link_rows;
use crate::db::nodes::{self, NewNode, NodeChanges};
use crate::error::{ApiError, ApiResult};
use crate::graph::{export_graph, GraphDocument};
use crate::AppState;

fn validate_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title: This field may not be blank.".to_string()));
    }
    Ok(())
}

fn validate_difficulty(difficulty: i64) -> ApiResult<()> {
    if !(1..=5).contains(&difficulty) {
        return Err(ApiError::BadRequest(format!(
            "difficulty: {} is not between 1 and 5.",
            difficulty
        )));
    }
    Ok(())
}

/// GET /api/knowledge-nodes
pub async fn list_nodes(State(state): State<AppState>) -> ApiResult<Json<Vec<KnowledgeNode>>> {
    Ok(Json(nodes::list_nodes(&state.db).await?))
}

/// POST /api/knowledge-nodes
pub async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<NewNode>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<KnowledgeNode>)> {
    let Json(node) = payload?;
    validate_title(&node.title)?;
    validate_difficulty(node.difficulty)?;

    let created = nodes::create_node(&state.db, &node).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/knowledge-nodes/map
///
/// Full graph snapshot for the visualization.
pub async fn knowledge_map(State(state): State<AppState>) -> ApiResult<Json<GraphDocument>> {
    let nodes = nodes::list_nodes(&state.db).await?;
    let links = list_link_rows(&state.db).await?;
    Ok(Json(export_graph(&nodes, &links)))
}

/// GET /api/knowledge-nodes/:id
pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<KnowledgeNode>> {
    let id = parse_id(&id, "Knowledge node")?;
    nodes::get_node(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Knowledge node".to_string()))
}

/// PUT/PATCH /api/knowledge-nodes/:id
pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NodeChanges>, JsonRejection>,
) -> ApiResult<Json<KnowledgeNode>> {
    let id = parse_id(&id, "Knowledge node")?;
    let Json(changes) = payload?;
    if let Some(title) = &changes.title {
        validate_title(title)?;
    }
    if let Some(difficulty) = changes.difficulty {
        validate_difficulty(difficulty)?;
    }

    nodes::update_node(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Knowledge node".to_string()))
}

/// DELETE /api/knowledge-nodes/:id
pub async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "Knowledge node")?;
    if nodes::delete_node(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Knowledge node".to_string()))
    }
}
