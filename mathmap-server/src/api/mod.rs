//! HTTP API handlers for mathmap-server

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub mod auth;
pub mod health;
pub mod knowledge_links;
pub mod knowledge_nodes;
pub mod ocr;
pub mod practice;
pub mod progress;
pub mod questions;
pub mod tokens;
pub mod users;

pub use auth::{auth_middleware, CurrentUser};
pub use health::health_routes;

/// Parse a path id; malformed ids are reported like missing rows
pub(crate) fn parse_id(raw: &str, resource: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(resource.to_string()))
}
