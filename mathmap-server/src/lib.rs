//! mathmap-server library
//!
//! Knowledge-graph practice backend: CRUD resources over SQLite, graph export,
//! bearer-token auth, and the photographed-problem OCR pipeline.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use mathmap_common::api::TokenSigner;
use sqlx::SqlitePool;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod graph;
pub mod ocr;
pub mod seed;

pub use error::{ApiError, ApiResult};

use ocr::OcrPipeline;

/// Largest accepted OCR upload
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Access/refresh token issuer
    pub tokens: TokenSigner,
    /// OCR + completion pipeline
    pub ocr: OcrPipeline,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, tokens: TokenSigner, ocr: OcrPipeline) -> Self {
        Self { db, tokens, ocr }
    }
}

/// Build application router
///
/// `/health`, token issuance and registration are public; everything else
/// requires a bearer access token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/users", get(api::users::list_users).post(api::users::create_user))
        .route("/api/users/me", get(api::users::me))
        .route(
            "/api/users/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .patch(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route(
            "/api/knowledge-nodes",
            get(api::knowledge_nodes::list_nodes).post(api::knowledge_nodes::create_node),
        )
        .route("/api/knowledge-nodes/map", get(api::knowledge_nodes::knowledge_map))
        .route(
            "/api/knowledge-nodes/:id",
            get(api::knowledge_nodes::get_node)
                .put(api::knowledge_nodes::update_node)
                .patch(api::knowledge_nodes::update_node)
                .delete(api::knowledge_nodes::delete_node),
        )
        .route(
            "/api/knowledge-links",
            get(api::knowledge_links::list_links).post(api::knowledge_links::create_link),
        )
        .route(
            "/api/knowledge-links/:id",
            get(api::knowledge_links::get_link)
                .put(api::knowledge_links::update_link)
                .patch(api::knowledge_links::update_link)
                .delete(api::knowledge_links::delete_link),
        )
        .route(
            "/api/questions",
            get(api::questions::list_questions).post(api::questions::create_question),
        )
        .route("/api/questions/recommendations", get(api::questions::recommendations))
        .route(
            "/api/questions/:id",
            get(api::questions::get_question)
                .put(api::questions::update_question)
                .patch(api::questions::update_question)
                .delete(api::questions::delete_question),
        )
        .route(
            "/api/practice-history",
            get(api::practice::list_practice).post(api::practice::record_practice),
        )
        .route(
            "/api/practice-history/:id",
            get(api::practice::get_practice)
                .put(api::practice::update_practice)
                .patch(api::practice::update_practice)
                .delete(api::practice::delete_practice),
        )
        .route("/api/user-progress", get(api::progress::list_progress))
        .route(
            "/api/user-progress/:id",
            get(api::progress::get_progress)
                .put(api::progress::update_progress)
                .patch(api::progress::update_progress)
                .delete(api::progress::delete_progress),
        )
        .route(
            "/api/ocr",
            post(api::ocr::recognize).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/token", post(api::tokens::obtain_token))
        .route("/api/token/refresh", post(api::tokens::refresh_token))
        .route("/api/users/register", post(api::users::register))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the served application: [`build_router`] behind trailing-slash
/// normalization, so `/api/ocr/` and `/api/ocr` reach the same handler
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}
