use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::database;
use crate::store::{SqliteDocumentStore, SqliteRealtimeStore};
use crate::utils::jwt::JwtService;
use crate::websocket::connection::ConnectionManager;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://dm.db?mode=rwc";

const MAX_BODY_BYTES: usize = 64 * 1024;

pub async fn register_routes() -> anyhow::Result<Router> {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let db = database::create_pool(&database_url)
        .await
        .with_context(|| format!("Failed to open database at {}", database_url))?;

    tracing::info!("Database connected and migrations applied");

    let jwt_service = Arc::new(JwtService::from_env().context("Failed to initialize JWT service")?);

    let state = Arc::new(AppState {
        realtime: Arc::new(SqliteRealtimeStore::new(db.clone())),
        documents: Arc::new(SqliteDocumentStore::new(db)),
        jwt_service,
        ws_manager: Arc::new(ConnectionManager::new()),
    });

    Ok(build_router(state))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", crate::api::routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
}
