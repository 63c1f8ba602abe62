pub mod direct_messages;
pub mod users;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::store::{DocumentStore, RealtimeStore};
use crate::utils::jwt::JwtService;
use crate::websocket::connection::ConnectionManager;

pub struct AppState {
    pub realtime: Arc<dyn RealtimeStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub jwt_service: Arc<JwtService>,
    pub ws_manager: Arc<ConnectionManager>,
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn routes(state: Arc<AppState>) -> Router {
    let ws_route = Router::new()
        .route(
            "/ws",
            axum::routing::get(crate::websocket::handlers::ws_handler),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .nest("/dms", direct_messages::routes(state.clone()))
        .nest("/users", users::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(ws_route)
        .merge(protected_routes)
}
