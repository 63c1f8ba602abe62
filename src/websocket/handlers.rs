use axum::{
    extract::{
        FromRequest, Query, Request, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::bearer_token;

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    request: Request,
) -> Result<Response, StatusCode> {
    let token = query
        .token
        .or_else(|| bearer_token(request.headers()).map(str::to_string));

    let user_id = token
        .and_then(|t| state.jwt_service.extract_user_id(&t).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let state_clone = state.clone();
    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state_clone, user_id)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    state
        .ws_manager
        .handle_connection(
            socket,
            user_id,
            state.realtime.clone(),
            state.documents.clone(),
        )
        .await;
}
