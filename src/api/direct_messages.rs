use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::services::channel::ensure_channel;
use crate::services::channel_id::resolve_channel_id;
use crate::services::channel_list::{list_channels, load_profile};
use crate::services::message_stream::{get_messages, send_message};
use crate::services::read_state::mark_seen;
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::{json_list, json_response, require_viewer};
use crate::utils::validation::validate_user_id;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenDmRequest {
    other_user_id: String,
}

#[derive(Deserialize)]
struct SendDmMessageRequest {
    text: String,
}

pub(crate) fn channel_with(viewer_id: &str, other_user_id: &str) -> AppResult<String> {
    validate_user_id(other_user_id)?;
    if viewer_id == other_user_id {
        return Err(AppError::BadRequest(
            "Cannot start a conversation with yourself".to_string(),
        ));
    }
    Ok(resolve_channel_id(viewer_id, other_user_id))
}

async fn open_dm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OpenDmRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let viewer_id = require_viewer(&headers)?;
    let channel_id = channel_with(&viewer_id, &req.other_user_id)?;

    ensure_channel(
        state.realtime.as_ref(),
        &channel_id,
        &viewer_id,
        &req.other_user_id,
    )
    .await?;
    let other_user = load_profile(state.documents.as_ref(), &req.other_user_id).await?;

    json_response(&serde_json::json!({
        "channelId": channel_id,
        "otherUser": other_user,
    }))
}

async fn list_dms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let viewer_id = require_viewer(&headers)?;
    let channels = list_channels(
        state.realtime.as_ref(),
        state.documents.as_ref(),
        &viewer_id,
    )
    .await?;
    json_list(channels)
}

async fn get_dm_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(other_user_id): Path<String>,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let viewer_id = require_viewer(&headers)?;
    let channel_id = channel_with(&viewer_id, &other_user_id)?;
    let messages = get_messages(state.realtime.as_ref(), &channel_id).await?;
    json_list(messages)
}

async fn send_dm_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(other_user_id): Path<String>,
    Json(req): Json<SendDmMessageRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let viewer_id = require_viewer(&headers)?;
    let channel_id = channel_with(&viewer_id, &other_user_id)?;

    // Refuse blank text before the membership write as well.
    crate::utils::validation::validate_message_text(&req.text)?;

    ensure_channel(
        state.realtime.as_ref(),
        &channel_id,
        &viewer_id,
        &other_user_id,
    )
    .await?;
    let message = send_message(state.realtime.as_ref(), &channel_id, &viewer_id, &req.text).await?;

    json_response(&message)
}

async fn mark_dm_seen(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(other_user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let viewer_id = require_viewer(&headers)?;
    let channel_id = channel_with(&viewer_id, &other_user_id)?;
    let marked = mark_seen(state.realtime.as_ref(), &channel_id, &viewer_id).await?;
    json_response(&serde_json::json!({ "marked": marked }))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(open_dm))
        .route("/", get(list_dms))
        .route("/:user_id/messages", post(send_dm_message))
        .route("/:user_id/messages", get(get_dm_messages))
        .route("/:user_id/seen", post(mark_dm_seen))
        .with_state(state)
}
