use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::models::user::UserProfile;
use crate::services::profile::{find_profiles, get_profile, put_profile};
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::{json_list, json_response, require_viewer};

#[derive(Deserialize)]
struct LookupParams {
    email: String,
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    email: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let profile = get_profile(state.documents.as_ref(), &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    json_response(&profile)
}

async fn lookup_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let profiles = find_profiles(state.documents.as_ref(), "email", &params.email).await?;
    json_list(profiles)
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let viewer_id = require_viewer(&headers)?;
    let patch = UserProfile {
        id: viewer_id.clone(),
        name: req.name,
        display_name: req.display_name,
        email: req.email,
        photo_url: req.photo_url,
    };
    put_profile(state.documents.as_ref(), &patch).await?;

    let profile = get_profile(state.documents.as_ref(), &viewer_id)
        .await?
        .unwrap_or(patch);
    json_response(&profile)
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(lookup_users))
        .route("/me", put(update_me))
        .route("/:user_id", get(get_user))
        .with_state(state)
}
