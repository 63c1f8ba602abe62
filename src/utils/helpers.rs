use axum::{Json, http::HeaderMap};
use serde::Serialize;

use crate::utils::error::{AppError, AppResult};

pub fn to_json<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

pub fn json_response<T: Serialize>(value: &T) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(to_json(value)?))
}

pub fn json_list<T: Serialize>(items: Vec<T>) -> AppResult<Json<Vec<serde_json::Value>>> {
    let values = items
        .iter()
        .map(to_json)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(values))
}

pub fn extract_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(crate::middleware::auth::AUTH_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn require_viewer(headers: &HeaderMap) -> AppResult<String> {
    extract_user_id(headers).ok_or_else(|| AppError::Auth("Not signed in".to_string()))
}
