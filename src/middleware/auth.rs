use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::utils::error::AppError;

pub const AUTH_USER_HEADER: &str = "x-user-id";

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    request.headers_mut().remove(AUTH_USER_HEADER);

    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Auth("Missing or invalid authorization header".to_string()))?;
    let viewer_id = state.jwt_service.extract_user_id(token)?;

    let value = HeaderValue::from_str(&viewer_id)
        .map_err(|_| AppError::Auth("User id cannot be carried in a header".to_string()))?;
    request.headers_mut().insert(AUTH_USER_HEADER, value);

    Ok(next.run(request).await)
}
