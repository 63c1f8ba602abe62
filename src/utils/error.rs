use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

const STORE_FAILURE_MESSAGE: &str = "Could not load data, please try again";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No conversation is open")]
    NoConversation,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::NoConversation | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Store(_) => "store_error",
            AppError::Auth(_) => "auth_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::NoConversation => "no_conversation",
            AppError::Internal(_) => "internal_error",
            AppError::Validation(_) => "validation_error",
        }
    }

    // Store and internal details only go to the log.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Store(_) | AppError::Internal(_) => STORE_FAILURE_MESSAGE.to_string(),
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Validation(msg) => msg.clone(),
            AppError::NoConversation => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.client_message(),
        });
        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::Serialization(err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = AppError::Validation("empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_hide_details() {
        let err = AppError::Store(StoreError::InvalidPath("a.b".to_string()));
        assert_eq!(err.client_message(), STORE_FAILURE_MESSAGE);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_maps_to_unauthorized() {
        let err = AppError::Auth("no token".to_string());
        assert_eq!(err.kind(), "auth_error");
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
