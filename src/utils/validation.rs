use crate::services::channel_id::CHANNEL_ID_SEPARATOR;
use crate::utils::error::{AppError, AppResult};

pub const MAX_MESSAGE_CHARS: usize = 4000;
pub const MAX_USER_ID_LEN: usize = 128;

fn is_key_safe(s: &str) -> bool {
    s.chars()
        .all(|c| !c.is_control() && !matches!(c, '/' | '.' | '#' | '$' | '[' | ']'))
}

pub fn validate_user_id(user_id: &str) -> AppResult<()> {
    if user_id.is_empty() {
        return Err(AppError::Validation("User id cannot be empty".to_string()));
    }

    if user_id.len() > MAX_USER_ID_LEN {
        return Err(AppError::Validation(format!(
            "User id must be at most {} characters long",
            MAX_USER_ID_LEN
        )));
    }

    if !is_key_safe(user_id) {
        return Err(AppError::Validation(
            "User id contains characters that cannot be stored".to_string(),
        ));
    }

    if user_id.contains(CHANNEL_ID_SEPARATOR) {
        return Err(AppError::Validation(format!(
            "User id cannot contain '{}'",
            CHANNEL_ID_SEPARATOR
        )));
    }

    Ok(())
}

pub fn validate_message_text(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Message text cannot be empty".to_string(),
        ));
    }

    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message text must be at most {} characters long",
            MAX_MESSAGE_CHARS
        )));
    }

    Ok(())
}
