use crate::models::message::{Message, messages_from_value};
use crate::models::channel::messages_path;
use crate::store::{RealtimeStore, Subscription};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_message_text;

pub async fn send_message(
    store: &dyn RealtimeStore,
    channel_id: &str,
    sender_id: &str,
    text: &str,
) -> AppResult<Message> {
    validate_message_text(text)?;

    let record = Message::new_record(sender_id, text);
    let id = store.push(&messages_path(channel_id), record.clone()).await?;

    tracing::debug!("Message {} sent to {} by {}", id, channel_id, sender_id);

    Message::from_value(&id, record)
        .ok_or_else(|| AppError::Internal("Stored message could not be read back".to_string()))
}

pub async fn subscribe_messages<F>(
    store: &dyn RealtimeStore,
    channel_id: &str,
    mut on_message: F,
) -> AppResult<Subscription>
where
    F: FnMut(Message) + Send + 'static,
{
    let subscription = store
        .subscribe_child_added(
            &messages_path(channel_id),
            Box::new(move |id, value| match Message::from_value(&id, value) {
                Some(message) => on_message(message),
                None => tracing::debug!("Skipping malformed message {}", id),
            }),
        )
        .await?;
    Ok(subscription)
}

pub async fn get_messages(store: &dyn RealtimeStore, channel_id: &str) -> AppResult<Vec<Message>> {
    let value = store.read(&messages_path(channel_id)).await?;
    Ok(messages_from_value(value))
}
