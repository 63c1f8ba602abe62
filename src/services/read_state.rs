use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::models::channel::{message_path, messages_path};
use crate::models::message::{Message, messages_from_value};
use crate::store::{RealtimeStore, Subscription};
use crate::utils::error::AppResult;

// A failed flag write is logged and skipped; the next pass retries it.
pub async fn mark_seen(
    store: &dyn RealtimeStore,
    channel_id: &str,
    viewer_id: &str,
) -> AppResult<usize> {
    let value = store.read(&messages_path(channel_id)).await?;
    let messages = messages_from_value(value);
    Ok(mark_messages(store, channel_id, viewer_id, &messages).await)
}

async fn mark_messages(
    store: &dyn RealtimeStore,
    channel_id: &str,
    viewer_id: &str,
    messages: &[Message],
) -> usize {
    let mut marked = 0;
    for message in messages.iter().filter(|m| m.is_unread_for(viewer_id)) {
        let mut fields = Map::new();
        fields.insert("seen".to_string(), Value::Bool(true));
        match store
            .update(&message_path(channel_id, &message.id), fields)
            .await
        {
            Ok(()) => marked += 1,
            Err(e) => tracing::warn!(
                "Failed to mark message {} in {} as seen: {}",
                message.id,
                channel_id,
                e
            ),
        }
    }
    if marked > 0 {
        tracing::debug!("{} marked {} messages seen in {}", viewer_id, marked, channel_id);
    }
    marked
}

pub async fn watch_seen(
    store: Arc<dyn RealtimeStore>,
    channel_id: &str,
    viewer_id: &str,
) -> AppResult<Subscription> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = store
        .subscribe_value(
            &messages_path(channel_id),
            Box::new(move |snapshot| {
                let _ = tx.send(snapshot);
            }),
        )
        .await?;

    let channel_id = channel_id.to_string();
    let viewer_id = viewer_id.to_string();

    Ok(Subscription::spawn(move |token| async move {
        let _listener = listener;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                snapshot = rx.recv() => {
                    let Some(snapshot) = snapshot else { break };
                    let messages = messages_from_value(snapshot);
                    mark_messages(store.as_ref(), &channel_id, &viewer_id, &messages).await;
                }
            }
        }
    }))
}
