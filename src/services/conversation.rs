use std::sync::Arc;

use crate::models::message::Message;
use crate::models::user::UserProfile;
use crate::services::channel::ensure_channel;
use crate::services::channel_id::resolve_channel_id;
use crate::services::channel_list::load_profile;
use crate::services::message_stream::{send_message, subscribe_messages};
use crate::services::read_state::watch_seen;
use crate::store::{DocumentStore, RealtimeStore, Subscription};
use crate::utils::error::AppResult;

pub struct Conversation {
    realtime: Arc<dyn RealtimeStore>,
    channel_id: String,
    viewer_id: String,
    other_user: Option<UserProfile>,
    messages: Subscription,
    read_marker: Subscription,
}

impl Conversation {
    pub async fn open<F>(
        realtime: Arc<dyn RealtimeStore>,
        documents: &dyn DocumentStore,
        viewer_id: &str,
        other_user_id: &str,
        on_message: F,
    ) -> AppResult<Self>
    where
        F: FnMut(Message) + Send + 'static,
    {
        let channel_id = resolve_channel_id(viewer_id, other_user_id);
        ensure_channel(realtime.as_ref(), &channel_id, viewer_id, other_user_id).await?;

        let other_user = load_profile(documents, other_user_id).await?;
        let messages = subscribe_messages(realtime.as_ref(), &channel_id, on_message).await?;
        let read_marker = watch_seen(realtime.clone(), &channel_id, viewer_id).await?;

        tracing::debug!("{} opened conversation {}", viewer_id, channel_id);

        Ok(Self {
            realtime,
            channel_id,
            viewer_id: viewer_id.to_string(),
            other_user,
            messages,
            read_marker,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    pub fn other_user(&self) -> Option<&UserProfile> {
        self.other_user.as_ref()
    }

    pub async fn send(&self, text: &str) -> AppResult<Message> {
        send_message(self.realtime.as_ref(), &self.channel_id, &self.viewer_id, text).await
    }

    pub async fn close(self) {
        tracing::debug!("{} closed conversation {}", self.viewer_id, self.channel_id);
        self.messages.close().await;
        self.read_marker.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::message_stream::get_messages;
    use crate::store::{MemoryDocumentStore, MemoryRealtimeStore};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn both_sides_share_one_channel() {
        let memory = MemoryRealtimeStore::new();
        let realtime: Arc<dyn RealtimeStore> = Arc::new(memory.clone());
        let documents = MemoryDocumentStore::new();

        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let a = Conversation::open(realtime.clone(), &documents, "u1", "u2", move |m| {
            let _ = tx_a.send(m);
        })
        .await
        .unwrap();

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let b = Conversation::open(realtime.clone(), &documents, "u2", "u1", move |m| {
            let _ = tx_b.send(m);
        })
        .await
        .unwrap();

        assert_eq!(a.channel_id(), b.channel_id());

        a.send("hello").await.unwrap();
        let received = tokio::time::timeout(Duration::from_secs(1), rx_b.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.text, "hello");
        assert_eq!(received.sender, "u1");

        let mut seen = false;
        for _ in 0..50 {
            let messages = get_messages(&memory, "u1_u2").await.unwrap();
            if messages[0].seen {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen);

        a.close().await;
        b.close().await;
    }

    #[tokio::test]
    async fn blank_send_is_rejected() {
        let realtime: Arc<dyn RealtimeStore> = Arc::new(MemoryRealtimeStore::new());
        let documents = MemoryDocumentStore::new();
        let conversation = Conversation::open(realtime, &documents, "u1", "u2", |_| {})
            .await
            .unwrap();
        assert!(conversation.send("  ").await.is_err());
    }
}
