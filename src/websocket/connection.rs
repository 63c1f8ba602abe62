use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::events::{ClientMessage, ServerMessage};
use crate::api::direct_messages::channel_with;
use crate::models::message::Message as ChatMessage;
use crate::services::channel_list::watch_channels;
use crate::services::conversation::Conversation;
use crate::store::{DocumentStore, RealtimeStore, Subscription};
use crate::utils::error::AppError;

pub type Connections = Arc<RwLock<HashMap<String, String>>>;

pub struct ConnectionManager {
    connections: Connections,
}

/// An open conversation and the task relaying its messages to the socket.
/// The relay ends on its own once the conversation's listener is gone.
struct OpenChannel {
    conversation: Conversation,
    relay: JoinHandle<()>,
}

struct ConnectionSession {
    user_id: String,
    realtime: Arc<dyn RealtimeStore>,
    documents: Arc<dyn DocumentStore>,
    out: mpsc::UnboundedSender<ServerMessage>,
    conversation: Option<OpenChannel>,
    channel_list: Option<Subscription>,
}

impl ConnectionSession {
    fn reply(&self, message: ServerMessage) {
        let _ = self.out.send(message);
    }

    fn reply_error(&self, err: &AppError) {
        self.reply(ServerMessage::Error {
            message: err.client_message(),
        });
    }

    async fn close_conversation(&mut self) {
        if let Some(open) = self.conversation.take() {
            let channel_id = open.conversation.channel_id().to_string();
            open.conversation.close().await;
            if let Err(e) = open.relay.await {
                tracing::warn!("Message relay for {} failed: {}", channel_id, e);
            }
            self.reply(ServerMessage::ChannelClosed { channel_id });
        }
    }

    async fn open_conversation(&mut self, other_user_id: String) -> Result<(), AppError> {
        self.close_conversation().await;
        channel_with(&self.user_id, &other_user_id)?;

        // Messages queue here until the client has been told the channel is open.
        let (message_tx, mut message_rx) = mpsc::unbounded_channel::<ChatMessage>();
        let conversation = Conversation::open(
            self.realtime.clone(),
            self.documents.as_ref(),
            &self.user_id,
            &other_user_id,
            move |message| {
                let _ = message_tx.send(message);
            },
        )
        .await?;

        let channel_id = conversation.channel_id().to_string();
        self.reply(ServerMessage::ChannelOpened {
            channel_id: channel_id.clone(),
            other_user: conversation.other_user().cloned(),
        });

        let out = self.out.clone();
        let relay = tokio::spawn(async move {
            while let Some(message) = message_rx.recv().await {
                let _ = out.send(ServerMessage::NewMessage {
                    channel_id: channel_id.clone(),
                    message,
                });
            }
        });

        self.conversation = Some(OpenChannel {
            conversation,
            relay,
        });
        Ok(())
    }

    async fn watch_channel_list(&mut self) -> Result<(), AppError> {
        if let Some(previous) = self.channel_list.take() {
            previous.close().await;
        }

        let out = self.out.clone();
        let subscription = watch_channels(
            self.realtime.clone(),
            self.documents.clone(),
            &self.user_id,
            move |result| {
                let message = match result {
                    Ok(channels) => ServerMessage::ChannelList { channels },
                    Err(e) => ServerMessage::Error {
                        message: e.client_message(),
                    },
                };
                let _ = out.send(message);
            },
        )
        .await?;
        self.channel_list = Some(subscription);
        Ok(())
    }

    async fn handle(&mut self, message: ClientMessage) {
        let result = match message {
            ClientMessage::SubscribeChannel { user_id } => self.open_conversation(user_id).await,
            ClientMessage::UnsubscribeChannel => {
                self.close_conversation().await;
                Ok(())
            }
            ClientMessage::SendMessage { text } => match &self.conversation {
                Some(open) => open.conversation.send(&text).await.map(|_| ()),
                None => Err(AppError::NoConversation),
            },
            ClientMessage::WatchChannels => self.watch_channel_list().await,
            ClientMessage::UnwatchChannels => {
                if let Some(subscription) = self.channel_list.take() {
                    subscription.close().await;
                }
                Ok(())
            }
            ClientMessage::Heartbeat => {
                self.reply(ServerMessage::Pong);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::debug!("Socket request from {} failed: {}", self.user_id, e);
            self.reply_error(&e);
        }
    }

    async fn close(mut self) {
        self.close_conversation().await;
        if let Some(subscription) = self.channel_list.take() {
            subscription.close().await;
        }
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn online_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn handle_connection(
        &self,
        socket: WebSocket,
        user_id: String,
        realtime: Arc<dyn RealtimeStore>,
        documents: Arc<dyn DocumentStore>,
    ) {
        let (mut sender, mut receiver) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

        let connection_id = Uuid::new_v4().to_string();
        {
            let mut conns = self.connections.write().await;
            conns.insert(connection_id.clone(), user_id.clone());
        }
        tracing::info!(
            "{} connected ({}), {} sockets open",
            user_id,
            connection_id,
            self.online_count().await
        );

        let send_task = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to encode socket message: {}", e),
                }
            }
        });

        let _ = out_tx.send(ServerMessage::Connected {
            user_id: user_id.clone(),
        });

        let mut session = ConnectionSession {
            user_id: user_id.clone(),
            realtime,
            documents,
            out: out_tx,
            conversation: None,
            channel_list: None,
        };

        tokio::select! {
            _ = send_task => {},
            _ = async {
                while let Some(Ok(msg)) = receiver.next().await {
                    match msg {
                        Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => session.handle(client_msg).await,
                            Err(e) => session.reply(ServerMessage::Error {
                                message: format!("Unrecognized message: {}", e),
                            }),
                        },
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            } => {},
        }

        session.close().await;

        let mut conns = self.connections.write().await;
        conns.remove(&connection_id);
        tracing::info!("{} disconnected ({})", user_id, connection_id);
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
