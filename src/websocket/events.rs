use serde::{Deserialize, Serialize};

use crate::models::channel_summary::ChannelSummary;
use crate::models::message::Message;
use crate::models::user::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the conversation with `user_id`, replacing any open one.
    SubscribeChannel { user_id: String },
    UnsubscribeChannel,
    SendMessage { text: String },
    WatchChannels,
    UnwatchChannels,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        user_id: String,
    },
    ChannelOpened {
        channel_id: String,
        other_user: Option<UserProfile>,
    },
    ChannelClosed {
        channel_id: String,
    },
    NewMessage {
        channel_id: String,
        message: Message,
    },
    ChannelList {
        channels: Vec<ChannelSummary>,
    },
    Error {
        message: String,
    },
    Pong,
}
