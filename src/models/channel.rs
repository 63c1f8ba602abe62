use chrono::Utc;
use serde_json::{Map, Value, json};

use super::message::{Message, messages_from_value};
use crate::services::channel_id::other_member;

pub const CHANNELS_PATH: &str = "channels";

pub fn channel_path(channel_id: &str) -> String {
    format!("{}/{}", CHANNELS_PATH, channel_id)
}

pub fn messages_path(channel_id: &str) -> String {
    format!("{}/{}/messages", CHANNELS_PATH, channel_id)
}

pub fn message_path(channel_id: &str, message_id: &str) -> String {
    format!("{}/{}/messages/{}", CHANNELS_PATH, channel_id, message_id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: String,
    pub members: Map<String, Value>,
    pub created_at: Option<i64>,
    pub messages: Vec<Message>,
}

impl Channel {
    pub fn membership_fields(member_a: &str, member_b: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(format!("members/{}", member_a), Value::Bool(true));
        fields.insert(format!("members/{}", member_b), Value::Bool(true));
        fields
    }

    /// Membership plus `createdAt`. Merged, never written over the node, so
    /// a racing creator can only overwrite the timestamp.
    pub fn creation_fields(member_a: &str, member_b: &str) -> Map<String, Value> {
        let mut fields = Self::membership_fields(member_a, member_b);
        fields.insert("createdAt".to_string(), json!(Utc::now().timestamp_millis()));
        fields
    }

    pub fn from_value(id: &str, value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self {
                id: id.to_string(),
                members: Map::new(),
                created_at: None,
                messages: Vec::new(),
            };
        };

        let members = match fields.remove("members") {
            Some(Value::Object(members)) => members,
            _ => Map::new(),
        };

        Self {
            id: id.to_string(),
            members,
            created_at: fields.get("createdAt").and_then(Value::as_i64),
            messages: messages_from_value(fields.remove("messages")),
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.get(user_id).is_some_and(is_truthy)
    }

    pub fn other_member(&self, viewer_id: &str) -> Option<&str> {
        other_member(&self.members, viewer_id)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
