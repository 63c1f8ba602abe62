use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: String,
    pub created_at: i64,
    pub seen: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRecord {
    #[serde(default)]
    text: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    seen: bool,
}

impl Message {
    pub fn new_record(sender: &str, text: &str) -> Value {
        serde_json::json!({
            "text": text,
            "sender": sender,
            "createdAt": Utc::now().timestamp_millis(),
            "seen": false,
        })
    }

    pub fn from_value(id: &str, value: Value) -> Option<Self> {
        let record: MessageRecord = serde_json::from_value(value).ok()?;
        Some(Self {
            id: id.to_string(),
            text: record.text,
            sender: record.sender,
            created_at: record.created_at,
            seen: record.seen,
        })
    }

    pub fn is_mine(&self, viewer_id: &str) -> bool {
        self.sender == viewer_id
    }

    pub fn shows_read_receipt(&self, viewer_id: &str) -> bool {
        self.is_mine(viewer_id) && self.seen
    }

    pub fn is_unread_for(&self, viewer_id: &str) -> bool {
        !self.is_mine(viewer_id) && !self.seen
    }
}

pub fn messages_from_value(value: Option<Value>) -> Vec<Message> {
    let Some(Value::Object(children)) = value else {
        return Vec::new();
    };
    let mut messages: Vec<Message> = children
        .into_iter()
        .filter_map(|(id, v)| {
            let parsed = Message::from_value(&id, v);
            if parsed.is_none() {
                tracing::debug!("Skipping malformed message {}", id);
            }
            parsed
        })
        .collect();
    messages.sort_by(|a, b| a.id.cmp(&b.id));
    messages
}
