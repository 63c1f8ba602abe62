use serde::Serialize;

use super::message::Message;
use super::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: String,
    pub other_user_id: Option<String>,
    pub other_user: Option<UserProfile>,
    pub last_message: Option<Message>,
    pub unread_count: usize,
    pub updated_at: Option<i64>,
}

impl ChannelSummary {
    pub fn is_active(&self) -> bool {
        self.other_user.is_some()
    }
}
