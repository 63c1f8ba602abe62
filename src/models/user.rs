use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;

pub const USERS_COLLECTION: &str = "users";
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        rename = "displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    pub fn from_document(id: &str, mut doc: Document) -> serde_json::Result<Self> {
        doc.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(doc))
    }

    pub fn to_document(&self) -> Document {
        let mut doc = match serde_json::to_value(self) {
            Ok(Value::Object(doc)) => doc,
            _ => Document::new(),
        };
        doc.remove("id");
        doc
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.display_name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(UNKNOWN_DISPLAY_NAME)
    }
}
