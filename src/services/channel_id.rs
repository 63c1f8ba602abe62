use serde_json::{Map, Value};

pub const CHANNEL_ID_SEPARATOR: char = '_';

pub fn resolve_channel_id(user_a: &str, user_b: &str) -> String {
    let (first, second) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}{}{}", first, CHANNEL_ID_SEPARATOR, second)
}

pub fn other_member<'a>(members: &'a Map<String, Value>, viewer_id: &str) -> Option<&'a str> {
    members
        .keys()
        .map(String::as_str)
        .find(|member| *member != viewer_id)
}
