pub mod channel;
pub mod channel_summary;
pub mod message;
pub mod user;
