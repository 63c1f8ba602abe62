pub mod channel;
pub mod channel_id;
pub mod channel_list;
pub mod conversation;
pub mod message_stream;
pub mod profile;
pub mod read_state;
