use crate::models::channel::{Channel, channel_path};
use crate::store::RealtimeStore;
use crate::utils::error::AppResult;

/// Both paths merge. Two first contacts racing each other only overwrite
/// `createdAt`; members and messages already there are kept.
pub async fn ensure_channel(
    store: &dyn RealtimeStore,
    channel_id: &str,
    member_a: &str,
    member_b: &str,
) -> AppResult<()> {
    let path = channel_path(channel_id);

    let fields = if store.read(&path).await?.is_none() {
        tracing::info!("Creating channel {}", channel_id);
        Channel::creation_fields(member_a, member_b)
    } else {
        Channel::membership_fields(member_a, member_b)
    };
    store.update(&path, fields).await?;

    Ok(())
}

pub async fn get_channel(store: &dyn RealtimeStore, channel_id: &str) -> AppResult<Option<Channel>> {
    let channel = store
        .read(&channel_path(channel_id))
        .await?
        .map(|value| Channel::from_value(channel_id, value));
    Ok(channel)
}
