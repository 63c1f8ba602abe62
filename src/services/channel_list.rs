use std::cmp::Reverse;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::models::channel::{CHANNELS_PATH, Channel};
use crate::models::channel_summary::ChannelSummary;
use crate::models::user::UserProfile;
use crate::services::profile::get_profile;
use crate::store::{DocumentStore, RealtimeStore, StoreError, Subscription};
use crate::utils::error::{AppError, AppResult};

pub async fn list_channels(
    realtime: &dyn RealtimeStore,
    documents: &dyn DocumentStore,
    viewer_id: &str,
) -> AppResult<Vec<ChannelSummary>> {
    let snapshot = realtime.read(CHANNELS_PATH).await?;
    summarize_channels(documents, viewer_id, snapshot).await
}

pub async fn summarize_channels(
    documents: &dyn DocumentStore,
    viewer_id: &str,
    snapshot: Option<Value>,
) -> AppResult<Vec<ChannelSummary>> {
    let Some(Value::Object(all)) = snapshot else {
        return Ok(Vec::new());
    };

    let mine = all
        .into_iter()
        .map(|(id, value)| Channel::from_value(&id, value))
        .filter(|channel| channel.has_member(viewer_id));

    let mut summaries =
        try_join_all(mine.map(|channel| summarize(documents, viewer_id, channel))).await?;
    sort_by_recency(&mut summaries);
    Ok(summaries)
}

async fn summarize(
    documents: &dyn DocumentStore,
    viewer_id: &str,
    channel: Channel,
) -> AppResult<ChannelSummary> {
    let other_user_id = channel.other_member(viewer_id).map(str::to_string);
    let other_user = match &other_user_id {
        Some(id) => load_profile(documents, id).await?,
        None => {
            tracing::debug!("Channel {} has no counterpart for {}", channel.id, viewer_id);
            None
        }
    };

    // First of the newest, so equal timestamps resolve to key order.
    let last_message = channel
        .messages
        .iter()
        .min_by_key(|m| Reverse(m.created_at))
        .cloned();

    let unread_count = channel
        .messages
        .iter()
        .filter(|m| m.is_unread_for(viewer_id))
        .count();

    let updated_at = last_message
        .as_ref()
        .map(|m| m.created_at)
        .filter(|t| *t != 0)
        .or(channel.created_at.filter(|t| *t != 0));

    Ok(ChannelSummary {
        id: channel.id,
        other_user_id,
        other_user,
        last_message,
        unread_count,
        updated_at,
    })
}

pub(crate) async fn load_profile(documents: &dyn DocumentStore, user_id: &str) -> AppResult<Option<UserProfile>> {
    match get_profile(documents, user_id).await {
        Ok(profile) => Ok(profile),
        Err(AppError::Store(StoreError::Serialization(e))) => {
            tracing::warn!("Ignoring malformed profile {}: {}", user_id, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn sort_by_recency(summaries: &mut [ChannelSummary]) {
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// Recomputes the viewer's channel list every time any channel changes and
/// hands it to `on_update`. Snapshots that pile up while a recomputation
/// runs are collapsed into the latest one.
pub async fn watch_channels<F>(
    realtime: Arc<dyn RealtimeStore>,
    documents: Arc<dyn DocumentStore>,
    viewer_id: &str,
    mut on_update: F,
) -> AppResult<Subscription>
where
    F: FnMut(AppResult<Vec<ChannelSummary>>) + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = realtime
        .subscribe_value(
            CHANNELS_PATH,
            Box::new(move |snapshot| {
                let _ = tx.send(snapshot);
            }),
        )
        .await?;

    let viewer_id = viewer_id.to_string();

    Ok(Subscription::spawn(move |token| async move {
        let _listener = listener;
        loop {
            let mut snapshot = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                snapshot = rx.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            while let Ok(newer) = rx.try_recv() {
                snapshot = newer;
            }

            let result = summarize_channels(documents.as_ref(), &viewer_id, snapshot).await;
            if let Err(e) = &result {
                tracing::warn!("Channel list for {} could not be built: {}", viewer_id, e);
            }
            if token.is_cancelled() {
                break;
            }
            on_update(result);
        }
    }))
}
