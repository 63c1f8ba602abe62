use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use itertools::Itertools;
use serde_json::Value;
use tokio::sync::mpsc;

use super::realtime::{ChildCallback, RealtimeStore, ValueCallback, paths_overlap, split_path};
use super::subscription::Subscription;

struct Watcher {
    segments: Vec<String>,
    tx: mpsc::UnboundedSender<()>,
}

// Registered before the first read, so no write slips between the initial
// snapshot and the live updates.
#[derive(Default)]
pub(crate) struct WatcherRegistry {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<u64, Watcher>>,
}

impl WatcherRegistry {
    pub fn register(&self, path: &str) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let segments = split_path(path).into_iter().map(String::from).collect();
        self.watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Watcher { segments, tx });
        rx
    }

    pub fn notify(&self, path: &str) {
        let mutated: Vec<String> = split_path(path).into_iter().map(String::from).collect();
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain(|_, w| {
            if w.tx.is_closed() {
                return false;
            }
            if paths_overlap(&w.segments, &mutated) {
                return w.tx.send(()).is_ok();
            }
            true
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.watchers.lock().unwrap().len()
    }
}

pub(crate) fn spawn_child_added<S>(
    store: S,
    path: String,
    mut wakeups: mpsc::UnboundedReceiver<()>,
    mut callback: ChildCallback,
) -> Subscription
where
    S: RealtimeStore + 'static,
{
    Subscription::spawn(move |token| async move {
        let mut emitted: HashSet<String> = HashSet::new();
        loop {
            match store.read(&path).await {
                Ok(Some(Value::Object(children))) => {
                    for (key, value) in children.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
                        // A cancel landing after this check still lets one callback
                        // through; `Subscription::close` waits that out.
                        if token.is_cancelled() {
                            return;
                        }
                        if emitted.insert(key.clone()) {
                            callback(key, value);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Child listener on {} failed to read: {}", path, e),
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                wake = wakeups.recv() => {
                    if wake.is_none() {
                        return;
                    }
                }
            }
            while wakeups.try_recv().is_ok() {}
        }
    })
}

pub(crate) fn spawn_value<S>(
    store: S,
    path: String,
    mut wakeups: mpsc::UnboundedReceiver<()>,
    mut callback: ValueCallback,
) -> Subscription
where
    S: RealtimeStore + 'static,
{
    Subscription::spawn(move |token| async move {
        let mut last: Option<Option<Value>> = None;
        loop {
            match store.read(&path).await {
                Ok(current) => {
                    if last.as_ref() != Some(&current) && !token.is_cancelled() {
                        callback(current.clone());
                        last = Some(current);
                    }
                }
                Err(e) => tracing::warn!("Value listener on {} failed to read: {}", path, e),
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                wake = wakeups.recv() => {
                    if wake.is_none() {
                        return;
                    }
                }
            }
            while wakeups.try_recv().is_ok() {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_reaches_related_paths_only() {
        let registry = WatcherRegistry::default();
        let mut channel = registry.register("channels/a_b/messages");
        let mut all = registry.register("channels");
        let mut users = registry.register("users");

        registry.notify("channels/a_b/messages/-Nabc/seen");

        assert!(channel.try_recv().is_ok());
        assert!(all.try_recv().is_ok());
        assert!(users.try_recv().is_err());
    }

    #[test]
    fn closed_watchers_are_pruned() {
        let registry = WatcherRegistry::default();
        let rx = registry.register("channels");
        drop(rx);
        registry.notify("channels/x");
        assert_eq!(registry.len(), 0);
    }
}
