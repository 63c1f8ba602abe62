use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a live listener.
///
/// The listener runs until cancelled or dropped. Only [`Subscription::close`]
/// guarantees that no callback runs after it returns: after a bare `cancel`
/// or a drop, one callback that had already passed its cancellation check
/// may still be running on another worker.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Runs `body` on the tokio runtime. The body must return once the token
    /// it is handed gets cancelled.
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(body(token.clone()));
        Self {
            token,
            task: Some(task),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn close(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
            && e.is_panic()
        {
            tracing::warn!("Subscription task panicked: {}", e);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn close_stops_the_listener() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let sub = Subscription::spawn(move |token| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(5)) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        sub.close().await;
        let after_close = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_close);
    }

    #[tokio::test]
    async fn drop_cancels() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let sub = Subscription::spawn(move |token| async move {
            token.cancelled().await;
            let _ = tx.send(());
        });
        drop(sub);
        assert!(
            tokio::time::timeout(Duration::from_secs(1), rx)
                .await
                .is_ok()
        );
    }
}
