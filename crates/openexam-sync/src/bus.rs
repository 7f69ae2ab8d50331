//! Process-wide event bus.
//!
//! Components that change files publish on a named channel; every store copy
//! subscribes and refreshes. Delivery is fire-and-forget over a
//! `tokio::sync::broadcast` per channel, so a subscriber that falls behind
//! misses events instead of blocking publishers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use openexam_core::models::FileRecord;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// What happened to the files carried by a [`FilesChanged`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Uploaded,
    Generated,
    Deleted,
}

/// Payload of the `filesChanged` channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesChanged {
    pub action: ChangeAction,
    pub files: Vec<FileRecord>,
}

impl FilesChanged {
    pub fn new(action: ChangeAction, files: Vec<FileRecord>) -> Self {
        Self { action, files }
    }
}

/// Payloads are optional: sharing changes publish with no payload.
pub type Payload = Option<FilesChanged>;

struct BusInner {
    channels: RwLock<HashMap<String, broadcast::Sender<Payload>>>,
    closed: AtomicBool,
    capacity: usize,
}

/// Named-channel publish/subscribe context. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose channels buffer `capacity` events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register `handler` for events on `channel`.
    ///
    /// The handler runs on its own task. Dropping the returned
    /// [`Subscription`] (or calling [`Subscription::unsubscribe`]) stops it.
    pub async fn subscribe<F>(&self, channel: &str, handler: F) -> Subscription
    where
        F: Fn(Payload) + Send + Sync + 'static,
    {
        let mut receiver = {
            let mut channels = self.inner.channels.write().await;
            // A bus that is already shut down hands out inert subscriptions.
            if self.is_closed() {
                return Subscription {
                    channel: channel.to_string(),
                    handle: tokio::spawn(async {}),
                };
            }
            channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
                .subscribe()
        };

        let name = channel.to_string();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(payload) => handler(payload),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %name, skipped, "Subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!(channel = %name, "Subscription ended");
        });

        Subscription {
            channel: channel.to_string(),
            handle,
        }
    }

    /// Publish `payload` on `channel`. Returns how many subscribers will see it.
    pub async fn publish(&self, channel: &str, payload: Payload) -> usize {
        if self.is_closed() {
            return 0;
        }
        let channels = self.inner.channels.read().await;
        match channels.get(channel) {
            Some(sender) => sender.send(payload).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .channels
            .read()
            .await
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Close every channel. Subscription tasks end once they drain.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let mut channels = self.inner.channels.write().await;
        let count = channels.len();
        channels.clear();
        tracing::debug!(channels = count, "Event bus shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Handle to a running subscription. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    channel: String,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
