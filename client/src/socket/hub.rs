//! Listener registry shared by every subscriber of a connection.

use futures::Stream;
use serde_json::Value;
use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    task::{Context, Poll},
};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::trace;

type Listener = (u64, mpsc::UnboundedSender<Vec<Value>>);

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: HashMap<String, Vec<Listener>>,
}

impl HubInner {
    fn remove(&mut self, event: &str, id: u64) {
        if let Some(listeners) = self.listeners.get_mut(event) {
            listeners.retain(|(listener, _)| *listener != id);
            if listeners.is_empty() {
                self.listeners.remove(event);
            }
        }
    }
}

/// Fans event payloads out to every live subscription for the event name.
#[derive(Clone, Default)]
pub(crate) struct Hub {
    inner: Arc<Mutex<HubInner>>,
}

impl Hub {
    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self, event: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, sender));
        Subscription {
            id,
            event: event.to_string(),
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `args` to every subscriber of `event`, returning how many
    /// received it. Listeners whose receiver is gone are pruned.
    pub(crate) fn dispatch(&self, event: &str, args: &[Value]) -> usize {
        let mut inner = self.lock();
        let Some(listeners) = inner.listeners.get_mut(event) else {
            trace!(event, "no listeners");
            return 0;
        };
        listeners.retain(|(_, sender)| sender.send(args.to_vec()).is_ok());
        let delivered = listeners.len();
        if delivered == 0 {
            inner.listeners.remove(event);
        }
        delivered
    }

    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.lock().listeners.get(event).map_or(0, Vec::len)
    }
}

/// Live registration for one event name. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    event: String,
    receiver: mpsc::UnboundedReceiver<Vec<Value>>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Next payload, or `None` once the connection that owns the listener
    /// is gone.
    pub async fn recv(&mut self) -> Option<Vec<Value>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Vec<Value>> {
        match self.receiver.try_recv() {
            Ok(args) => Some(args),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Stream for Subscription {
    type Item = Vec<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.event, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[test]
    fn test_every_subscriber_receives() {
        let hub = Hub::default();
        let mut first = hub.subscribe("leaderboardUpdate");
        let mut second = hub.subscribe("leaderboardUpdate");
        let mut other = hub.subscribe("newChatMessage");

        assert_eq!(hub.dispatch("leaderboardUpdate", &[json!([])]), 2);
        assert_eq!(first.try_recv(), Some(vec![json!([])]));
        assert_eq!(second.try_recv(), Some(vec![json!([])]));
        assert_eq!(other.try_recv(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = Hub::default();
        let first = hub.subscribe("jailStatusUpdated");
        let _second = hub.subscribe("jailStatusUpdated");
        assert_eq!(hub.listener_count("jailStatusUpdated"), 2);

        drop(first);
        assert_eq!(hub.listener_count("jailStatusUpdated"), 1);
        assert_eq!(hub.dispatch("jailStatusUpdated", &[]), 1);
        assert_eq!(hub.dispatch("unknown", &[]), 0);
    }

    #[test]
    fn test_subscription_outlives_hub() {
        let hub = Hub::default();
        let mut subscription = hub.subscribe("message");
        drop(hub);
        assert_eq!(subscription.try_recv(), None);
        drop(subscription);
    }

    #[tokio::test]
    async fn test_subscription_stream() {
        let hub = Hub::default();
        let mut subscription = hub.subscribe("message");
        hub.dispatch("message", &[json!("one")]);
        hub.dispatch("message", &[json!("two")]);
        assert_eq!(subscription.next().await, Some(vec![json!("one")]));
        assert_eq!(subscription.recv().await, Some(vec![json!("two")]));
        assert_eq!(subscription.event(), "message");
    }
}
