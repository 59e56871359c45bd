//! Provider event subscriptions.
//!
//! Listeners registered on a provider run inside the provider's own call
//! stack, so they only forward events into a queue. The owner drains the
//! queue between its own operations, which keeps every handler
//! run-to-completion with respect to in-flight user actions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::provider::{Eip1193Provider, EventKind, ListenerId, ProviderEvent};

/// Registration of the `accountsChanged` and `chainChanged` listeners.
///
/// Dropping the subscription unregisters both listeners.
pub struct EventSubscription {
    provider: Arc<dyn Eip1193Provider>,
    ids: Vec<ListenerId>,
    rx: mpsc::UnboundedReceiver<ProviderEvent>,
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl EventSubscription {
    /// Register forwarding listeners on `provider`.
    pub fn new(provider: Arc<dyn Eip1193Provider>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let ids = [EventKind::AccountsChanged, EventKind::ChainChanged]
            .into_iter()
            .map(|kind| {
                let tx = tx.clone();
                provider.on(
                    kind,
                    Arc::new(move |event: &ProviderEvent| {
                        trace!(event = ?event, "provider event queued");
                        // The receiver only goes away with the subscription.
                        let _ = tx.send(event.clone());
                    }),
                )
            })
            .collect();

        debug!("subscribed to provider events");
        Self { provider, ids, rx }
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<ProviderEvent> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<ProviderEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.provider.remove_listener(id);
        }
        debug!("unsubscribed from provider events");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn test_forwards_events_in_order() {
        let mock = Arc::new(MockProvider::new());
        let mut sub = EventSubscription::new(Arc::clone(&mock) as Arc<dyn Eip1193Provider>);
        assert_eq!(mock.listener_count(), 2);

        mock.emit(&ProviderEvent::ChainChanged(1));
        mock.emit(&ProviderEvent::AccountsChanged(vec![Address::ZERO]));

        assert_eq!(sub.recv().await, Some(ProviderEvent::ChainChanged(1)));
        assert_eq!(
            sub.try_recv(),
            Some(ProviderEvent::AccountsChanged(vec![Address::ZERO]))
        );
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_drop_removes_listeners() {
        let mock = Arc::new(MockProvider::new());
        let sub = EventSubscription::new(Arc::clone(&mock) as Arc<dyn Eip1193Provider>);
        assert_eq!(mock.listener_count(), 2);

        drop(sub);
        assert_eq!(mock.listener_count(), 0);
        mock.emit(&ProviderEvent::ChainChanged(1));
    }
}
