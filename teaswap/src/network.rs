//! Network reconciliation.
//!
//! Makes the wallet's active chain equal to the one chain the widget
//! requires, falling back to `wallet_addEthereumChain` when the wallet has
//! never heard of it.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::config::ChainDescriptor;
use crate::provider::WalletClient;

/// Switches the wallet to the required chain.
///
/// At most one switch is in flight at a time; overlapping calls return
/// `false` without touching the provider.
#[derive(Debug)]
pub struct NetworkReconciler {
    required: ChainDescriptor,
    in_flight: AtomicBool,
}

/// Marks a switch as in flight until dropped.
#[derive(Debug)]
pub struct SwitchGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl NetworkReconciler {
    /// Create a reconciler for `required`.
    #[must_use]
    pub const fn new(required: ChainDescriptor) -> Self {
        Self {
            required,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The required chain.
    #[must_use]
    pub const fn required(&self) -> &ChainDescriptor {
        &self.required
    }

    /// Whether `chain_id` is the required chain.
    #[must_use]
    pub const fn is_required(&self, chain_id: Option<u64>) -> bool {
        matches!(chain_id, Some(id) if id == self.required.chain_id)
    }

    /// Whether a switch is currently in flight.
    #[must_use]
    pub fn is_switching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight slot, or `None` if a switch is already running.
    #[must_use]
    pub fn try_begin(&self) -> Option<SwitchGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SwitchGuard {
                flag: &self.in_flight,
            })
    }

    /// Make the wallet's active chain the required one.
    ///
    /// `current` is the chain the caller believes is active; when it already
    /// matches nothing is sent. Never fails: errors are logged and reported
    /// as `false`, leaving the wallet where it was.
    pub async fn ensure_chain(&self, client: &WalletClient, current: Option<u64>) -> bool {
        if self.is_required(current) {
            return true;
        }

        let Some(_guard) = self.try_begin() else {
            debug!("network switch already in flight");
            return false;
        };

        let chain_id = self.required.chain_id;
        info!(chain_id = chain_id, chain = %self.required.chain_name, "switching network");

        match client.switch_chain(chain_id).await {
            Ok(()) => true,
            Err(e) if e.is_unrecognized_chain() => {
                info!(chain = %self.required.chain_name, "chain unknown to wallet, adding it");
                match client.add_chain(&self.required).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(chain = %self.required.chain_name, error = %e, "failed to add network");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(chain = %self.required.chain_name, error = %e, "failed to switch network");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::mock::MockProvider;
    use crate::provider::{Eip1193Provider, methods};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn setup() -> (Arc<MockProvider>, WalletClient, NetworkReconciler) {
        let mock = Arc::new(MockProvider::new());
        let client = WalletClient::new(Arc::clone(&mock) as Arc<dyn Eip1193Provider>);
        (mock, client, NetworkReconciler::new(ChainDescriptor::tea_sepolia()))
    }

    #[tokio::test]
    async fn test_already_on_chain_is_noop() {
        let (mock, client, reconciler) = setup();
        assert!(reconciler.ensure_chain(&client, Some(10218)).await);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_switch_success() {
        let (mock, client, reconciler) = setup();
        mock.respond(methods::SWITCH_CHAIN, Value::Null);

        assert!(reconciler.ensure_chain(&client, Some(1)).await);
        assert_eq!(mock.methods(), vec![methods::SWITCH_CHAIN]);
        assert!(!reconciler.is_switching());
    }

    #[tokio::test]
    async fn test_unknown_chain_adds_it_once() {
        let (mock, client, reconciler) = setup();
        mock.fail(methods::SWITCH_CHAIN, ProviderError::unrecognized_chain(10218));
        mock.respond(methods::ADD_CHAIN, Value::Null);

        assert!(reconciler.ensure_chain(&client, Some(1)).await);

        let adds = mock.calls_to(methods::ADD_CHAIN);
        assert_eq!(adds.len(), 1);
        assert_eq!(
            adds[0].params,
            json!([serde_json::to_value(ChainDescriptor::tea_sepolia()).unwrap()])
        );
    }

    #[tokio::test]
    async fn test_add_failure_reports_false() {
        let (mock, client, reconciler) = setup();
        mock.fail(methods::SWITCH_CHAIN, ProviderError::unrecognized_chain(10218));
        mock.fail(methods::ADD_CHAIN, ProviderError::user_rejected());

        assert!(!reconciler.ensure_chain(&client, None).await);
        assert!(!reconciler.is_switching());
    }

    #[tokio::test]
    async fn test_other_switch_error_does_not_add() {
        let (mock, client, reconciler) = setup();
        mock.fail(methods::SWITCH_CHAIN, ProviderError::user_rejected());

        assert!(!reconciler.ensure_chain(&client, Some(1)).await);
        assert_eq!(mock.count(methods::ADD_CHAIN), 0);
    }

    #[tokio::test]
    async fn test_in_flight_guard_skips_provider() {
        let (mock, client, reconciler) = setup();
        let guard = reconciler.try_begin().unwrap();
        assert!(reconciler.is_switching());
        assert!(reconciler.try_begin().is_none());

        assert!(!reconciler.ensure_chain(&client, Some(1)).await);
        assert!(mock.calls().is_empty());

        drop(guard);
        assert!(!reconciler.is_switching());
    }
}
