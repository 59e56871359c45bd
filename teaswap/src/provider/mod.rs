//! Wallet provider adapter.
//!
//! This module models the browser-injected EIP-1193 provider as a trait and
//! builds a typed client on top of it.
//!
//! # Architecture
//!
//! ```text
//! Eip1193Provider (request / on / remove_listener)
//!   ├── LocalWallet   → alloy HTTP provider + local signer
//!   └── (host impls)  → e.g. a wasm-bindgen wrapper of window.okxwallet
//!
//! WalletClient (typed calls over Arc<dyn Eip1193Provider>)
//!   ├── request_accounts() / accounts() / chain_id()
//!   ├── switch_chain() / add_chain()
//!   ├── balance() / erc20_balance()
//!   └── send_transaction() / wait_for_receipt()
//! ```
//!
//! # Events
//!
//! Providers push `accountsChanged` and `chainChanged` to registered
//! [`Listener`]s. Listeners run synchronously inside the provider, so they
//! should only forward the event (see [`crate::events::EventSubscription`]).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderResult;

mod client;
mod local;
#[cfg(test)]
pub(crate) mod mock;

pub use client::{ReceiptStatus, WalletClient};
pub use local::{LocalWallet, LocalWalletBuilder};

/// JSON-RPC method names used by the widget.
pub mod methods {
    /// Prompt the user for account access.
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    /// List already-authorized accounts without prompting.
    pub const ACCOUNTS: &str = "eth_accounts";
    /// Active chain id.
    pub const CHAIN_ID: &str = "eth_chainId";
    /// Ask the wallet to switch chains (EIP-3326).
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    /// Ask the wallet to register a chain (EIP-3085).
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    /// Native balance.
    pub const GET_BALANCE: &str = "eth_getBalance";
    /// Read-only contract call.
    pub const CALL: &str = "eth_call";
    /// Sign and broadcast a transaction.
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    /// Mined transaction receipt.
    pub const GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
}

/// A request passed to [`Eip1193Provider::request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Method name.
    pub method: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Create a request with parameters.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Create a request without parameters.
    #[must_use]
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Array(Vec::new()))
    }

    /// The `index`-th positional parameter.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.as_array().and_then(|params| params.get(index))
    }
}

/// Kinds of provider-pushed events the widget listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The authorized account list changed.
    AccountsChanged,
    /// The active chain changed.
    ChainChanged,
}

impl EventKind {
    /// Event name as emitted by injected providers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
        }
    }
}

/// An event pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// New list of authorized accounts; empty when the wallet locked or
    /// revoked access.
    AccountsChanged(Vec<Address>),
    /// New active chain id.
    ChainChanged(u64),
}

impl ProviderEvent {
    /// The kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::AccountsChanged(_) => EventKind::AccountsChanged,
            Self::ChainChanged(_) => EventKind::ChainChanged,
        }
    }
}

/// Callback registered with [`Eip1193Provider::on`].
pub type Listener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Handle returned by [`Eip1193Provider::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An EIP-1193 style wallet provider.
///
/// Implement this trait to plug a wallet into the widget. Errors carry the
/// EIP-1193 / JSON-RPC code (`4001` rejected, `4902` unknown chain, ...).
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Submit a JSON-RPC request and return its `result`.
    async fn request(&self, request: RpcRequest) -> ProviderResult<Value>;

    /// Register a listener for `kind` events.
    fn on(&self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Unregister a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

/// Listener bookkeeping shared by provider implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, EventKind, Listener)>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind, listener));
        id
    }

    /// Unregister a listener, returning whether it was present.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener of its kind.
    pub fn emit(&self, event: &ProviderEvent) {
        let targets: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind())
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        for listener in targets {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_registry_dispatches_by_kind() {
        let registry = ListenerRegistry::new();
        let chain_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&chain_hits);
        let id = registry.add(
            EventKind::ChainChanged,
            Arc::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        registry.add(EventKind::AccountsChanged, Arc::new(|_| {}));

        registry.emit(&ProviderEvent::ChainChanged(1));
        registry.emit(&ProviderEvent::AccountsChanged(vec![]));
        assert_eq!(chain_hits.load(Ordering::SeqCst), 1);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.emit(&ProviderEvent::ChainChanged(2));
        assert_eq!(chain_hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_request_params() {
        let request = RpcRequest::new("eth_getBalance", serde_json::json!(["0x01", "latest"]));
        assert_eq!(request.param(1), Some(&Value::from("latest")));
        assert!(request.param(2).is_none());
        assert!(RpcRequest::bare("eth_accounts").param(0).is_none());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::AccountsChanged.as_str(), "accountsChanged");
        assert_eq!(ProviderEvent::ChainChanged(1).kind().as_str(), "chainChanged");
    }
}
