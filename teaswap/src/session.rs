//! Wallet connection session.
//!
//! Tracks the connected account and chain, persists the auto-reconnect flag
//! and reacts to wallet-pushed events.
//!
//! # States
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──▶ Connected(WrongChain) ──switch──▶ Connected(RightChain)
//!      ▲                                            │                               │
//!      └──────── disconnect() / accountsChanged([]) ┴───────────────────────────────┘
//! ```
//!
//! `disconnect()` is a local reset: injected providers expose no way to
//! revoke a site's permissions.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::SwapConfig;
use crate::events::EventSubscription;
use crate::network::NetworkReconciler;
use crate::provider::{Eip1193Provider, ProviderEvent, WalletClient};
use crate::storage::{AutoReconnect, FlagStore};
use crate::view::{Notice, NoticeBoard};

/// Whether the wallet sits on the required chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Active chain differs from the required one (or is unknown).
    WrongChain,
    /// Active chain is the required one.
    RightChain,
}

/// Connection state derived from a [`SessionSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No account connected.
    Disconnected,
    /// Waiting for the wallet to grant account access.
    Connecting,
    /// An account is connected.
    Connected(NetworkStatus),
}

/// Point-in-time copy of the session, for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Connected account.
    pub address: Option<Address>,
    /// Active chain as last reported by the wallet.
    pub chain_id: Option<u64>,
    /// Whether an account is connected.
    pub connected: bool,
    /// Whether a connection request is pending.
    pub connecting: bool,
    /// Whether a network switch is in flight.
    pub switching: bool,
}

impl SessionSnapshot {
    /// Derive the state machine position for `required_chain`.
    #[must_use]
    pub const fn state(&self, required_chain: u64) -> ConnectionState {
        if self.connected {
            match self.chain_id {
                Some(id) if id == required_chain => {
                    ConnectionState::Connected(NetworkStatus::RightChain)
                }
                _ => ConnectionState::Connected(NetworkStatus::WrongChain),
            }
        } else if self.connecting {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    address: Option<Address>,
    chain_id: Option<u64>,
    connected: bool,
    connecting: bool,
}

/// The wallet connection session.
///
/// Methods take `&self`; share it behind an `Arc` between the UI and the
/// event loop. State changes happen between awaited provider calls, never
/// during one.
pub struct WalletSession {
    client: Option<WalletClient>,
    config: Arc<SwapConfig>,
    reconciler: NetworkReconciler,
    flag: AutoReconnect,
    notices: Arc<NoticeBoard>,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("has_provider", &self.client.is_some())
            .field("reconciler", &self.reconciler)
            .field("flag", &self.flag)
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// Create a session.
    ///
    /// `provider` is `None` when no wallet is installed. Nothing is queried
    /// until [`restore`](Self::restore) or [`connect`](Self::connect).
    pub fn new(
        provider: Option<Arc<dyn Eip1193Provider>>,
        store: Arc<dyn FlagStore>,
        config: SwapConfig,
    ) -> Self {
        let client = provider.map(|provider| {
            WalletClient::new(provider).with_poll_interval(config.receipt_poll_interval())
        });
        let flag = AutoReconnect::new(store, config.storage_key.clone());
        Self {
            client,
            reconciler: NetworkReconciler::new(config.chain.clone()),
            flag,
            notices: Arc::new(NoticeBoard::new()),
            state: RwLock::new(SessionState::default()),
            config: Arc::new(config),
        }
    }

    /// Share a notice board with other components.
    #[must_use]
    pub fn with_notices(mut self, notices: Arc<NoticeBoard>) -> Self {
        self.notices = notices;
        self
    }

    /// The wallet client, if a provider is present.
    #[must_use]
    pub const fn client(&self) -> Option<&WalletClient> {
        self.client.as_ref()
    }

    /// Whether a wallet provider is present.
    #[must_use]
    pub const fn has_provider(&self) -> bool {
        self.client.is_some()
    }

    /// Widget configuration.
    #[must_use]
    pub const fn config(&self) -> &Arc<SwapConfig> {
        &self.config
    }

    /// Notices raised by this session.
    #[must_use]
    pub const fn notices(&self) -> &Arc<NoticeBoard> {
        &self.notices
    }

    /// Network reconciler for the required chain.
    #[must_use]
    pub const fn reconciler(&self) -> &NetworkReconciler {
        &self.reconciler
    }

    /// Current session values.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            address: state.address,
            chain_id: state.chain_id,
            connected: state.connected,
            connecting: state.connecting,
            switching: self.reconciler.is_switching(),
        }
    }

    /// Current state machine position.
    pub async fn state(&self) -> ConnectionState {
        self.snapshot()
            .await
            .state(self.reconciler.required().chain_id)
    }

    /// Whether the connected wallet is on the required chain.
    pub async fn is_on_required_chain(&self) -> bool {
        let state = self.state.read().await;
        state.connected && self.reconciler.is_required(state.chain_id)
    }

    /// Whether the durable auto-reconnect flag is set.
    pub async fn auto_reconnect(&self) -> bool {
        self.flag.is_set().await
    }

    /// Request account access and connect.
    ///
    /// Returns `false` (and raises a notice) when no wallet is present or the
    /// request fails. On success the auto-reconnect flag is persisted and, if
    /// the wallet is on another chain, a switch is attempted.
    pub async fn connect(&self) -> bool {
        let Some(client) = &self.client else {
            warn!("no wallet provider available");
            self.notices.push(self.install_notice());
            return false;
        };

        self.state.write().await.connecting = true;
        let result = Self::establish(client).await;

        let chain_id = {
            let mut state = self.state.write().await;
            state.connecting = false;
            match result {
                Ok(Some((address, chain_id))) => {
                    state.address = Some(address);
                    state.chain_id = Some(chain_id);
                    state.connected = true;
                    info!(address = %address, chain_id = chain_id, "wallet connected");
                    chain_id
                }
                Ok(None) => {
                    warn!("wallet returned no accounts");
                    return false;
                }
                Err(e) => {
                    error!(error = %e, "connection failed");
                    state.connected = false;
                    drop(state);
                    self.notices.push(Notice::ConnectFailed);
                    return false;
                }
            }
        };

        self.flag.enable().await;

        if !self.reconciler.is_required(Some(chain_id)) {
            info!(
                chain_id = chain_id,
                required = self.reconciler.required().chain_id,
                "not on the required network, attempting to switch"
            );
            self.switch_network(client, Some(chain_id)).await;
        }
        true
    }

    async fn establish(client: &WalletClient) -> crate::Result<Option<(Address, u64)>> {
        let accounts = client.request_accounts().await?;
        let Some(&address) = accounts.first() else {
            return Ok(None);
        };
        let chain_id = client.chain_id().await?;
        Ok(Some((address, chain_id)))
    }

    /// Forget the connection and clear the auto-reconnect flag.
    pub async fn disconnect(&self) {
        info!("disconnecting wallet (clearing local state)");
        self.flag.clear().await;
        *self.state.write().await = SessionState::default();
    }

    /// Silently re-establish a previous session on load.
    ///
    /// Only when the auto-reconnect flag is set and the wallet already lists
    /// an authorized account (`eth_accounts`, no prompt) is
    /// [`connect`](Self::connect) called.
    pub async fn restore(&self) -> bool {
        if !self.flag.is_set().await {
            debug!("auto-reconnect flag not set");
            return false;
        }
        let Some(client) = &self.client else {
            return false;
        };

        match client.accounts().await {
            Ok(accounts) if !accounts.is_empty() => self.connect().await,
            Ok(_) => {
                debug!("no authorized accounts to restore");
                false
            }
            Err(e) => {
                error!(error = %e, "initial connection check failed");
                false
            }
        }
    }

    /// Switch networks if connected on the wrong chain.
    ///
    /// Returns whether the wallet ends up on the required chain. Skipped
    /// while another switch is in flight.
    pub async fn reconcile(&self) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        let snapshot = self.snapshot().await;
        if !snapshot.connected {
            return false;
        }
        if self.reconciler.is_required(snapshot.chain_id) {
            return true;
        }
        if snapshot.switching {
            debug!("network switch already in flight");
            return false;
        }

        info!(chain_id = ?snapshot.chain_id, "network mismatch detected");
        self.switch_network(client, snapshot.chain_id).await
    }

    async fn switch_network(&self, client: &WalletClient, current: Option<u64>) -> bool {
        let switched = self.reconciler.ensure_chain(client, current).await;
        if switched {
            let mut state = self.state.write().await;
            if state.connected {
                state.chain_id = Some(self.reconciler.required().chain_id);
            }
        }
        switched
    }

    /// Register the `accountsChanged` / `chainChanged` listeners.
    ///
    /// Returns `None` without a provider. Drop the subscription to unregister.
    #[must_use]
    pub fn subscribe(&self) -> Option<EventSubscription> {
        self.client
            .as_ref()
            .map(|client| EventSubscription::new(Arc::clone(client.provider())))
    }

    /// Apply one wallet-pushed event.
    pub async fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => {
                if accounts.is_empty() {
                    info!("wallet reported no accounts");
                    self.disconnect().await;
                } else if self.flag.is_set().await {
                    debug!(accounts = accounts.len(), "accounts changed, reconnecting");
                    self.connect().await;
                }
            }
            ProviderEvent::ChainChanged(chain_id) => {
                info!(chain_id = chain_id, "chain changed");
                {
                    let mut state = self.state.write().await;
                    if state.connected {
                        state.chain_id = Some(chain_id);
                    }
                }
                if !self.reconciler.is_required(Some(chain_id)) && self.flag.is_set().await {
                    self.reconcile().await;
                }
            }
        }
    }

    /// Apply every queued event, returning how many were handled.
    pub async fn process_events(&self, subscription: &mut EventSubscription) -> usize {
        let mut handled = 0;
        while let Some(event) = subscription.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Apply events as they arrive until the subscription closes.
    pub async fn run_events(&self, subscription: &mut EventSubscription) {
        while let Some(event) = subscription.recv().await {
            self.handle_event(event).await;
        }
    }

    fn install_notice(&self) -> Notice {
        Notice::InstallWallet {
            wallet: self.config.wallet_name.clone(),
            url: self.config.wallet_install_url.clone(),
        }
    }

    /// Raise the install-wallet notice.
    pub fn prompt_install(&self) {
        self.notices.push(self.install_notice());
    }
}
