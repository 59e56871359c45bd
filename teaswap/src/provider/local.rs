//! Local EIP-1193 wallet.
//!
//! Provides [`LocalWallet`], an [`Eip1193Provider`] for hosts without a
//! browser extension. Keys come from [`kobe`] (BIP39/BIP44) or a raw private
//! key; signing and RPC go through [`alloy`].
//!
//! The wallet behaves like an injected one: it only knows the chains it was
//! built with or was asked to add, answers `4902` for others, and emits
//! `chainChanged` after a switch.

use std::borrow::Cow;
use std::collections::HashMap;

use alloy::network::Ethereum;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{
    Eip1193Provider, EventKind, Listener, ListenerId, ListenerRegistry, ProviderEvent, RpcRequest,
    methods,
};
use crate::config::{ChainDescriptor, parse_chain_id};
use crate::error::{ConfigError, ProviderError, ProviderResult};

/// Builder for constructing a [`LocalWallet`].
///
/// Created by [`LocalWallet::builder`].
///
/// # Examples
///
/// ```rust,ignore
/// let wallet = LocalWallet::builder()
///     .mnemonic("abandon abandon ...")
///     .index(0)
///     .rpc_url("https://tea-sepolia.g.alchemy.com/public")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct LocalWalletBuilder {
    /// BIP39 mnemonic phrase.
    mnemonic: Option<String>,
    /// BIP39 passphrase (optional "25th word").
    passphrase: Option<String>,
    /// HD derivation index (default 0).
    index: u32,
    /// Raw private key hex string.
    private_key: Option<String>,
    /// JSON-RPC endpoint of the initially active chain.
    rpc_url: Option<String>,
    /// Extra chains the wallet already knows.
    chains: Vec<ChainDescriptor>,
}

impl LocalWalletBuilder {
    /// Set the BIP39 mnemonic phrase for HD key derivation.
    #[must_use]
    pub fn mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(mnemonic.into());
        self
    }

    /// Set the BIP39 passphrase.
    #[must_use]
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Set the HD derivation index (default 0).
    #[must_use]
    pub const fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Set the private key directly (hex string, with or without 0x prefix).
    #[must_use]
    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Set the JSON-RPC endpoint of the initially active chain.
    #[must_use]
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Pre-register a chain, as if the user had added it before.
    #[must_use]
    pub fn chain(mut self, chain: ChainDescriptor) -> Self {
        self.chains.push(chain);
        self
    }

    /// Build the [`LocalWallet`].
    ///
    /// Either `mnemonic` or `private_key` must be set. `rpc_url` is required;
    /// its chain id is queried and becomes the active chain.
    pub async fn build(mut self) -> crate::Result<LocalWallet> {
        let rpc_url = self
            .rpc_url
            .take()
            .ok_or_else(|| ConfigError::invalid("rpc_url is required"))?;

        let signer = if let Some(ref mnemonic) = self.mnemonic {
            self.signer_from_mnemonic(mnemonic)?
        } else if let Some(ref key) = self.private_key {
            Self::signer_from_private_key(key)?
        } else {
            return Err(ConfigError::invalid("either mnemonic or private_key is required").into());
        };

        let provider = connect(&signer, &rpc_url)?;
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| rpc_error(&e))?;

        let wallet = LocalWallet::assemble(
            signer,
            ActiveChain { chain_id, provider },
            rpc_url,
            &self.chains,
        );
        info!(
            address = %wallet.address,
            chain_id = chain_id,
            "local wallet initialized",
        );
        Ok(wallet)
    }

    /// Derive a signer from a BIP39 mnemonic using kobe.
    fn signer_from_mnemonic(&self, mnemonic: &str) -> Result<PrivateKeySigner, ConfigError> {
        let wallet = kobe::Wallet::from_mnemonic(mnemonic, self.passphrase.as_deref())
            .map_err(|e| ConfigError::invalid(format!("invalid mnemonic: {e}")))?;

        let deriver = kobe_eth::Deriver::new(&wallet);
        let derived = deriver
            .derive(self.index)
            .map_err(|e| ConfigError::invalid(format!("key derivation failed: {e}")))?;

        let key_hex = &*derived.private_key_hex;
        key_hex
            .parse::<PrivateKeySigner>()
            .map_err(|e| ConfigError::invalid(format!("signer creation failed: {e}")))
    }

    /// Create a signer from a raw private key hex string.
    fn signer_from_private_key(key: &str) -> Result<PrivateKeySigner, ConfigError> {
        let key = key.strip_prefix("0x").unwrap_or(key);
        key.parse::<PrivateKeySigner>()
            .map_err(|e| ConfigError::invalid(format!("invalid private key: {e}")))
    }
}

struct ActiveChain {
    chain_id: u64,
    provider: DynProvider<Ethereum>,
}

/// A key held in-process, exposed through the [`Eip1193Provider`] interface.
///
/// Account requests never prompt: the single derived account is always
/// authorized.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    address: Address,
    known: RwLock<HashMap<u64, String>>,
    active: RwLock<ActiveChain>,
    listeners: ListenerRegistry,
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalWallet {
    /// Create a builder for constructing a [`LocalWallet`].
    #[must_use]
    pub fn builder() -> LocalWalletBuilder {
        LocalWalletBuilder::default()
    }

    /// The wallet's address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Assemble a wallet around an already-connected active chain.
    ///
    /// `chains` are registered as known; the active chain always is.
    fn assemble(
        signer: PrivateKeySigner,
        active: ActiveChain,
        rpc_url: String,
        chains: &[ChainDescriptor],
    ) -> Self {
        let mut known: HashMap<u64, String> = chains
            .iter()
            .filter_map(|chain| Some((chain.chain_id, chain.rpc_url()?.to_owned())))
            .collect();
        known.insert(active.chain_id, rpc_url);

        Self {
            address: signer.address(),
            signer,
            known: RwLock::new(known),
            active: RwLock::new(active),
            listeners: ListenerRegistry::new(),
        }
    }

    /// The active chain id.
    pub async fn chain_id(&self) -> u64 {
        self.active.read().await.chain_id
    }

    async fn provider(&self) -> DynProvider<Ethereum> {
        self.active.read().await.provider.clone()
    }

    async fn switch_chain(&self, request: &RpcRequest) -> ProviderResult<Value> {
        let chain_id = request
            .param(0)
            .and_then(|p| p.get("chainId"))
            .and_then(parse_chain_id)
            .ok_or_else(|| ProviderError::invalid_params("expected [{ chainId }]"))?;

        if self.chain_id().await == chain_id {
            return Ok(Value::Null);
        }

        let url = self
            .known
            .read()
            .await
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| ProviderError::unrecognized_chain(chain_id))?;

        let provider = connect(&self.signer, &url)?;
        *self.active.write().await = ActiveChain { chain_id, provider };
        info!(chain_id = chain_id, rpc_url = %url, "switched active chain");

        self.listeners.emit(&ProviderEvent::ChainChanged(chain_id));
        Ok(Value::Null)
    }

    async fn add_chain(&self, request: &RpcRequest) -> ProviderResult<Value> {
        let chain: ChainDescriptor = request
            .param(0)
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| ProviderError::invalid_params("expected [chain]"))?;
        let url = chain
            .rpc_url()
            .ok_or_else(|| ProviderError::invalid_params("rpcUrls must not be empty"))?
            .to_owned();

        self.known.write().await.insert(chain.chain_id, url);
        info!(chain_id = chain.chain_id, name = %chain.chain_name, "chain added");

        let switch = RpcRequest::new(
            methods::SWITCH_CHAIN,
            json!([{ "chainId": chain.hex_chain_id() }]),
        );
        self.switch_chain(&switch).await
    }

    async fn send_transaction(&self, request: &RpcRequest) -> ProviderResult<Value> {
        let tx: TransactionRequest = request
            .param(0)
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| ProviderError::invalid_params("expected [transaction]"))?;

        if tx.from.is_some_and(|from| from != self.address) {
            return Err(ProviderError::rpc(
                ProviderError::UNAUTHORIZED,
                "transaction sender is not an authorized account",
            ));
        }

        let pending = self
            .provider()
            .await
            .send_transaction(tx)
            .await
            .map_err(|e| rpc_error(&e))?;
        let hash = *pending.tx_hash();
        debug!(tx_hash = %hash, "transaction broadcast");
        Ok(json!(hash))
    }

    async fn forward(&self, request: RpcRequest) -> ProviderResult<Value> {
        self.provider()
            .await
            .raw_request::<Value, Value>(Cow::Owned(request.method), request.params)
            .await
            .map_err(|e| rpc_error(&e))
    }
}

#[async_trait]
impl Eip1193Provider for LocalWallet {
    async fn request(&self, request: RpcRequest) -> ProviderResult<Value> {
        debug!(method = %request.method, "local wallet request");
        match request.method.as_str() {
            methods::REQUEST_ACCOUNTS | methods::ACCOUNTS => Ok(json!([self.address])),
            methods::CHAIN_ID => Ok(json!(format!("{:#x}", self.chain_id().await))),
            methods::SWITCH_CHAIN => self.switch_chain(&request).await,
            methods::ADD_CHAIN => self.add_chain(&request).await,
            methods::SEND_TRANSACTION => self.send_transaction(&request).await,
            _ => self.forward(request).await,
        }
    }

    fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// Build a signing HTTP provider against `url`.
///
/// Nothing is sent until the first request.
fn connect(signer: &PrivateKeySigner, url: &str) -> ProviderResult<DynProvider<Ethereum>> {
    let endpoint = url.parse().map_err(|_| {
        ProviderError::rpc(
            ProviderError::DISCONNECTED,
            format!("invalid RPC URL '{url}'"),
        )
    })?;
    let provider = ProviderBuilder::new()
        .wallet(signer.clone())
        .connect_http(endpoint)
        .erased();
    Ok(provider)
}

/// Map an alloy transport error onto an EIP-1193 error.
fn rpc_error(err: &TransportError) -> ProviderError {
    err.as_error_resp().map_or_else(
        || ProviderError::internal(err.to_string()),
        |payload| ProviderError::rpc(payload.code, payload.message.to_string()),
    )
}
