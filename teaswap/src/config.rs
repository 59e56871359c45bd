//! Widget configuration.
//!
//! [`SwapConfig::default`] describes the TEA Sepolia deployment. A JSON file
//! with the same shape can override any field via [`SwapConfig::from_file`].

use std::path::Path;
use std::time::Duration;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::token::TokenCatalog;

/// TEA Sepolia chain id.
pub const TEA_SEPOLIA_CHAIN_ID: u64 = 10218;

/// Deployed swap contract on TEA Sepolia.
pub const SWAP_CONTRACT: Address = address!("0x390C68e433EDeFc6532BA9096A17fA2c7dA7Df71");

/// Local storage key of the auto-reconnect flag.
pub const SHOULD_CONNECT_KEY: &str = "tea_swap_should_connect";

/// Store page of the supported wallet extension.
pub const OKX_WALLET_LINK: &str =
    "https://chromewebstore.google.com/detail/okx-wallet/mcohilncbfahbmgdjkbpemcciiolgcge";

/// Native currency metadata of a chain (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name.
    pub name: String,
    /// Currency symbol.
    pub symbol: String,
    /// Decimals of the base unit.
    pub decimals: u8,
}

/// A chain the wallet must be on, in `wallet_addEthereumChain` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// Chain id, serialized as a `0x` prefixed hex quantity.
    #[serde(with = "hex_chain_id")]
    pub chain_id: u64,
    /// Display name.
    pub chain_name: String,
    /// Native currency metadata.
    pub native_currency: NativeCurrency,
    /// JSON-RPC endpoints.
    pub rpc_urls: Vec<String>,
    /// Block explorer base URLs.
    pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    /// The TEA Sepolia test network.
    #[must_use]
    pub fn tea_sepolia() -> Self {
        Self {
            chain_id: TEA_SEPOLIA_CHAIN_ID,
            chain_name: "TEA Sepolia".into(),
            native_currency: NativeCurrency {
                name: "TEA".into(),
                symbol: "TEA".into(),
                decimals: 18,
            },
            rpc_urls: vec!["https://tea-sepolia.g.alchemy.com/public".into()],
            block_explorer_urls: vec!["https://sepolia.tea.xyz/".into()],
        }
    }

    /// Chain id as the hex quantity wallets expect.
    #[must_use]
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// First RPC endpoint, if any.
    #[must_use]
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    /// First block explorer URL, if any.
    #[must_use]
    pub fn explorer_url(&self) -> Option<&str> {
        self.block_explorer_urls.first().map(String::as_str)
    }
}

/// Parse a chain id as sent by wallets: hex string, decimal string or number.
#[must_use]
pub fn parse_chain_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => parse_chain_id_str(s),
        _ => None,
    }
}

fn parse_chain_id_str(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

mod hex_chain_id {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{id:#x}"))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        super::parse_chain_id(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid chain id: {value}")))
    }
}

/// Configuration for the swap widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SwapConfig {
    /// The chain swaps must happen on.
    pub chain: ChainDescriptor,
    /// Swap contract receiving native transfers and ERC-20 swap calls.
    pub swap_contract: Address,
    /// Units of the ERC-20 token per unit of native currency.
    pub rate: u64,
    /// Decimal places of the derived output amount.
    pub output_precision: usize,
    /// Decimal places used when displaying balances.
    pub balance_precision: usize,
    /// Storage key of the auto-reconnect flag.
    pub storage_key: String,
    /// Wallet name shown in prompts.
    pub wallet_name: String,
    /// Where users are sent when no wallet is present.
    pub wallet_install_url: String,
    /// Delay between transaction receipt polls, in milliseconds.
    pub receipt_poll_interval_ms: u64,
    /// The two tradable tokens.
    pub tokens: TokenCatalog,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            chain: ChainDescriptor::tea_sepolia(),
            swap_contract: SWAP_CONTRACT,
            rate: 100,
            output_precision: 6,
            balance_precision: 4,
            storage_key: SHOULD_CONNECT_KEY.into(),
            wallet_name: "OKX Wallet".into(),
            wallet_install_url: OKX_WALLET_LINK.into(),
            receipt_poll_interval_ms: 1_000,
            tokens: TokenCatalog::default(),
        }
    }
}

impl SwapConfig {
    /// Load a configuration from a JSON file and validate it.
    ///
    /// Missing fields fall back to the TEA Sepolia defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        self.tokens.validate()?;
        if self.rate == 0 {
            return Err(ConfigError::invalid("rate must be greater than zero"));
        }
        if self.swap_contract.is_zero() {
            return Err(ConfigError::invalid("swapContract must not be the zero address"));
        }
        if self.chain.rpc_urls.is_empty() {
            return Err(ConfigError::invalid("chain.rpcUrls must not be empty"));
        }
        Ok(())
    }

    /// Receipt poll interval.
    #[must_use]
    pub const fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Explorer link for a transaction hash.
    #[must_use]
    pub fn explorer_tx_url(&self, hash: &str) -> String {
        let base = self.chain.explorer_url().unwrap_or_default();
        format!("{}/tx/{hash}", base.trim_end_matches('/'))
    }
}
