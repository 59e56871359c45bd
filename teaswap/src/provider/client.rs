//! Typed calls over an [`Eip1193Provider`].

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U64, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::sol_types::SolCall;
use futures_timer::Delay;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{Eip1193Provider, RpcRequest, methods};
use crate::config::{ChainDescriptor, parse_chain_id};
use crate::error::{ProviderError, ProviderResult, Result, SwapError};

#[allow(missing_docs)]
mod abi {
    alloy::sol! {
        interface IERC20 {
            function approve(address spender, uint256 amount) external returns (bool);
            function balanceOf(address account) external view returns (uint256);
        }

        interface ITeaSwap {
            function swapSCIDtoTEA(uint256 amount) external;
        }
    }
}

pub(crate) use abi::{IERC20, ITeaSwap};

/// The parts of a transaction receipt the widget inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptStatus {
    /// Hash of the mined transaction.
    pub transaction_hash: TxHash,
    /// Block the transaction was mined in.
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `1` on success, `0` on revert; absent before Byzantium.
    #[serde(default)]
    pub status: Option<U64>,
}

impl ReceiptStatus {
    /// Whether the transaction executed successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status.is_none_or(|status| status == U64::from(1))
    }
}

/// Typed wallet client.
///
/// Wraps a shared provider and exposes the handful of calls the widget makes.
/// Cloning is cheap.
#[derive(Clone)]
pub struct WalletClient {
    provider: Arc<dyn Eip1193Provider>,
    poll_interval: Duration,
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletClient")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl WalletClient {
    /// Default delay between receipt polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Wrap a provider.
    pub fn new(provider: Arc<dyn Eip1193Provider>) -> Self {
        Self {
            provider,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the receipt poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &Arc<dyn Eip1193Provider> {
        &self.provider
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let result = self.provider.request(RpcRequest::new(method, params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Prompt the user for account access (`eth_requestAccounts`).
    pub async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.call(methods::REQUEST_ACCOUNTS, json!([])).await
    }

    /// Already-authorized accounts, without prompting (`eth_accounts`).
    pub async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        self.call(methods::ACCOUNTS, json!([])).await
    }

    /// Active chain id.
    pub async fn chain_id(&self) -> ProviderResult<u64> {
        let value: Value = self.call(methods::CHAIN_ID, json!([])).await?;
        parse_chain_id(&value)
            .ok_or_else(|| ProviderError::internal(format!("invalid chain id: {value}")))
    }

    /// Ask the wallet to switch to `chain_id`.
    pub async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()> {
        let params = json!([{ "chainId": format!("{chain_id:#x}") }]);
        self.provider
            .request(RpcRequest::new(methods::SWITCH_CHAIN, params))
            .await?;
        Ok(())
    }

    /// Ask the wallet to register (and switch to) `chain`.
    pub async fn add_chain(&self, chain: &ChainDescriptor) -> ProviderResult<()> {
        let params = Value::Array(vec![serde_json::to_value(chain)?]);
        self.provider
            .request(RpcRequest::new(methods::ADD_CHAIN, params))
            .await?;
        Ok(())
    }

    /// Native currency balance of `owner`, in base units.
    pub async fn balance(&self, owner: Address) -> ProviderResult<U256> {
        self.call(methods::GET_BALANCE, json!([owner, "latest"]))
            .await
    }

    /// ERC-20 `balanceOf(owner)` of `token`, in base units.
    pub async fn erc20_balance(&self, token: Address, owner: Address) -> ProviderResult<U256> {
        let data = Bytes::from(IERC20::balanceOfCall { account: owner }.abi_encode());
        let output: Bytes = self
            .call(methods::CALL, json!([{ "to": token, "data": data }, "latest"]))
            .await?;
        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| ProviderError::internal(format!("invalid balanceOf output: {e}")))
    }

    /// Submit a transaction for signing and return its hash.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> ProviderResult<TxHash> {
        let params = Value::Array(vec![serde_json::to_value(tx)?]);
        self.call(methods::SEND_TRANSACTION, params).await
    }

    /// Poll until `hash` is mined.
    ///
    /// There is no timeout: an unmined transaction keeps this pending.
    /// A mined transaction with a failed status is an error.
    pub async fn wait_for_receipt(&self, hash: TxHash) -> Result<ReceiptStatus> {
        loop {
            let value = self
                .provider
                .request(RpcRequest::new(methods::GET_TRANSACTION_RECEIPT, json!([hash])))
                .await?;

            if !value.is_null() {
                let receipt: ReceiptStatus =
                    serde_json::from_value(value).map_err(ProviderError::from)?;
                if !receipt.succeeded() {
                    return Err(SwapError::Reverted(hash).into());
                }
                debug!(tx_hash = %hash, block = ?receipt.block_number, "transaction confirmed");
                return Ok(receipt);
            }

            debug!(tx_hash = %hash, "receipt not yet available");
            Delay::new(self.poll_interval).await;
        }
    }

    /// Send `value` of native currency from `from` to `to` and wait for it.
    pub async fn transfer_native(&self, from: Address, to: Address, value: U256) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_value(value);
        let hash = self.send_transaction(&tx).await?;
        info!(tx_hash = %hash, to = %to, value = %value, "native transfer submitted");
        self.wait_for_receipt(hash).await?;
        Ok(hash)
    }

    /// Approve `spender` for exactly `amount` of `token` and wait for it.
    pub async fn approve(
        &self,
        from: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let data = IERC20::approveCall { spender, amount }.abi_encode();
        let hash = self.send_transaction(&contract_call(from, token, data)).await?;
        info!(tx_hash = %hash, token = %token, spender = %spender, "approval submitted");
        self.wait_for_receipt(hash).await?;
        Ok(hash)
    }

    /// Call `swapSCIDtoTEA(amount)` on the swap contract and wait for it.
    pub async fn swap_token_for_native(
        &self,
        from: Address,
        swap_contract: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let data = ITeaSwap::swapSCIDtoTEACall { amount }.abi_encode();
        let hash = self
            .send_transaction(&contract_call(from, swap_contract, data))
            .await?;
        info!(tx_hash = %hash, contract = %swap_contract, "swap call submitted");
        self.wait_for_receipt(hash).await?;
        Ok(hash)
    }
}

fn contract_call(from: Address, to: Address, data: Vec<u8>) -> TransactionRequest {
    // Injected wallets read `data`, nodes read `input`.
    TransactionRequest::default()
        .with_from(from)
        .with_to(to)
        .input(TransactionInput::both(Bytes::from(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockProvider, receipt};
    use alloy::primitives::{address, b256};

    const OWNER: Address = address!("0x1111111111111111111111111111111111111111");
    const TOKEN: Address = address!("0x3f448B168F43261e9e95720485C6BA9886E55482");

    fn client(mock: &Arc<MockProvider>) -> WalletClient {
        WalletClient::new(Arc::clone(mock) as Arc<dyn Eip1193Provider>)
            .with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_chain_id_accepts_hex() {
        let mock = Arc::new(MockProvider::new());
        mock.respond(methods::CHAIN_ID, json!("0x27EA"));
        assert_eq!(client(&mock).chain_id().await.unwrap(), 10218);
    }

    #[tokio::test]
    async fn test_switch_chain_params() {
        let mock = Arc::new(MockProvider::new());
        mock.respond(methods::SWITCH_CHAIN, Value::Null);
        client(&mock).switch_chain(10218).await.unwrap();

        let calls = mock.calls_to(methods::SWITCH_CHAIN);
        assert_eq!(calls[0].params, json!([{ "chainId": "0x27ea" }]));
    }

    #[tokio::test]
    async fn test_erc20_balance_decodes_output() {
        let mock = Arc::new(MockProvider::new());
        let encoded = format!("0x{:064x}", 5_000u64);
        mock.respond(methods::CALL, json!(encoded));

        let balance = client(&mock).erc20_balance(TOKEN, OWNER).await.unwrap();
        assert_eq!(balance, U256::from(5_000u64));

        let call = &mock.calls_to(methods::CALL)[0];
        let data = call.param(0).unwrap()["data"].as_str().unwrap().to_owned();
        assert!(data.starts_with("0x70a08231"));
        assert_eq!(call.param(1), Some(&json!("latest")));
    }

    #[tokio::test]
    async fn test_wait_for_receipt_polls_until_mined() {
        let mock = Arc::new(MockProvider::new());
        let hash = b256!("0x00000000000000000000000000000000000000000000000000000000000000aa");
        mock.push(methods::GET_TRANSACTION_RECEIPT, Ok(Value::Null));
        mock.respond(methods::GET_TRANSACTION_RECEIPT, receipt(hash, true));

        let status = client(&mock).wait_for_receipt(hash).await.unwrap();
        assert!(status.succeeded());
        assert_eq!(mock.count(methods::GET_TRANSACTION_RECEIPT), 2);
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_an_error() {
        let mock = Arc::new(MockProvider::new());
        let hash = b256!("0x00000000000000000000000000000000000000000000000000000000000000bb");
        mock.respond(methods::GET_TRANSACTION_RECEIPT, receipt(hash, false));

        let err = client(&mock).wait_for_receipt(hash).await.unwrap_err();
        assert!(matches!(err, crate::Error::Swap(SwapError::Reverted(h)) if h == hash));
    }

    #[tokio::test]
    async fn test_approve_encodes_exact_amount() {
        let mock = Arc::new(MockProvider::new());
        let hash = b256!("0x00000000000000000000000000000000000000000000000000000000000000cc");
        mock.respond(methods::SEND_TRANSACTION, json!(hash));
        mock.respond(methods::GET_TRANSACTION_RECEIPT, receipt(hash, true));

        let spender = address!("0x390C68e433EDeFc6532BA9096A17fA2c7dA7Df71");
        let amount = U256::from(42u64);
        client(&mock)
            .approve(OWNER, TOKEN, spender, amount)
            .await
            .unwrap();

        let tx = mock.calls_to(methods::SEND_TRANSACTION)[0]
            .param(0)
            .cloned()
            .unwrap();
        let expected = Bytes::from(IERC20::approveCall { spender, amount }.abi_encode());
        assert_eq!(tx["data"], json!(expected));
        assert_eq!(tx["input"], json!(expected));
        assert_eq!(tx["to"], json!(TOKEN));
    }
}
