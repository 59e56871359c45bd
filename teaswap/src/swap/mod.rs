//! The swap interface.
//!
//! [`SwapForm`] holds what the user typed; [`SwapInterface`] ties it to a
//! [`WalletSession`] to read balances and submit swaps.
//!
//! Selling the native currency is a plain value transfer to the swap
//! contract. Selling the token is two transactions: an exact-amount
//! `approve`, then `swapSCIDtoTEA`, each waited on before the next.

mod form;

pub use form::{Side, SwapForm, TxReceipt, quote};

use std::sync::Arc;

use alloy::primitives::utils::{ParseUnits, format_units, parse_units};
use alloy::primitives::{Address, TxHash, U256};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SwapError};
use crate::provider::WalletClient;
use crate::session::{SessionSnapshot, WalletSession};
use crate::token::Token;
use crate::view::{self, Notice, ReceiptPanel, SwapButton};

/// Why a swap request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The input amount is empty.
    EmptyAmount,
    /// The wallet is not on the required chain.
    WrongChain,
    /// A network switch is in flight.
    Switching,
}

/// Result of [`SwapInterface::execute_swap`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SwapOutcome {
    /// No wallet is installed; the install notice was raised.
    NoWallet,
    /// Not connected; a connection was requested instead of swapping.
    ConnectRequested {
        /// Whether the connection succeeded.
        connected: bool,
    },
    /// Preconditions not met; nothing was sent.
    Skipped(SkipReason),
    /// Every transaction was mined successfully.
    Completed {
        /// Hash of the final transaction.
        hash: TxHash,
    },
    /// A step failed; the swap notice was raised.
    Failed,
}

/// Lookup key for the balances currently shown.
type BalanceKey = (Address, u64, Address, Address);

/// A swap form bound to a wallet session.
#[derive(Debug)]
pub struct SwapInterface {
    session: Arc<WalletSession>,
    form: SwapForm,
    balances_for: Option<BalanceKey>,
}

impl SwapInterface {
    /// Create an interface over `session` with the configured default pair.
    #[must_use]
    pub fn new(session: Arc<WalletSession>) -> Self {
        let form = SwapForm::from_config(session.config());
        Self {
            session,
            form,
            balances_for: None,
        }
    }

    /// The session this interface uses.
    #[must_use]
    pub const fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    /// The form state.
    #[must_use]
    pub const fn form(&self) -> &SwapForm {
        &self.form
    }

    /// Mutable form state, for input edits.
    pub const fn form_mut(&mut self) -> &mut SwapForm {
        &mut self.form
    }

    /// Re-read balances if the account, chain or pair changed since the
    /// last read.
    pub async fn sync_balances(&mut self) -> bool {
        let snapshot = self.session.snapshot().await;
        match self.balance_key(&snapshot) {
            Some(key) if self.balances_for != Some(key) => self.refresh_balances().await,
            _ => false,
        }
    }

    /// Read both balances for the connected account.
    ///
    /// Does nothing unless connected on the required chain. A failed lookup
    /// shows as `"0"` for that side only.
    pub async fn refresh_balances(&mut self) -> bool {
        let snapshot = self.session.snapshot().await;
        let Some(key) = self.balance_key(&snapshot) else {
            return false;
        };
        let (Some(client), Some(owner)) = (self.session.client(), snapshot.address) else {
            return false;
        };

        let (from, to) = futures::join!(
            fetch_balance(client, self.form.token_from(), owner),
            fetch_balance(client, self.form.token_to(), owner),
        );
        debug!(from = %from, to = %to, "balances refreshed");
        self.form.set_balances(from, to);
        self.balances_for = Some(key);
        true
    }

    fn balance_key(&self, snapshot: &SessionSnapshot) -> Option<BalanceKey> {
        if !snapshot.connected || !self.session.reconciler().is_required(snapshot.chain_id) {
            return None;
        }
        Some((
            snapshot.address?,
            snapshot.chain_id?,
            self.form.token_from().address,
            self.form.token_to().address,
        ))
    }

    /// Submit the swap described by the form.
    ///
    /// Without a wallet the install notice is raised; while disconnected a
    /// connection is requested instead. Otherwise the input must be
    /// non-empty, the wallet on the required chain, and no switch in flight.
    /// Failures raise the swap notice and leave the form as it was.
    pub async fn execute_swap(&mut self) -> SwapOutcome {
        let Some(client) = self.session.client().cloned() else {
            warn!("swap requested without a wallet provider");
            self.session.prompt_install();
            return SwapOutcome::NoWallet;
        };

        let snapshot = self.session.snapshot().await;
        let owner = match snapshot.address {
            Some(owner) if snapshot.connected => owner,
            _ => {
                let connected = self.session.connect().await;
                return SwapOutcome::ConnectRequested { connected };
            }
        };

        if let Some(reason) = self.skip_reason(&snapshot) {
            debug!(reason = ?reason, "swap skipped");
            return SwapOutcome::Skipped(reason);
        }

        self.form.set_loading(true);
        self.form.clear_receipt();
        let result = self.submit(&client, owner).await;
        self.form.set_loading(false);

        match result {
            Ok(hash) => {
                info!(
                    tx_hash = %hash,
                    from = %self.form.token_from().symbol,
                    to = %self.form.token_to().symbol,
                    "swap completed"
                );
                self.form.record_receipt(hash);
                self.form.clear_amounts();
                self.balances_for = None;
                SwapOutcome::Completed { hash }
            }
            Err(e) => {
                error!(error = %e, "swap failed");
                self.session.notices().push(Notice::SwapFailed);
                SwapOutcome::Failed
            }
        }
    }

    fn skip_reason(&self, snapshot: &SessionSnapshot) -> Option<SkipReason> {
        if self.form.amount_from().trim().is_empty() {
            Some(SkipReason::EmptyAmount)
        } else if !self.session.reconciler().is_required(snapshot.chain_id) {
            Some(SkipReason::WrongChain)
        } else if snapshot.switching {
            Some(SkipReason::Switching)
        } else {
            None
        }
    }

    async fn submit(&self, client: &WalletClient, owner: Address) -> Result<TxHash> {
        let token = self.form.token_from();
        let amount = parse_amount(self.form.amount_from(), token.decimals)?;
        let contract = self.session.config().swap_contract;

        if token.is_native() {
            client.transfer_native(owner, contract, amount).await
        } else {
            client.approve(owner, token.address, contract, amount).await?;
            client.swap_token_for_native(owner, contract, amount).await
        }
    }

    /// The submit control for the current state.
    pub async fn button(&self) -> SwapButton {
        let snapshot = self.session.snapshot().await;
        view::swap_button(
            self.session.config(),
            self.session.has_provider(),
            &snapshot,
            &self.form,
        )
    }

    /// The success panel, if one is showing.
    #[must_use]
    pub fn receipt_panel(&self) -> Option<ReceiptPanel> {
        view::receipt_panel(self.session.config(), &self.form)
    }
}

/// Convert a decimal amount to base units.
///
/// # Errors
///
/// Returns [`SwapError::InvalidAmount`] for non-numeric or negative input.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let invalid = || SwapError::InvalidAmount(amount.to_owned());
    match parse_units(amount.trim(), decimals).map_err(|_| invalid())? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(invalid().into()),
    }
}

async fn fetch_balance(client: &WalletClient, token: &Token, owner: Address) -> String {
    let raw = if token.is_native() {
        client.balance(owner).await
    } else {
        client.erc20_balance(token.address, owner).await
    };

    match raw.map(|value| format_units(value, token.decimals)) {
        Ok(Ok(balance)) => balance,
        Ok(Err(e)) => {
            warn!(token = %token.symbol, error = %e, "failed to format balance");
            "0".into()
        }
        Err(e) => {
            warn!(token = %token.symbol, error = %e, "failed to fetch balance");
            "0".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwapConfig;
    use crate::error::ProviderError;
    use crate::provider::mock::{MockProvider, receipt};
    use crate::provider::{Eip1193Provider, methods};
    use crate::storage::{FlagStore, MemoryStore};
    use alloy::primitives::{address, b256};
    use serde_json::json;

    const ACCOUNT: Address = address!("0x1111111111111111111111111111111111111111");
    const CONTRACT: Address = address!("0x390C68e433EDeFc6532BA9096A17fA2c7dA7Df71");
    const SCID: Address = address!("0x3f448B168F43261e9e95720485C6BA9886E55482");
    const APPROVE_HASH: TxHash =
        b256!("0x00000000000000000000000000000000000000000000000000000000000000a1");
    const SWAP_HASH: TxHash =
        b256!("0x00000000000000000000000000000000000000000000000000000000000000a2");

    fn mock() -> Arc<MockProvider> {
        let mock = Arc::new(MockProvider::new());
        mock.respond(methods::REQUEST_ACCOUNTS, json!([ACCOUNT]));
        mock.respond(methods::CHAIN_ID, json!("0x27ea"));
        mock.respond(methods::SWITCH_CHAIN, json!(null));
        mock
    }

    fn interface(provider: Option<Arc<MockProvider>>) -> SwapInterface {
        let session = WalletSession::new(
            provider.map(|mock| mock as Arc<dyn Eip1193Provider>),
            Arc::new(MemoryStore::new()) as Arc<dyn FlagStore>,
            SwapConfig::default(),
        );
        SwapInterface::new(Arc::new(session))
    }

    async fn connected(mock: &Arc<MockProvider>) -> SwapInterface {
        let ui = interface(Some(Arc::clone(mock)));
        assert!(ui.session().connect().await);
        mock.clear_calls();
        ui
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert!(parse_amount("abc", 18).is_err());
        assert!(parse_amount("-1", 18).is_err());
    }

    #[tokio::test]
    async fn test_no_wallet_prompts_install() {
        let mut ui = interface(None);
        ui.form_mut().set_amount_from("1");

        assert_eq!(ui.execute_swap().await, SwapOutcome::NoWallet);
        assert!(matches!(
            ui.session().notices().drain().as_slice(),
            [Notice::InstallWallet { .. }]
        ));
        assert_eq!(ui.button().await.label, "Install OKX Wallet");
    }

    #[tokio::test]
    async fn test_disconnected_swap_connects_instead() {
        let mock = mock();
        let mut ui = interface(Some(Arc::clone(&mock)));

        assert_eq!(
            ui.execute_swap().await,
            SwapOutcome::ConnectRequested { connected: true }
        );
        assert_eq!(mock.count(methods::SEND_TRANSACTION), 0);
    }

    #[tokio::test]
    async fn test_empty_amount_is_skipped() {
        let mock = mock();
        let mut ui = connected(&mock).await;

        assert_eq!(
            ui.execute_swap().await,
            SwapOutcome::Skipped(SkipReason::EmptyAmount)
        );
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_chain_issues_no_calls() {
        let mock = mock();
        mock.respond(methods::CHAIN_ID, json!("0x1"));
        mock.fail(methods::SWITCH_CHAIN, ProviderError::user_rejected());
        let mut ui = connected(&mock).await;
        ui.form_mut().set_amount_from("1");

        assert_eq!(
            ui.execute_swap().await,
            SwapOutcome::Skipped(SkipReason::WrongChain)
        );
        assert!(mock.calls().is_empty());
        assert!(!ui.refresh_balances().await);
    }

    #[tokio::test]
    async fn test_native_swap() {
        let mock = mock();
        mock.respond(methods::SEND_TRANSACTION, json!(SWAP_HASH));
        mock.respond(methods::GET_TRANSACTION_RECEIPT, receipt(SWAP_HASH, true));
        let mut ui = connected(&mock).await;
        ui.form_mut().set_amount_from("2");

        assert_eq!(
            ui.execute_swap().await,
            SwapOutcome::Completed { hash: SWAP_HASH }
        );

        let tx = mock.calls_to(methods::SEND_TRANSACTION)[0]
            .param(0)
            .cloned()
            .unwrap();
        assert_eq!(tx["to"], json!(CONTRACT));
        assert_eq!(tx["from"], json!(ACCOUNT));
        assert_eq!(tx["value"], json!("0x1bc16d674ec80000"));

        assert_eq!(ui.form().amount_from(), "");
        assert!(!ui.form().is_loading());
        let panel = ui.receipt_panel().unwrap();
        assert_eq!(panel.message, "Your swap from TEA to SCID has been successful!");
    }

    #[tokio::test]
    async fn test_token_swap_approves_then_swaps() {
        let mock = mock();
        mock.push(methods::SEND_TRANSACTION, Ok(json!(APPROVE_HASH)));
        mock.push(methods::SEND_TRANSACTION, Ok(json!(SWAP_HASH)));
        mock.push(methods::GET_TRANSACTION_RECEIPT, Ok(receipt(APPROVE_HASH, true)));
        mock.push(methods::GET_TRANSACTION_RECEIPT, Ok(receipt(SWAP_HASH, true)));
        let mut ui = connected(&mock).await;
        ui.form_mut().flip_pair();
        ui.form_mut().set_amount_from("50");

        assert_eq!(
            ui.execute_swap().await,
            SwapOutcome::Completed { hash: SWAP_HASH }
        );
        assert_eq!(
            mock.methods(),
            vec![
                methods::SEND_TRANSACTION,
                methods::GET_TRANSACTION_RECEIPT,
                methods::SEND_TRANSACTION,
                methods::GET_TRANSACTION_RECEIPT,
            ]
        );
        let sends = mock.calls_to(methods::SEND_TRANSACTION);
        assert_eq!(sends[0].param(0).unwrap()["to"], json!(SCID));
        assert_eq!(sends[1].param(0).unwrap()["to"], json!(CONTRACT));
    }

    #[tokio::test]
    async fn test_failed_approval_stops_before_swap() {
        let mock = mock();
        mock.respond(methods::SEND_TRANSACTION, json!(APPROVE_HASH));
        mock.respond(methods::GET_TRANSACTION_RECEIPT, receipt(APPROVE_HASH, false));
        let mut ui = connected(&mock).await;
        ui.form_mut().flip_pair();
        ui.form_mut().set_amount_from("50");

        assert_eq!(ui.execute_swap().await, SwapOutcome::Failed);
        assert_eq!(mock.count(methods::SEND_TRANSACTION), 1);
        assert!(ui.receipt_panel().is_none());
        assert_eq!(ui.form().amount_from(), "50");
        assert!(!ui.form().is_loading());
        assert_eq!(ui.session().notices().drain(), vec![Notice::SwapFailed]);
    }

    #[tokio::test]
    async fn test_swap_failure_after_approval_keeps_allowance() {
        let mock = mock();
        mock.push(methods::SEND_TRANSACTION, Ok(json!(APPROVE_HASH)));
        mock.push(methods::SEND_TRANSACTION, Err(ProviderError::user_rejected()));
        mock.push(methods::GET_TRANSACTION_RECEIPT, Ok(receipt(APPROVE_HASH, true)));
        let mut ui = connected(&mock).await;
        ui.form_mut().flip_pair();
        ui.form_mut().set_amount_from("50");

        assert_eq!(ui.execute_swap().await, SwapOutcome::Failed);

        assert_eq!(mock.count(methods::SEND_TRANSACTION), 2);
        assert_eq!(mock.count(methods::GET_TRANSACTION_RECEIPT), 1);
        assert!(ui.receipt_panel().is_none());
        assert!(ui.form().receipt().is_none());
        assert_eq!(ui.form().amount_from(), "50");
        assert!(!ui.form().is_loading());
        assert_eq!(ui.session().notices().drain(), vec![Notice::SwapFailed]);
    }

    #[tokio::test]
    async fn test_switch_in_flight_is_skipped() {
        let mock = mock();
        let mut ui = connected(&mock).await;
        ui.form_mut().set_amount_from("1");
        let session = Arc::clone(ui.session());
        let _guard = session.reconciler().try_begin().unwrap();

        assert_eq!(
            ui.execute_swap().await,
            SwapOutcome::Skipped(SkipReason::Switching)
        );
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_transfer_fails() {
        let mock = mock();
        mock.fail(methods::SEND_TRANSACTION, ProviderError::user_rejected());
        let mut ui = connected(&mock).await;
        ui.form_mut().set_amount_from("1");

        assert_eq!(ui.execute_swap().await, SwapOutcome::Failed);
        assert_eq!(mock.count(methods::GET_TRANSACTION_RECEIPT), 0);
    }

    #[tokio::test]
    async fn test_refresh_balances() {
        let mock = mock();
        mock.respond(methods::GET_BALANCE, json!("0xde0b6b3a7640000"));
        mock.fail(methods::CALL, ProviderError::internal("node down"));
        let mut ui = connected(&mock).await;

        assert!(ui.sync_balances().await);
        assert_eq!(ui.form().balance_from(), "1.000000000000000000");
        assert_eq!(ui.form().balance_to(), "0");

        assert!(!ui.sync_balances().await, "nothing changed since the last read");

        ui.form_mut().flip_pair();
        assert!(ui.sync_balances().await);
        assert_eq!(ui.form().balance_to(), "1.000000000000000000");
    }

    #[tokio::test]
    async fn test_refresh_requires_connection() {
        let mock = mock();
        let mut ui = interface(Some(Arc::clone(&mock)));
        assert!(!ui.refresh_balances().await);
        assert!(mock.calls().is_empty());
    }
}
