//! Presentation helpers.
//!
//! Pure functions from session and form state to what the UI shows: button
//! labels, shortened addresses, balance strings, the success panel and
//! user-facing notices.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use alloy::primitives::Address;

use crate::config::SwapConfig;
use crate::session::SessionSnapshot;
use crate::swap::SwapForm;

/// A message surfaced to the user (an `alert` in the browser build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No wallet provider is present.
    InstallWallet {
        /// Wallet name.
        wallet: String,
        /// Where to install it.
        url: String,
    },
    /// The connection request failed or was declined.
    ConnectFailed,
    /// A swap step failed.
    SwapFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstallWallet { wallet, .. } => {
                write!(f, "Please install {wallet} to use this application")
            }
            Self::ConnectFailed => write!(f, "Failed to connect wallet. Please try again."),
            Self::SwapFailed => write!(f, "Swap failed. Check the logs for details."),
        }
    }
}

/// Queue of notices waiting to be shown.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    queue: Mutex<VecDeque<Notice>>,
}

impl NoticeBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a notice.
    pub fn push(&self, notice: Notice) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(notice);
    }

    /// Take every queued notice.
    pub fn drain(&self) -> Vec<Notice> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

/// Shorten an address to `0x1234...abcd`.
#[must_use]
pub fn format_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Shorten a transaction hash to its first 10 and last 8 characters.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    if hash.len() <= 18 {
        return hash.to_owned();
    }
    format!("{}...{}", &hash[..10], &hash[hash.len() - 8..])
}

/// Format a decimal balance string with `places` decimals.
///
/// Unparseable balances render as zero.
#[must_use]
pub fn format_balance(balance: &str, places: usize) -> String {
    let value = balance.trim().parse::<f64>().unwrap_or(0.0);
    format!("{value:.places$}")
}

/// Label of the navbar wallet control.
#[must_use]
pub fn connect_button_label(connected: bool, wallet_name: &str) -> String {
    if connected {
        "Disconnect Wallet".to_owned()
    } else {
        format!("Connect with {wallet_name}")
    }
}

/// State of the submit control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapButton {
    /// Text shown on the control.
    pub label: String,
    /// Whether the control accepts clicks.
    pub enabled: bool,
}

/// Compute the submit control from the current state.
///
/// Label precedence: missing wallet, disconnected, switching network,
/// processing, ready.
#[must_use]
pub fn swap_button(
    config: &SwapConfig,
    has_provider: bool,
    session: &SessionSnapshot,
    form: &SwapForm,
) -> SwapButton {
    let label = if !has_provider {
        format!("Install {}", config.wallet_name)
    } else if !session.connected {
        format!("Connect with {}", config.wallet_name)
    } else if session.switching {
        format!("Switching to {}...", config.chain.chain_name)
    } else if form.is_loading() {
        "Processing...".to_owned()
    } else {
        format!(
            "Swap {} to {}",
            form.token_from().symbol,
            form.token_to().symbol
        )
    };

    let enabled = !form.is_loading()
        && !session.switching
        && (!session.connected || !form.amount_from().is_empty());

    SwapButton { label, enabled }
}

/// Whether the amount inputs and the pair selector accept edits.
#[must_use]
pub const fn inputs_enabled(session: &SessionSnapshot, form: &SwapForm) -> bool {
    !form.is_loading() && !session.switching
}

/// Content of the dismissible success panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPanel {
    /// Panel title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Shortened transaction hash.
    pub short_hash: String,
    /// Block explorer link.
    pub explorer_url: String,
}

/// The success panel, if a receipt is being shown.
#[must_use]
pub fn receipt_panel(config: &SwapConfig, form: &SwapForm) -> Option<ReceiptPanel> {
    let receipt = form.receipt().filter(|receipt| receipt.shown)?;
    let hash = format!("{:#x}", receipt.hash);
    Some(ReceiptPanel {
        title: "Transaction Successful".to_owned(),
        message: format!(
            "Your swap from {} to {} has been successful!",
            form.token_from().symbol,
            form.token_to().symbol
        ),
        short_hash: short_hash(&hash),
        explorer_url: config.explorer_tx_url(&hash),
    })
}
