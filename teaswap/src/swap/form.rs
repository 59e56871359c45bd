//! Swap form state and quoting.

use alloy::primitives::TxHash;

use crate::config::SwapConfig;
use crate::error::SwapError;
use crate::token::{Token, TokenCatalog};

/// Side of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The token being sold.
    From,
    /// The token being received.
    To,
}

/// Hash of the last successful swap and whether its panel is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// Final transaction hash of the swap.
    pub hash: TxHash,
    /// Whether the success panel is shown.
    pub shown: bool,
}

/// Derive the output amount for `amount` of `from`.
///
/// Selling the native currency multiplies by `rate`, selling the token
/// divides by it. The result has exactly `precision` decimals. Empty or
/// non-numeric input, or an output too large to represent, yields an empty
/// string.
#[must_use]
pub fn quote(amount: &str, from: &Token, rate: u64, precision: usize) -> String {
    let Ok(value) = amount.trim().parse::<f64>() else {
        return String::new();
    };
    if !value.is_finite() {
        return String::new();
    }
    let rate = rate as f64;
    let output = if from.is_native() {
        value * rate
    } else {
        value / rate
    };
    if !output.is_finite() {
        return String::new();
    }
    format!("{output:.precision$}")
}

/// Input typed before the last flip, and the amount that replaced it.
#[derive(Debug, Clone)]
struct FlipOrigin {
    typed: String,
    placed: String,
}

/// Editable state of the swap form.
///
/// The output amount is never stored: it is always [`quote`] of the input,
/// the pair, the rate and the precision.
#[derive(Debug, Clone)]
pub struct SwapForm {
    token_from: Token,
    token_to: Token,
    amount_from: String,
    rate: u64,
    precision: usize,
    balance_from: String,
    balance_to: String,
    loading: bool,
    receipt: Option<TxReceipt>,
    flip_origin: Option<FlipOrigin>,
}

impl SwapForm {
    /// Create a form with the catalog's default pair.
    #[must_use]
    pub fn new(catalog: &TokenCatalog, rate: u64, precision: usize) -> Self {
        let (token_from, token_to) = catalog.default_pair();
        Self {
            token_from,
            token_to,
            amount_from: String::new(),
            rate,
            precision,
            balance_from: "0".into(),
            balance_to: "0".into(),
            loading: false,
            receipt: None,
            flip_origin: None,
        }
    }

    /// Create a form from the widget configuration.
    #[must_use]
    pub fn from_config(config: &SwapConfig) -> Self {
        Self::new(&config.tokens, config.rate, config.output_precision)
    }

    /// Token being sold.
    #[must_use]
    pub const fn token_from(&self) -> &Token {
        &self.token_from
    }

    /// Token being received.
    #[must_use]
    pub const fn token_to(&self) -> &Token {
        &self.token_to
    }

    /// Raw input amount.
    #[must_use]
    pub fn amount_from(&self) -> &str {
        &self.amount_from
    }

    /// Derived output amount.
    #[must_use]
    pub fn amount_to(&self) -> String {
        quote(&self.amount_from, &self.token_from, self.rate, self.precision)
    }

    /// Replace the input amount.
    pub fn set_amount_from(&mut self, amount: impl Into<String>) {
        self.amount_from = amount.into();
        self.flip_origin = None;
    }

    /// Clear the input (and with it the output).
    pub fn clear_amounts(&mut self) {
        self.amount_from.clear();
        self.flip_origin = None;
    }

    /// Swap the two sides. The old output becomes the new input.
    ///
    /// The new input is the derived output, rounded to the output precision,
    /// so a tiny token amount can flip to zero. Flipping back without editing
    /// restores exactly what was typed.
    pub fn flip_pair(&mut self) {
        let restored = self
            .flip_origin
            .take()
            .filter(|origin| origin.placed == self.amount_from)
            .map(|origin| origin.typed);
        let next = restored.unwrap_or_else(|| self.amount_to());

        std::mem::swap(&mut self.token_from, &mut self.token_to);
        std::mem::swap(&mut self.balance_from, &mut self.balance_to);
        let typed = std::mem::replace(&mut self.amount_from, next.clone());
        self.flip_origin = Some(FlipOrigin {
            typed,
            placed: next,
        });
    }

    /// Select `token` for `side`.
    ///
    /// Returns whether the pair changed. Choosing the token already on the
    /// other side is refused.
    pub fn select_token(&mut self, side: Side, token: &Token) -> Result<bool, SwapError> {
        let (slot, other) = match side {
            Side::From => (&mut self.token_from, &self.token_to),
            Side::To => (&mut self.token_to, &self.token_from),
        };
        if token.address == other.address {
            return Err(SwapError::SameToken(token.symbol.clone()));
        }
        if token.address == slot.address {
            return Ok(false);
        }
        *slot = token.clone();
        Ok(true)
    }

    /// Decimal balance of the "from" token.
    #[must_use]
    pub fn balance_from(&self) -> &str {
        &self.balance_from
    }

    /// Decimal balance of the "to" token.
    #[must_use]
    pub fn balance_to(&self) -> &str {
        &self.balance_to
    }

    /// Store freshly read balances.
    pub fn set_balances(&mut self, from: String, to: String) {
        self.balance_from = from;
        self.balance_to = to;
    }

    /// Whether a swap is being processed.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mark a swap as being processed.
    pub const fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Receipt of the last successful swap.
    #[must_use]
    pub const fn receipt(&self) -> Option<&TxReceipt> {
        self.receipt.as_ref()
    }

    /// Record a successful swap and show its panel.
    pub const fn record_receipt(&mut self, hash: TxHash) {
        self.receipt = Some(TxReceipt { hash, shown: true });
    }

    /// Hide the success panel.
    pub const fn dismiss_receipt(&mut self) {
        if let Some(receipt) = &mut self.receipt {
            receipt.shown = false;
        }
    }

    /// Forget the last receipt.
    pub const fn clear_receipt(&mut self) {
        self.receipt = None;
    }
}
