//! Token catalog.
//!
//! The widget trades exactly two tokens: the chain's native currency and one
//! ERC-20. The native side is identified by the zero address.

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Address of the SCID token on TEA Sepolia.
pub const SCID_ADDRESS: Address = address!("0x3f448B168F43261e9e95720485C6BA9886E55482");

const TEA_LOGO_URI: &str = "https://2rulzuatlal2cmmjw3cvmqbnbsx3cdszzo2b3ar5kjc6idnnvrza.arweave.net/1Gi80BNYF6ExibbFVkAtDK-xDlnLtB2CPVJF5A2trHI";
const SCID_LOGO_URI: &str = "https://tpfgm3rwfktmy2oj6js6zwtud2xpbj7jry7xdqenu54agnrvsijq.arweave.net/m8pmbjYqpsxpyfJl7Np0Hq7wp-mOP3HAjad4AzY1khM";

/// A token that can appear on either side of the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Contract address, or the zero address for the native currency.
    pub address: Address,
    /// Ticker symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Number of decimals of the base unit.
    pub decimals: u8,
    /// Logo image URI.
    #[serde(rename = "logoURI")]
    pub logo_uri: String,
}

impl Token {
    /// Create a token.
    #[must_use]
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u8,
        logo_uri: impl Into<String>,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            name: name.into(),
            decimals,
            logo_uri: logo_uri.into(),
        }
    }

    /// The native TEA currency.
    #[must_use]
    pub fn tea() -> Self {
        Self::new(Address::ZERO, "TEA", "TEA Native", 18, TEA_LOGO_URI)
    }

    /// The SCID ERC-20 token.
    #[must_use]
    pub fn scid() -> Self {
        Self::new(SCID_ADDRESS, "SCID", "SCAVENGER ID", 18, SCID_LOGO_URI)
    }

    /// Whether this token is the chain's native currency.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.address.is_zero()
    }
}

/// The fixed two-entry token catalog.
///
/// Index 0 is the default "from" token and index 1 the default "to" token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCatalog(Vec<Token>);

impl Default for TokenCatalog {
    fn default() -> Self {
        Self(vec![Token::tea(), Token::scid()])
    }
}

impl TokenCatalog {
    /// Build a catalog and check it has two distinct tokens, exactly one native.
    pub fn new(tokens: Vec<Token>) -> ConfigResult<Self> {
        let catalog = Self(tokens);
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the catalog invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        let [a, b] = self.0.as_slice() else {
            return Err(ConfigError::invalid(format!(
                "token catalog must hold exactly two tokens, found {}",
                self.0.len()
            )));
        };
        if a.address == b.address {
            return Err(ConfigError::invalid(format!(
                "tokens {} and {} share address {}",
                a.symbol, b.symbol, a.address
            )));
        }
        if a.is_native() == b.is_native() {
            return Err(ConfigError::invalid(
                "token catalog must pair the native currency with one ERC-20 token",
            ));
        }
        Ok(())
    }

    /// All tokens in catalog order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// Default pair as `(from, to)`.
    #[must_use]
    pub fn default_pair(&self) -> (Token, Token) {
        (self.0[0].clone(), self.0[1].clone())
    }

    /// Tokens selectable for one side, i.e. everything except `other`.
    pub fn selectable<'a>(&'a self, other: &'a Token) -> impl Iterator<Item = &'a Token> + 'a {
        self.0.iter().filter(move |token| *token != other)
    }

    /// The native currency entry.
    #[must_use]
    pub fn native(&self) -> Option<&Token> {
        self.0.iter().find(|token| token.is_native())
    }

    /// Look up a token by symbol, ignoring case.
    #[must_use]
    pub fn by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.0
            .iter()
            .find(|token| token.symbol.eq_ignore_ascii_case(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = TokenCatalog::default();
        catalog.validate().unwrap();

        let (from, to) = catalog.default_pair();
        assert_eq!(from.symbol, "TEA");
        assert!(from.is_native());
        assert_eq!(to.symbol, "SCID");
        assert!(!to.is_native());
        assert_eq!(catalog.native(), Some(&from));
    }

    #[test]
    fn test_selectable_excludes_other_side() {
        let catalog = TokenCatalog::default();
        let scid = Token::scid();
        let choices: Vec<_> = catalog.selectable(&scid).collect();
        assert_eq!(choices, vec![&Token::tea()]);
    }

    #[test]
    fn test_invalid_catalogs() {
        assert!(TokenCatalog::new(vec![Token::tea()]).is_err());
        assert!(TokenCatalog::new(vec![Token::tea(), Token::tea()]).is_err());

        let other = Token::new(
            address!("0x0000000000000000000000000000000000000001"),
            "OTHER",
            "Other",
            18,
            "",
        );
        assert!(TokenCatalog::new(vec![Token::scid(), other]).is_err());
    }

    #[test]
    fn test_by_symbol() {
        let catalog = TokenCatalog::default();
        assert_eq!(catalog.by_symbol("scid"), Some(&Token::scid()));
        assert!(catalog.by_symbol("eth").is_none());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(Token::scid()).unwrap();
        assert_eq!(json["symbol"], "SCID");
        assert!(json.get("logoURI").is_some());
    }
}
