//! Venue account classification.

use std::fmt;

use serde::Deserialize;

/// Which market an exchange data client connects to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Spot,
    /// USDT-margined futures.
    #[default]
    UsdtFutures,
    /// Coin-margined futures.
    CoinFutures,
}

impl AccountType {
    #[must_use]
    pub fn is_futures(&self) -> bool {
        matches!(self, Self::UsdtFutures | Self::CoinFutures)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Spot => "SPOT",
            Self::UsdtFutures => "USDT_FUTURES",
            Self::CoinFutures => "COIN_FUTURES",
        };
        f.write_str(name)
    }
}
