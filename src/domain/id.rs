//! Domain identifier types with proper encapsulation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Defines a string-backed identifier newtype with the usual conversions.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Key under which a data client config and its factory are registered.
    ClientId
);

string_id!(
    /// Identifier of an actor hosted by a trading node.
    ActorId
);

string_id!(
    /// Trading venue, e.g. `BINANCE`.
    Venue
);

/// Trader identifier in `NAME-TAG` form, e.g. `TESTNET-TRADER-002`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TraderId(String);

impl TraderId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TraderId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseError::TraderId {
            input: s.to_string(),
            reason,
        };
        let (name, tag) = s.rsplit_once('-').ok_or_else(|| err("expected NAME-TAG"))?;
        if name.is_empty() || tag.is_empty() {
            return Err(err("name and tag must be non-empty"));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a tradable symbol on a venue, written `SYMBOL.VENUE`.
///
/// The symbol may itself contain `-` or `.`; the venue is everything after
/// the last `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstrumentId {
    symbol: String,
    venue: Venue,
}

impl InstrumentId {
    pub fn new(symbol: impl Into<String>, venue: impl Into<Venue>) -> Self {
        Self {
            symbol: symbol.into(),
            venue: venue.into(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn venue(&self) -> &Venue {
        &self.venue
    }
}

impl FromStr for InstrumentId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseError::InstrumentId {
            input: s.to_string(),
            reason,
        };
        let (symbol, venue) = s
            .rsplit_once('.')
            .ok_or_else(|| err("expected SYMBOL.VENUE"))?;
        if symbol.is_empty() {
            return Err(err("symbol is empty"));
        }
        if venue.is_empty() {
            return Err(err("venue is empty"));
        }
        Ok(Self::new(symbol, venue))
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_id_splits_on_last_dot() {
        let id: InstrumentId = "BTCUSDT-PERP.BINANCE".parse().unwrap();
        assert_eq!(id.symbol(), "BTCUSDT-PERP");
        assert_eq!(id.venue().as_str(), "BINANCE");
        assert_eq!(id.to_string(), "BTCUSDT-PERP.BINANCE");
    }

    #[test]
    fn instrument_id_keeps_dots_inside_symbol() {
        let id: InstrumentId = "BRK.B.NYSE".parse().unwrap();
        assert_eq!(id.symbol(), "BRK.B");
        assert_eq!(id.venue().as_str(), "NYSE");
    }

    #[test]
    fn instrument_id_rejects_missing_parts() {
        assert!("BTCUSDT".parse::<InstrumentId>().is_err());
        assert!(".BINANCE".parse::<InstrumentId>().is_err());
        assert!("BTCUSDT.".parse::<InstrumentId>().is_err());
    }

    #[test]
    fn trader_id_requires_tag() {
        assert!("TESTNET-TRADER-002".parse::<TraderId>().is_ok());
        assert!("TRADER".parse::<TraderId>().is_err());
        assert!("TRADER-".parse::<TraderId>().is_err());
    }

    #[test]
    fn string_ids_compare_by_value() {
        assert_eq!(ClientId::from("BINANCE"), ClientId::new("BINANCE".to_string()));
        assert_eq!(Venue::from("BINANCE").to_string(), "BINANCE");
    }
}
