//! Instrument metadata as cached by the trading node.

use super::id::InstrumentId;

/// Tradable instrument definition returned by a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: InstrumentId,
    /// Symbol as the venue spells it, e.g. `BTCUSDT` for `BTCUSDT-PERP.BINANCE`.
    pub raw_symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub price_precision: u32,
    pub size_precision: u32,
    /// Venue-reported trading status (`TRADING`, `BREAK`, ...).
    pub status: String,
}

impl Instrument {
    /// Whether the venue currently reports the instrument as tradable.
    #[must_use]
    pub fn is_trading(&self) -> bool {
        self.status.eq_ignore_ascii_case("TRADING")
    }
}
