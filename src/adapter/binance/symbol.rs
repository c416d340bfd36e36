//! Mapping between domain identifiers and Binance symbols, streams and intervals.

use crate::domain::{AccountType, AggregationSource, BarAggregation, BarType, InstrumentId, PriceType};
use crate::error::AdapterError;

/// Venue symbol for an instrument.
///
/// Perpetuals are written `XXX-PERP` in instrument ids; USDT-M lists them as
/// `XXX` and COIN-M as `XXX_PERP`.
#[must_use]
pub fn raw_symbol(instrument_id: &InstrumentId, account_type: AccountType) -> String {
    let symbol = instrument_id.symbol().to_ascii_uppercase();
    match (symbol.strip_suffix("-PERP"), account_type) {
        (Some(base), AccountType::UsdtFutures) => base.to_string(),
        (Some(base), AccountType::CoinFutures) => format!("{base}_PERP"),
        _ => symbol,
    }
}

/// Binance kline interval for a bar type.
///
/// # Errors
///
/// Only venue-aggregated `LAST` bars with a step Binance publishes are
/// supported.
pub fn kline_interval(bar_type: &BarType) -> Result<&'static str, AdapterError> {
    let unsupported = |reason: &str| AdapterError::UnsupportedBarType {
        bar_type: bar_type.to_string(),
        reason: reason.to_string(),
    };

    if bar_type.source() != AggregationSource::External {
        return Err(unsupported("only EXTERNAL bars are streamed by the venue"));
    }
    let spec = bar_type.spec();
    if spec.price_type != PriceType::Last {
        return Err(unsupported("only LAST price bars are available"));
    }

    let interval = match (spec.aggregation, spec.step) {
        (BarAggregation::Second, 1) => "1s",
        (BarAggregation::Minute, 1) => "1m",
        (BarAggregation::Minute, 3) => "3m",
        (BarAggregation::Minute, 5) => "5m",
        (BarAggregation::Minute, 15) => "15m",
        (BarAggregation::Minute, 30) => "30m",
        (BarAggregation::Hour, 1) => "1h",
        (BarAggregation::Hour, 2) => "2h",
        (BarAggregation::Hour, 4) => "4h",
        (BarAggregation::Hour, 6) => "6h",
        (BarAggregation::Hour, 8) => "8h",
        (BarAggregation::Hour, 12) => "12h",
        (BarAggregation::Day, 1) => "1d",
        (BarAggregation::Day, 3) => "3d",
        (BarAggregation::Week, 1) => "1w",
        (BarAggregation::Month, 1) => "1M",
        _ => return Err(unsupported("no matching kline interval")),
    };
    Ok(interval)
}

/// Stream name, e.g. `btcusdt@kline_1m`.
#[must_use]
pub fn kline_stream(raw_symbol: &str, interval: &str) -> String {
    format!("{}@kline_{interval}", raw_symbol.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_type(s: &str) -> BarType {
        s.parse().unwrap()
    }

    #[test]
    fn perpetual_symbols_follow_account_type() {
        let id: InstrumentId = "BTCUSDT-PERP.BINANCE".parse().unwrap();
        assert_eq!(raw_symbol(&id, AccountType::UsdtFutures), "BTCUSDT");

        let id: InstrumentId = "BTCUSD-PERP.BINANCE".parse().unwrap();
        assert_eq!(raw_symbol(&id, AccountType::CoinFutures), "BTCUSD_PERP");

        let id: InstrumentId = "ethusdt.BINANCE".parse().unwrap();
        assert_eq!(raw_symbol(&id, AccountType::Spot), "ETHUSDT");
    }

    #[test]
    fn maps_supported_intervals() {
        assert_eq!(
            kline_interval(&bar_type("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL")).unwrap(),
            "1m"
        );
        assert_eq!(
            kline_interval(&bar_type("BTCUSDT-PERP.BINANCE-4-HOUR-LAST-EXTERNAL")).unwrap(),
            "4h"
        );
        assert_eq!(
            kline_interval(&bar_type("BTCUSDT-PERP.BINANCE-1-MONTH-LAST-EXTERNAL")).unwrap(),
            "1M"
        );
    }

    #[test]
    fn rejects_unsupported_specs() {
        for input in [
            "BTCUSDT-PERP.BINANCE-2-MINUTE-LAST-EXTERNAL",
            "BTCUSDT-PERP.BINANCE-1-MINUTE-MID-EXTERNAL",
            "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-INTERNAL",
        ] {
            assert!(matches!(
                kline_interval(&bar_type(input)),
                Err(AdapterError::UnsupportedBarType { .. })
            ));
        }
    }

    #[test]
    fn stream_name_is_lowercase() {
        assert_eq!(kline_stream("BTCUSDT", "1m"), "btcusdt@kline_1m");
    }
}
