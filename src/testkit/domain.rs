//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for [`Instrument`], [`Bar`] and
//! [`Credentials`] so tests focus on assertions rather than construction
//! boilerplate.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{Bar, BarType, Instrument, InstrumentId};
use crate::runtime::Credentials;

/// Parse an [`InstrumentId`], panicking on malformed input.
pub fn instrument_id(id: &str) -> InstrumentId {
    id.parse().expect("valid instrument id")
}

/// Parse a [`BarType`], panicking on malformed input.
pub fn bar_type(bar_type: &str) -> BarType {
    bar_type.parse().expect("valid bar type")
}

/// A trading instrument with two-decimal prices and three-decimal sizes.
pub fn instrument(id: &str) -> Instrument {
    let id = instrument_id(id);
    let raw_symbol = id
        .symbol()
        .strip_suffix("-PERP")
        .unwrap_or(id.symbol())
        .to_string();
    let base_asset = raw_symbol
        .strip_suffix("USDT")
        .unwrap_or(&raw_symbol)
        .to_string();
    Instrument {
        id,
        base_asset,
        raw_symbol,
        quote_asset: "USDT".into(),
        price_precision: 2,
        size_precision: 3,
        status: "TRADING".into(),
    }
}

/// A flat bar (open = high = low = close) with unit volume.
pub fn bar(bar_type: &str, close: Decimal) -> Bar {
    bar_with_type(self::bar_type(bar_type), close)
}

/// Same as [`bar`] for an already-parsed [`BarType`].
pub fn bar_with_type(bar_type: BarType, close: Decimal) -> Bar {
    let ts = Utc
        .timestamp_millis_opt(1_700_000_059_999)
        .single()
        .expect("valid timestamp");
    Bar {
        bar_type,
        open: close,
        high: close,
        low: close,
        close,
        volume: Decimal::ONE,
        ts_event: ts,
        ts_init: ts,
    }
}

/// Placeholder testnet credentials.
pub fn credentials() -> Credentials {
    Credentials {
        api_key: "test-api-key".into(),
        api_secret: "test-api-secret".into(),
    }
}
