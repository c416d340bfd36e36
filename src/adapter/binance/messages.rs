//! Binance wire types for exchange info and the kline WebSocket stream.
//!
//! Example kline frame:
//! ```json
//! {"e":"kline","E":1700000060001,"s":"BTCUSDT","k":{"t":1700000000000,"T":1700000059999,
//!  "s":"BTCUSDT","i":"1m","o":"37000.10","c":"37010.00","h":"37020.00","l":"36990.00",
//!  "v":"12.345","x":true}}
//! ```

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarType, Instrument, InstrumentId};
use crate::error::{AdapterError, Error, Result};

/// Response of the `exchangeInfo` endpoint (spot, USDT-M and COIN-M share this shape).
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    /// Spot and USDT-M use `status`, COIN-M uses `contractStatus`.
    #[serde(default, alias = "contractStatus")]
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub price_precision: Option<u32>,
    #[serde(default)]
    pub quantity_precision: Option<u32>,
    #[serde(default)]
    pub base_asset_precision: Option<u32>,
    #[serde(default)]
    pub quote_precision: Option<u32>,
}

impl SymbolInfo {
    /// Convert to a domain [`Instrument`] under the caller's identifier.
    #[must_use]
    pub fn to_instrument(&self, id: InstrumentId) -> Instrument {
        Instrument {
            id,
            raw_symbol: self.symbol.clone(),
            base_asset: self.base_asset.clone(),
            quote_asset: self.quote_asset.clone(),
            price_precision: self.price_precision.or(self.quote_precision).unwrap_or(8),
            size_precision: self
                .quantity_precision
                .or(self.base_asset_precision)
                .unwrap_or(8),
            status: self.status.clone(),
        }
    }
}

/// Subscription management request sent over the WebSocket.
#[derive(Debug, Serialize)]
pub struct StreamRequest {
    pub method: &'static str,
    pub params: Vec<String>,
    pub id: u64,
}

impl StreamRequest {
    pub fn subscribe(stream: String, id: u64) -> Self {
        Self {
            method: "SUBSCRIBE",
            params: vec![stream],
            id,
        }
    }

    pub fn unsubscribe(stream: String, id: u64) -> Self {
        Self {
            method: "UNSUBSCRIBE",
            params: vec![stream],
            id,
        }
    }
}

/// Frames received on the WebSocket.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WsMessage {
    /// Error reply to a request: `{"error":{"code":2,"msg":"..."},"id":1}`.
    Error { error: WsError, id: Option<u64> },
    /// Successful reply to a request: `{"result":null,"id":1}`.
    Response {
        result: Option<serde_json::Value>,
        id: u64,
    },
    Kline(KlineEvent),
    /// Anything else.
    Unknown(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct WsError {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct KlineEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: Kline,
}

#[derive(Debug, Deserialize)]
pub struct Kline {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "v")]
    pub volume: String,
    /// Whether this kline window is closed.
    #[serde(rename = "x")]
    pub closed: bool,
}

impl Kline {
    /// Convert a closed kline into a domain [`Bar`].
    pub fn to_bar(&self, bar_type: BarType, ts_init: DateTime<Utc>) -> Result<Bar> {
        let ts_event = Utc
            .timestamp_millis_opt(self.close_time)
            .single()
            .ok_or_else(|| parse_error(&bar_type, format!("invalid close time {}", self.close_time)))?;

        Ok(Bar {
            open: decimal(&bar_type, "open", &self.open)?,
            high: decimal(&bar_type, "high", &self.high)?,
            low: decimal(&bar_type, "low", &self.low)?,
            close: decimal(&bar_type, "close", &self.close)?,
            volume: decimal(&bar_type, "volume", &self.volume)?,
            ts_event,
            ts_init,
            bar_type,
        })
    }
}

fn decimal(bar_type: &BarType, field: &str, value: &str) -> Result<Decimal> {
    value
        .parse::<Decimal>()
        .map_err(|e| parse_error(bar_type, format!("{field} '{value}': {e}")))
}

fn parse_error(bar_type: &BarType, reason: String) -> Error {
    AdapterError::UnsupportedBarType {
        bar_type: bar_type.to_string(),
        reason,
    }
    .into()
}
