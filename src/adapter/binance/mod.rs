//! Binance market-data adapter.
//!
//! # Modules
//!
//! - [`client`] - `BinanceDataClient`, the [`DataClient`] implementation
//! - [`messages`] - Wire types for exchange info and kline frames
//! - [`rest`] - `exchangeInfo` lookups
//! - [`stream`] - Kline WebSocket
//! - [`symbol`] - Symbol, interval and stream-name mapping

pub mod client;
pub mod messages;
pub mod rest;
pub mod stream;
pub mod symbol;

use tracing::info;

use crate::domain::{AccountType, ClientId};
use crate::error::Result;
use crate::runtime::{DataClient, DataClientConfig, DataClientFactory, EventSender};

pub use client::{BinanceDataClient, BINANCE_VENUE};
pub use rest::BinanceHttpClient;
pub use stream::BinanceKlineStream;

/// REST and WebSocket base URLs for one market and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub http: &'static str,
    pub ws: &'static str,
}

impl Endpoints {
    /// Default endpoints for an account type on testnet or mainnet.
    #[must_use]
    pub const fn for_account(account_type: AccountType, testnet: bool) -> Self {
        let (http, ws) = match (account_type, testnet) {
            (AccountType::Spot, true) => ("https://testnet.binance.vision", "wss://testnet.binance.vision/ws"),
            (AccountType::Spot, false) => ("https://api.binance.com", "wss://stream.binance.com:9443/ws"),
            (AccountType::UsdtFutures, true) => (
                "https://testnet.binancefuture.com",
                "wss://stream.binancefuture.com/ws",
            ),
            (AccountType::UsdtFutures, false) => ("https://fapi.binance.com", "wss://fstream.binance.com/ws"),
            (AccountType::CoinFutures, true) => (
                "https://testnet.binancefuture.com",
                "wss://dstream.binancefuture.com/ws",
            ),
            (AccountType::CoinFutures, false) => ("https://dapi.binance.com", "wss://dstream.binance.com/ws"),
        };
        Self { http, ws }
    }
}

/// Creates [`BinanceDataClient`]s from a [`DataClientConfig`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BinanceDataClientFactory;

impl DataClientFactory for BinanceDataClientFactory {
    fn create(
        &self,
        client_id: &ClientId,
        config: &DataClientConfig,
        events: EventSender,
    ) -> Result<Box<dyn DataClient>> {
        let defaults = Endpoints::for_account(config.account_type, config.testnet);
        let http_url = config.http_url.as_deref().unwrap_or(defaults.http);
        let ws_url = config.ws_url.as_deref().unwrap_or(defaults.ws);
        info!(
            client_id = %client_id,
            account_type = %config.account_type,
            testnet = config.testnet,
            http_url,
            ws_url,
            "Creating Binance data client"
        );

        let http = BinanceHttpClient::new(http_url, config.credentials.api_key.clone(), config.account_type)?;
        let stream = BinanceKlineStream::new(ws_url.to_string(), client_id.clone(), events.clone());
        Ok(Box::new(BinanceDataClient::new(
            client_id.clone(),
            config.account_type,
            http,
            stream,
            events,
        )))
    }
}
