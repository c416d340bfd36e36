//! [`DataClient`] implementation for Binance market data.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::rest::BinanceHttpClient;
use super::stream::BinanceKlineStream;
use super::symbol::{kline_interval, raw_symbol};
use crate::domain::{AccountType, BarType, ClientId, InstrumentId, Venue};
use crate::error::Result;
use crate::runtime::{DataClient, DataEvent, EventSender};

/// Venue name Binance instrument ids carry.
pub const BINANCE_VENUE: &str = "BINANCE";

/// Binance data client: REST for instruments, WebSocket for bars.
pub struct BinanceDataClient {
    client_id: ClientId,
    venue: Venue,
    account_type: AccountType,
    http: BinanceHttpClient,
    stream: BinanceKlineStream,
    events: EventSender,
}

impl BinanceDataClient {
    #[must_use]
    pub fn new(
        client_id: ClientId,
        account_type: AccountType,
        http: BinanceHttpClient,
        stream: BinanceKlineStream,
        events: EventSender,
    ) -> Self {
        Self {
            client_id,
            venue: Venue::new(BINANCE_VENUE),
            account_type,
            http,
            stream,
            events,
        }
    }
}

#[async_trait]
impl DataClient for BinanceDataClient {
    fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    fn venue(&self) -> &Venue {
        &self.venue
    }

    async fn connect(&mut self) -> Result<()> {
        self.stream.connect().await?;
        info!(client_id = %self.client_id, account_type = %self.account_type, "Binance data client connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.stream.is_connected() {
            self.stream.close().await;
            info!(client_id = %self.client_id, "Binance data client disconnected");
        }
        Ok(())
    }

    async fn request_instrument(&mut self, instrument_id: &InstrumentId) -> Result<()> {
        let http = self.http.clone();
        let events = self.events.clone();
        let instrument_id = instrument_id.clone();

        tokio::spawn(async move {
            let event = match http.fetch_instrument(&instrument_id).await {
                Ok(instrument) => DataEvent::InstrumentReceived(instrument),
                Err(e) => {
                    warn!(instrument_id = %instrument_id, error = %e, "Instrument request failed");
                    DataEvent::InstrumentRequestFailed {
                        instrument_id,
                        reason: e.to_string(),
                    }
                }
            };
            if events.send(event).is_err() {
                debug!("Event receiver dropped before instrument response");
            }
        });
        Ok(())
    }

    async fn subscribe_bars(&mut self, bar_type: &BarType) -> Result<()> {
        let interval = kline_interval(bar_type)?;
        let symbol = raw_symbol(bar_type.instrument_id(), self.account_type);
        self.stream.subscribe(bar_type, &symbol, interval)
    }

    async fn unsubscribe_bars(&mut self, bar_type: &BarType) -> Result<()> {
        let interval = kline_interval(bar_type)?;
        let symbol = raw_symbol(bar_type.instrument_id(), self.account_type);
        self.stream.unsubscribe(&symbol, interval)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::{AdapterError, Error};

    fn client() -> BinanceDataClient {
        let (tx, _rx) = mpsc::unbounded_channel();
        let client_id = ClientId::new("BINANCE-FUTURES-TESTNET");
        let http = BinanceHttpClient::new(
            "https://testnet.binancefuture.com",
            "key".into(),
            AccountType::UsdtFutures,
        )
        .unwrap();
        let stream = BinanceKlineStream::new(
            "wss://stream.binancefuture.com/ws".into(),
            client_id.clone(),
            tx.clone(),
        );
        BinanceDataClient::new(client_id, AccountType::UsdtFutures, http, stream, tx)
    }

    #[test]
    fn serves_binance_venue() {
        assert_eq!(client().venue().as_str(), BINANCE_VENUE);
    }

    #[tokio::test]
    async fn unsupported_bar_type_fails_before_touching_socket() {
        let mut client = client();
        let bar_type: BarType = "BTCUSDT-PERP.BINANCE-1-MINUTE-BID-EXTERNAL".parse().unwrap();

        let err = client.subscribe_bars(&bar_type).await.unwrap_err();
        assert!(matches!(err, Error::Adapter(AdapterError::UnsupportedBarType { .. })));
    }

    #[tokio::test]
    async fn subscribe_requires_connection() {
        let mut client = client();
        let bar_type: BarType = "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL".parse().unwrap();

        let err = client.subscribe_bars(&bar_type).await.unwrap_err();
        assert!(matches!(err, Error::Adapter(AdapterError::NotConnected)));
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_noop() {
        assert!(client().disconnect().await.is_ok());
    }
}
